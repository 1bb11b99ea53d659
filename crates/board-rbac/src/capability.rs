//! # Capabilities
//!
//! The two authorization levels evaluated per operation.

use board_org::PermissionLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability an actor needs to perform an operation.
///
/// - **View**: read the board (listings, member lookups)
/// - **Edit**: change the board structure or content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Read access.
    View,

    /// Structural and content mutations.
    Edit,
}

impl Capability {
    /// Get the string representation of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Edit => "edit",
        }
    }

    /// Parse a capability from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, supports aliases)
    ///
    /// # Example
    ///
    /// ```
    /// use board_rbac::Capability;
    ///
    /// assert_eq!(Capability::parse("VIEW"), Some(Capability::View));
    /// assert_eq!(Capability::parse("read"), Some(Capability::View));
    /// assert_eq!(Capability::parse("write"), Some(Capability::Edit));
    /// assert_eq!(Capability::parse("manage"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "read" | "get" | "list" => Some(Capability::View),
            "edit" | "write" | "update" | "modify" => Some(Capability::Edit),
            _ => None,
        }
    }

    /// Get all capabilities, weakest first.
    pub fn all() -> [Self; 2] {
        [Capability::View, Capability::Edit]
    }

    /// Check if this capability implies another one.
    ///
    /// `Edit` implies `View`; every capability implies itself.
    ///
    /// # Example
    ///
    /// ```
    /// use board_rbac::Capability;
    ///
    /// assert!(Capability::Edit.implies(Capability::View));
    /// assert!(!Capability::View.implies(Capability::Edit));
    /// ```
    pub fn implies(&self, other: Capability) -> bool {
        *self >= other
    }

    /// The weakest membership level that satisfies this capability.
    pub fn minimum_level(&self) -> PermissionLevel {
        match self {
            Capability::View => PermissionLevel::View,
            Capability::Edit => PermissionLevel::Edit,
        }
    }

    /// Check if a membership level satisfies this capability.
    ///
    /// VIEW is satisfied by either level; EDIT only by an EDIT membership.
    pub fn is_satisfied_by(&self, level: PermissionLevel) -> bool {
        level >= self.minimum_level()
    }

    /// Check if this is a read-only capability.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Capability::View)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
