//! Membership permission levels
//!
//! A non-owner member of a workspace holds exactly one of two levels.
//! The workspace owner never has a membership row; owners are treated as
//! holding `Edit` implicitly by the access layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission level granted to a workspace member.
///
/// Levels are ordered: `View < Edit`. Holding `Edit` implies `View`.
///
/// # Examples
///
/// ```
/// use board_org::PermissionLevel;
///
/// assert!(PermissionLevel::Edit.can_edit());
/// assert!(PermissionLevel::Edit.can_view());
/// assert!(!PermissionLevel::View.can_edit());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    /// Read-only access to the workspace board
    View = 0,

    /// Can change the board structure and its content
    Edit = 1,
}

impl PermissionLevel {
    /// Check if this level allows reading the board.
    ///
    /// Every level can view.
    pub fn can_view(&self) -> bool {
        *self >= PermissionLevel::View
    }

    /// Check if this level allows structural mutations.
    ///
    /// # Returns
    ///
    /// `true` only for `Edit`
    pub fn can_edit(&self) -> bool {
        *self >= PermissionLevel::Edit
    }

    /// Parse a level from its string representation.
    ///
    /// Accepts the stored upper-case form as well as lower-case spellings.
    ///
    /// # Examples
    ///
    /// ```
    /// use board_org::PermissionLevel;
    ///
    /// assert_eq!(PermissionLevel::parse("EDIT"), Some(PermissionLevel::Edit));
    /// assert_eq!(PermissionLevel::parse("view"), Some(PermissionLevel::View));
    /// assert_eq!(PermissionLevel::parse("admin"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "viewer" | "read" => Some(Self::View),
            "edit" | "editor" | "write" => Some(Self::Edit),
            _ => None,
        }
    }

    /// Get the stored string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Edit => "EDIT",
        }
    }
}

impl Default for PermissionLevel {
    fn default() -> Self {
        Self::View
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
