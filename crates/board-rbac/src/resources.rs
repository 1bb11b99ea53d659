//! # Entity Kinds
//!
//! Every kind of record on the board and its fixed parent chain up to the
//! owning workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of records stored by the board.
///
/// The parent chain is fixed:
///
/// ```text
/// Task → ClientAssignment → Pipeline → Workspace
/// Client → Workspace
/// Membership → Workspace
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level tenant.
    Workspace,
    /// Ordered board inside a workspace.
    Pipeline,
    /// A client's card inside a pipeline.
    ClientAssignment,
    /// Work item on a client assignment.
    Task,
    /// Workspace-scoped client.
    Client,
    /// Non-owner workspace membership.
    Membership,
}

impl EntityKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Workspace => "workspace",
            EntityKind::Pipeline => "pipeline",
            EntityKind::ClientAssignment => "client_assignment",
            EntityKind::Task => "task",
            EntityKind::Client => "client",
            EntityKind::Membership => "membership",
        }
    }

    /// Parse a kind from its string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use board_rbac::EntityKind;
    ///
    /// assert_eq!(EntityKind::parse("task"), Some(EntityKind::Task));
    /// assert_eq!(EntityKind::parse("clientassignment"), Some(EntityKind::ClientAssignment));
    /// assert_eq!(EntityKind::parse("card"), Some(EntityKind::ClientAssignment));
    /// assert_eq!(EntityKind::parse("user"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "workspace" => Some(EntityKind::Workspace),
            "pipeline" | "board" => Some(EntityKind::Pipeline),
            "client_assignment" | "clientassignment" | "assignment" | "card" => {
                Some(EntityKind::ClientAssignment)
            }
            "task" => Some(EntityKind::Task),
            "client" => Some(EntityKind::Client),
            "membership" | "member" => Some(EntityKind::Membership),
            _ => None,
        }
    }

    /// Get all kinds.
    pub fn all() -> Vec<Self> {
        vec![
            EntityKind::Workspace,
            EntityKind::Pipeline,
            EntityKind::ClientAssignment,
            EntityKind::Task,
            EntityKind::Client,
            EntityKind::Membership,
        ]
    }

    /// The kind one hop up the parent chain.
    ///
    /// Workspaces have no parent record.
    pub fn parent_kind(&self) -> Option<Self> {
        match self {
            EntityKind::Workspace => None,
            EntityKind::Pipeline | EntityKind::Client | EntityKind::Membership => {
                Some(EntityKind::Workspace)
            }
            EntityKind::ClientAssignment => Some(EntityKind::Pipeline),
            EntityKind::Task => Some(EntityKind::ClientAssignment),
        }
    }

    /// The positional kind nested directly below this one, if any.
    ///
    /// # Example
    ///
    /// ```
    /// use board_rbac::EntityKind;
    ///
    /// assert_eq!(EntityKind::Pipeline.ordered_child_kind(), Some(EntityKind::ClientAssignment));
    /// assert_eq!(EntityKind::Task.ordered_child_kind(), None);
    /// ```
    pub fn ordered_child_kind(&self) -> Option<Self> {
        match self {
            EntityKind::Workspace => Some(EntityKind::Pipeline),
            EntityKind::Pipeline => Some(EntityKind::ClientAssignment),
            EntityKind::ClientAssignment => Some(EntityKind::Task),
            _ => None,
        }
    }

    /// The kinds visited when walking from this kind up to its workspace,
    /// starting with this kind and ending with `Workspace`.
    pub fn chain_to_workspace(&self) -> Vec<Self> {
        let mut chain = vec![*self];
        let mut current = *self;
        while let Some(parent) = current.parent_kind() {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Check if records of this kind carry a dense `pos`.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            EntityKind::Pipeline | EntityKind::ClientAssignment | EntityKind::Task
        )
    }

    /// Check if records of this kind may change parent during a reorder.
    ///
    /// Pipelines never leave their workspace.
    pub fn can_change_parent(&self) -> bool {
        matches!(self, EntityKind::ClientAssignment | EntityKind::Task)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
