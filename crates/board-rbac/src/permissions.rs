//! # Permissions
//!
//! A permission combines an entity kind with a capability. Every board
//! operation maps to exactly one permission, so the capability an operation
//! needs is decided here and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::Capability;
use crate::resources::EntityKind;

/// A capability on a kind of record.
///
/// # Example
///
/// ```
/// use board_rbac::{Capability, EntityKind, Permission};
///
/// let perm = Permission::new(EntityKind::Pipeline, Capability::Edit);
/// assert_eq!(perm.to_string(), "pipeline:edit");
/// assert_eq!(Permission::from_string("pipeline:edit"), Some(perm));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The kind of record the operation targets.
    pub resource: EntityKind,
    /// The capability required on the owning workspace.
    pub capability: Capability,
}

impl Permission {
    /// Create a new permission.
    pub fn new(resource: EntityKind, capability: Capability) -> Self {
        Self {
            resource,
            capability,
        }
    }

    /// Parse from string (e.g., "task:view").
    pub fn from_string(s: &str) -> Option<Self> {
        let (resource, capability) = s.split_once(':')?;
        Some(Self {
            resource: EntityKind::parse(resource)?,
            capability: Capability::parse(capability)?,
        })
    }

    /// Check if holding this permission also grants `other`.
    ///
    /// Resources must match and this capability must imply the other one.
    pub fn grants(&self, other: &Permission) -> bool {
        self.resource == other.resource && self.capability.implies(other.capability)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.capability.as_str())
    }
}

/// Every operation the board engine exposes.
///
/// Listings require `View`; structural mutations and membership changes
/// require `Edit`. Deleting a workspace is reserved to its owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    // Workspace
    GetWorkspace,
    RenameWorkspace,
    DeleteWorkspace,

    // Membership
    ListMembers,
    AddMember,
    UpdateMemberPermission,
    RemoveMember,

    // Pipeline
    ListPipelines,
    CreatePipeline,
    RenamePipeline,
    DeletePipeline,
    ReorderPipelines,

    // Client assignment
    CreateClientAssignment,
    SetAssignmentDeadline,
    DeleteClientAssignment,
    ReorderClientAssignments,
    ListAssignmentMembers,
    AddAssignmentMember,
    RemoveAssignmentMember,

    // Task
    ListTasks,
    ListTaskMembers,
    CreateTask,
    UpdateTask,
    SetTaskCompleted,
    DeleteTask,
    ReorderTasks,
    AssignTaskMember,
    UnassignTaskMember,

    // Client
    ListClients,
    CreateClient,
    DeleteClient,
}

impl Operation {
    /// The permission this operation requires.
    ///
    /// # Example
    ///
    /// ```
    /// use board_rbac::{Capability, EntityKind, Operation};
    ///
    /// let perm = Operation::ListPipelines.permission();
    /// assert_eq!(perm.capability, Capability::View);
    ///
    /// let perm = Operation::ReorderPipelines.permission();
    /// assert_eq!(perm.resource, EntityKind::Pipeline);
    /// assert_eq!(perm.capability, Capability::Edit);
    /// ```
    pub fn permission(&self) -> Permission {
        use Capability::{Edit, View};
        use EntityKind::*;

        let (resource, capability) = match self {
            Operation::GetWorkspace => (Workspace, View),
            Operation::RenameWorkspace | Operation::DeleteWorkspace => (Workspace, Edit),

            Operation::ListMembers => (Membership, View),
            Operation::AddMember
            | Operation::UpdateMemberPermission
            | Operation::RemoveMember => (Membership, Edit),

            Operation::ListPipelines => (Pipeline, View),
            Operation::CreatePipeline
            | Operation::RenamePipeline
            | Operation::DeletePipeline
            | Operation::ReorderPipelines => (Pipeline, Edit),

            Operation::ListAssignmentMembers => (ClientAssignment, View),
            Operation::CreateClientAssignment
            | Operation::SetAssignmentDeadline
            | Operation::DeleteClientAssignment
            | Operation::ReorderClientAssignments
            | Operation::AddAssignmentMember
            | Operation::RemoveAssignmentMember => (ClientAssignment, Edit),

            Operation::ListTasks | Operation::ListTaskMembers => (Task, View),
            Operation::CreateTask
            | Operation::UpdateTask
            | Operation::SetTaskCompleted
            | Operation::DeleteTask
            | Operation::ReorderTasks
            | Operation::AssignTaskMember
            | Operation::UnassignTaskMember => (Task, Edit),

            Operation::ListClients => (Client, View),
            Operation::CreateClient | Operation::DeleteClient => (Client, Edit),
        };
        Permission::new(resource, capability)
    }

    /// The capability this operation requires on the owning workspace.
    pub fn capability(&self) -> Capability {
        self.permission().capability
    }

    /// Check if only the workspace owner may perform this operation.
    pub fn requires_owner(&self) -> bool {
        matches!(self, Operation::DeleteWorkspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_string_round_trip() {
        let perm = Permission::new(EntityKind::ClientAssignment, Capability::View);
        assert_eq!(perm.to_string(), "client_assignment:view");
        assert_eq!(Permission::from_string(&perm.to_string()), Some(perm));
    }

    #[test]
    fn test_permission_parsing_rejects_garbage() {
        assert_eq!(Permission::from_string("pipeline"), None);
        assert_eq!(Permission::from_string("pipeline:manage"), None);
        assert_eq!(Permission::from_string("user:view"), None);
    }

    #[test]
    fn test_permission_grants() {
        let edit = Permission::new(EntityKind::Task, Capability::Edit);
        let view = Permission::new(EntityKind::Task, Capability::View);
        let other = Permission::new(EntityKind::Client, Capability::View);

        assert!(edit.grants(&view));
        assert!(!view.grants(&edit));
        assert!(!edit.grants(&other));
    }

    #[test]
    fn test_listings_require_view() {
        for op in [
            Operation::GetWorkspace,
            Operation::ListMembers,
            Operation::ListPipelines,
            Operation::ListAssignmentMembers,
            Operation::ListTasks,
            Operation::ListTaskMembers,
            Operation::ListClients,
        ] {
            assert_eq!(op.capability(), Capability::View, "{:?}", op);
        }
    }

    #[test]
    fn test_mutations_require_edit() {
        for op in [
            Operation::CreatePipeline,
            Operation::DeletePipeline,
            Operation::ReorderPipelines,
            Operation::CreateClientAssignment,
            Operation::ReorderClientAssignments,
            Operation::CreateTask,
            Operation::ReorderTasks,
            Operation::AddMember,
            Operation::RemoveMember,
            Operation::UpdateMemberPermission,
            Operation::DeleteClient,
        ] {
            assert_eq!(op.capability(), Capability::Edit, "{:?}", op);
        }
    }

    #[test]
    fn test_requires_owner() {
        assert!(Operation::DeleteWorkspace.requires_owner());
        assert!(!Operation::RenameWorkspace.requires_owner());
        assert!(!Operation::DeletePipeline.requires_owner());
    }
}
