//! Read models returned by listing operations.

use board_org::{Client, ClientAssignment, PermissionLevel, Pipeline, Task, Workspace};
use board_rbac::Grant;
use serde::Serialize;
use uuid::Uuid;

/// A workspace visible to the actor, with how access was granted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSummary {
    #[serde(flatten)]
    pub workspace: Workspace,
    /// Owner, or member with a level.
    pub access: Grant,
}

/// A user with access to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub user_id: Uuid,
    /// Effective level; the owner always has EDIT.
    pub permission: PermissionLevel,
    pub owner: bool,
}

impl MemberView {
    /// The workspace owner.
    pub fn owner(user_id: Uuid) -> Self {
        Self {
            user_id,
            permission: PermissionLevel::Edit,
            owner: true,
        }
    }

    /// A member holding `permission`.
    pub fn member(user_id: Uuid, permission: PermissionLevel) -> Self {
        Self {
            user_id,
            permission,
            owner: false,
        }
    }
}

/// A pipeline with its assignments, each with its tasks, all ordered by
/// position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineView {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub client_assignments: Vec<AssignmentView>,
}

/// An assignment with its client and tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: ClientAssignment,
    pub client: Client,
    pub tasks: Vec<Task>,
}

/// A client with every pipeline it is placed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientListing {
    #[serde(flatten)]
    pub client: Client,
    pub placements: Vec<Placement>,
}

/// Where a client sits on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub client_assignment_id: Uuid,
    pub pipeline_id: Uuid,
    pub pipeline_title: String,
}
