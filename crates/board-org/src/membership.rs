//! Membership domain model
//!
//! This module provides the membership entity linking a non-owner user to a
//! workspace with a permission level. Owners never have a membership row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permission::PermissionLevel;

/// Workspace membership linking a user to a workspace.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::{Membership, PermissionLevel};
///
/// let workspace_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let membership = Membership::new(workspace_id, user_id, PermissionLevel::View);
/// assert!(!membership.permission.can_edit());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Workspace ID
    pub workspace_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Permission level within the workspace
    pub permission: PermissionLevel,

    /// When the user was added
    pub added_at: DateTime<Utc>,

    /// Who added this user (if applicable)
    pub added_by: Option<Uuid>,
}

impl Membership {
    /// Creates a new membership.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - The workspace ID
    /// * `user_id` - The user ID
    /// * `permission` - The user's permission level in the workspace
    pub fn new(workspace_id: Uuid, user_id: Uuid, permission: PermissionLevel) -> Self {
        Self {
            id: Uuid::now_v7(),
            workspace_id,
            user_id,
            permission,
            added_at: Utc::now(),
            added_by: None,
        }
    }

    /// Set who added this user to the workspace.
    pub fn with_adder(mut self, adder_id: Uuid) -> Self {
        self.added_by = Some(adder_id);
        self
    }
}
