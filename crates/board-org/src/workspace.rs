//! Workspace domain model
//!
//! Workspaces are the tenant boundary of the board. Every pipeline, client,
//! client assignment and task belongs to exactly one workspace, reached by
//! following parent links upward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A workspace is the top-level tenant of the board.
///
/// The owner is implicitly a member with full edit rights and never appears
/// in the membership table.
///
/// # Architecture
///
/// ```text
/// Workspace
///   ├─ Memberships (non-owner users, VIEW or EDIT)
///   ├─ Clients
///   └─ Pipelines (exactly one default)
///         └─ ClientAssignments
///               └─ Tasks
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::Workspace;
///
/// let owner_id = Uuid::now_v7();
/// let workspace = Workspace::new("Agency", owner_id);
/// assert_eq!(workspace.title, "Agency");
/// assert!(workspace.is_owned_by(owner_id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique identifier for the workspace
    pub id: Uuid,

    /// Human-readable title
    pub title: String,

    /// Owner user ID (the user who created the workspace)
    pub owner_id: Uuid,

    /// When the workspace was created
    pub created_at: DateTime<Utc>,

    /// When the workspace was last updated
    pub updated_at: DateTime<Utc>,

    /// Custom metadata for extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Workspace {
    /// Creates a new workspace owned by `owner_id`.
    ///
    /// The workspace is created with:
    /// - A newly generated UUID v7 ID
    /// - Current timestamp for created_at and updated_at
    /// - Empty metadata
    ///
    /// # Arguments
    ///
    /// * `title` - The workspace title
    /// * `owner_id` - The user ID who owns this workspace
    pub fn new(title: impl Into<String>, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            owner_id,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Check if `user_id` owns this workspace.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Change the title and bump `updated_at`.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }
}
