//! Pipeline domain model
//!
//! A pipeline is an ordered kanban column set inside a workspace. Each
//! workspace has exactly one default pipeline, created together with the
//! workspace and never deletable on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered board of client assignments within a workspace.
///
/// `pos` is the zero-based position of the pipeline among the live
/// pipelines of its workspace.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::Pipeline;
///
/// let workspace_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let pipeline = Pipeline::new(workspace_id, "Onboarding", user_id).with_pos(2);
/// assert_eq!(pipeline.pos, 2);
/// assert!(!pipeline.is_default);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique identifier for the pipeline
    pub id: Uuid,

    /// Workspace this pipeline belongs to
    pub workspace_id: Uuid,

    /// Human-readable title
    pub title: String,

    /// Whether this is the workspace's default pipeline
    #[serde(rename = "default")]
    pub is_default: bool,

    /// Zero-based position within the workspace
    pub pos: u32,

    /// User who created the pipeline
    pub created_by: Uuid,

    /// When the pipeline was created
    pub created_at: DateTime<Utc>,

    /// When the pipeline was last updated
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    /// Creates a new, non-default pipeline at position 0.
    ///
    /// Callers set the real position with [`Pipeline::with_pos`] once it has
    /// been computed inside the unit of work that inserts the row.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - The parent workspace
    /// * `title` - Pipeline title
    /// * `created_by` - User who created the pipeline
    pub fn new(workspace_id: Uuid, title: impl Into<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            workspace_id,
            title: title.into(),
            is_default: false,
            pos: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates the default pipeline of a workspace.
    ///
    /// The default pipeline always sits at position 0 of a fresh workspace.
    pub fn default_for(workspace_id: Uuid, title: impl Into<String>, created_by: Uuid) -> Self {
        let mut pipeline = Self::new(workspace_id, title, created_by);
        pipeline.is_default = true;
        pipeline
    }

    /// Set the position of this pipeline.
    pub fn with_pos(mut self, pos: u32) -> Self {
        self.pos = pos;
        self
    }

    /// Change the title and bump `updated_at`.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }
}
