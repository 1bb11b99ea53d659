//! Client assignment domain model
//!
//! A client assignment is a client's card inside a pipeline. It carries its
//! own member list and owns an ordered list of tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client's card within a pipeline.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::ClientAssignment;
///
/// let pipeline_id = Uuid::now_v7();
/// let client_id = Uuid::now_v7();
/// let mut card = ClientAssignment::new(pipeline_id, client_id);
///
/// let user_id = Uuid::now_v7();
/// assert!(card.add_member(user_id));
/// assert!(!card.add_member(user_id));
/// assert!(card.has_member(user_id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAssignment {
    /// Unique identifier for the assignment
    pub id: Uuid,

    /// Pipeline that currently contains this card
    pub pipeline_id: Uuid,

    /// Client this card is about
    pub client_id: Uuid,

    /// Zero-based position within the pipeline
    pub pos: u32,

    /// Optional deadline
    pub deadline: Option<DateTime<Utc>>,

    /// Users working on this card
    #[serde(default)]
    pub members: Vec<Uuid>,

    /// When the assignment was created
    pub created_at: DateTime<Utc>,

    /// When the assignment was last updated
    pub updated_at: DateTime<Utc>,
}

impl ClientAssignment {
    /// Creates a new assignment at position 0 with no members and no deadline.
    ///
    /// # Arguments
    ///
    /// * `pipeline_id` - The containing pipeline
    /// * `client_id` - The client this card refers to
    pub fn new(pipeline_id: Uuid, client_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            pipeline_id,
            client_id,
            pos: 0,
            deadline: None,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the position of this assignment.
    pub fn with_pos(mut self, pos: u32) -> Self {
        self.pos = pos;
        self
    }

    /// Set or clear the deadline.
    pub fn set_deadline(&mut self, deadline: Option<DateTime<Utc>>) {
        self.deadline = deadline;
        self.updated_at = Utc::now();
    }

    /// Add a member to the card.
    ///
    /// # Returns
    ///
    /// `false` if the user was already a member
    pub fn add_member(&mut self, user_id: Uuid) -> bool {
        if self.members.contains(&user_id) {
            return false;
        }
        self.members.push(user_id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a member from the card.
    ///
    /// # Returns
    ///
    /// `false` if the user was not a member
    pub fn remove_member(&mut self, user_id: Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|id| *id != user_id);
        let removed = self.members.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Check if a user is a member of this card.
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}
