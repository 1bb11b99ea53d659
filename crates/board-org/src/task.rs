//! Task domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task on a client assignment.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::Task;
///
/// let card_id = Uuid::now_v7();
/// let mut task = Task::new(card_id, "Send proposal");
/// task.complete();
/// assert!(task.completed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub id: Uuid,

    /// Client assignment that owns this task
    pub client_assignment_id: Uuid,

    /// Short title
    pub title: String,

    /// Longer description
    pub description: Option<String>,

    /// Optional deadline
    pub deadline: Option<DateTime<Utc>>,

    /// Zero-based position within the client assignment
    pub pos: u32,

    /// Whether the task is done
    pub completed: bool,

    /// Users assigned to the task
    #[serde(default)]
    pub assignees: Vec<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task at position 0.
    pub fn new(client_assignment_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            client_assignment_id,
            title: title.into(),
            description: None,
            deadline: None,
            pos: 0,
            completed: false,
            assignees: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the position of this task.
    pub fn with_pos(mut self, pos: u32) -> Self {
        self.pos = pos;
        self
    }

    /// Mark the task as done.
    pub fn complete(&mut self) {
        self.completed = true;
        self.updated_at = Utc::now();
    }

    /// Mark the task as open again.
    pub fn reopen(&mut self) {
        self.completed = false;
        self.updated_at = Utc::now();
    }

    /// Assign a user.
    ///
    /// # Returns
    ///
    /// `false` if the user was already assigned
    pub fn assign(&mut self, user_id: Uuid) -> bool {
        if self.assignees.contains(&user_id) {
            return false;
        }
        self.assignees.push(user_id);
        self.updated_at = Utc::now();
        true
    }

    /// Unassign a user.
    ///
    /// # Returns
    ///
    /// `false` if the user was not assigned
    pub fn unassign(&mut self, user_id: Uuid) -> bool {
        let before = self.assignees.len();
        self.assignees.retain(|id| *id != user_id);
        let removed = self.assignees.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let card_id = Uuid::now_v7();
        let task = Task::new(card_id, "Call client").with_description("Discuss scope");

        assert_eq!(task.client_assignment_id, card_id);
        assert_eq!(task.description.as_deref(), Some("Discuss scope"));
        assert!(!task.completed);
        assert_eq!(task.pos, 0);
    }

    #[test]
    fn test_complete_and_reopen() {
        let mut task = Task::new(Uuid::now_v7(), "Invoice");
        task.complete();
        assert!(task.completed);
        task.reopen();
        assert!(!task.completed);
    }

    #[test]
    fn test_assignees() {
        let mut task = Task::new(Uuid::now_v7(), "Invoice");
        let user = Uuid::now_v7();

        assert!(task.assign(user));
        assert!(!task.assign(user));
        assert_eq!(task.assignees, vec![user]);
        assert!(task.unassign(user));
        assert!(!task.unassign(user));
    }
}
