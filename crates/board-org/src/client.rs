//! Client domain model
//!
//! Clients belong to a workspace and appear on the board through client
//! assignments. A client with no assignment is "unassigned".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A client of the workspace.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_org::Client;
///
/// let client = Client::new(Uuid::now_v7(), "Acme Corp")
///     .with_email("ops@acme.test")
///     .with_phone("+1 555 0100");
/// assert!(client.matches_search("ACME"));
/// assert!(client.matches_search("555"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier for the client
    pub id: Uuid,

    /// Workspace the client belongs to
    pub workspace_id: Uuid,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: Option<String>,

    /// Contact phone
    pub phone: Option<String>,

    /// When the client was created
    pub created_at: DateTime<Utc>,

    /// When the client was last updated
    pub updated_at: DateTime<Utc>,

    /// Custom metadata for extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Client {
    /// Creates a new client in `workspace_id`.
    pub fn new(workspace_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            workspace_id,
            name: name.into(),
            email: None,
            phone: None,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Set the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the contact phone.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Case-insensitive substring match on name, email or phone.
    ///
    /// An empty query matches every client.
    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        std::iter::once(Some(self.name.as_str()))
            .chain([self.email.as_deref(), self.phone.as_deref()])
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
