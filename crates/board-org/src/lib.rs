//! # Board Organization Records
//!
//! This crate provides the multi-tenant records of the workspace board.
//!
//! ## Overview
//!
//! The board-org crate handles:
//! - **Workspaces**: Top-level tenant entities with an owner
//! - **Pipelines**: Ordered boards inside a workspace, exactly one default
//! - **Client Assignments**: A client's card inside a pipeline
//! - **Tasks**: Ordered work items on a client assignment
//! - **Clients**: Workspace-scoped customers referenced by assignments
//! - **Memberships**: Non-owner users with a VIEW or EDIT permission level
//!
//! ## Architecture
//!
//! ```text
//! User
//!   ├─ owns ─→ Workspace
//!   │            ├─ Client
//!   │            └─ Pipeline (pos)
//!   │                  └─ ClientAssignment (pos) ─→ Client
//!   │                        └─ Task (pos)
//!   └─ Membership (VIEW | EDIT) ─→ Workspace
//! ```
//!
//! Every positional record carries a zero-based `pos` that is dense within
//! its parent. The records here are plain data; keeping `pos` dense is the
//! job of `board-engine`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_org::{ClientAssignment, Client, Pipeline, Workspace};
//! use uuid::Uuid;
//!
//! let owner_id = Uuid::now_v7();
//! let workspace = Workspace::new("Agency", owner_id);
//! let pipeline = Pipeline::default_for(workspace.id, "Inbox", owner_id);
//! let client = Client::new(workspace.id, "Acme Corp");
//! let card = ClientAssignment::new(pipeline.id, client.id);
//! ```

pub mod assignment;
pub mod client;
pub mod membership;
pub mod permission;
pub mod pipeline;
pub mod task;
pub mod workspace;

// Re-export main types for convenience
pub use assignment::ClientAssignment;
pub use client::Client;
pub use membership::Membership;
pub use permission::PermissionLevel;
pub use pipeline::Pipeline;
pub use task::Task;
pub use workspace::Workspace;
