//! # Board Engine
//!
//! Tenant resolution and ordered-hierarchy engine for the workspace board.
//!
//! ## Overview
//!
//! The board-engine crate handles:
//! - **Tenant Resolution**: Walking any record up to the workspace that owns it
//! - **Access Evaluation**: Owner/member/level checks for every operation
//! - **Dense Ordering**: Appends, compaction and multi-scope reorders that keep
//!   sibling positions `0..n-1`
//! - **Lifecycle**: Workspace bootstrap with a default pipeline and cascading,
//!   all-or-nothing deletes
//!
//! ## Architecture
//!
//! ```text
//! Workspace ──→ Pipeline (ordered) ──→ ClientAssignment (ordered) ──→ Task (ordered)
//!     │                                       │
//!     ├──→ Client ────────────────────────────┘ (referenced)
//!     └──→ Membership (VIEW | EDIT)
//!
//! BoardService
//!   ├── TenantResolver            (record → workspace)
//!   ├── AccessEvaluator           (workspace + actor → decision)
//!   ├── OrderedCollectionManager  (append / compact / reorder)
//!   └── EntityLifecycleCoordinator (bootstrap / cascade delete)
//!           │
//!           ▼
//!       Storage (units of work over locked scopes)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_engine::{BoardService, EngineConfig, NewClient, NewTask};
//! use uuid::Uuid;
//!
//! # async fn example() -> board_engine::EngineResult<()> {
//! let service = BoardService::in_memory(EngineConfig::from_env());
//! let owner = Uuid::now_v7();
//!
//! let (workspace, inbox) = service.create_workspace(owner, "Acme").await?;
//! let client = service
//!     .create_client(owner, workspace.id, NewClient::named("Globex"))
//!     .await?;
//! let assignment = service
//!     .create_client_assignment(owner, inbox.id, client.id)
//!     .await?;
//! service
//!     .create_task(owner, assignment.id, NewTask::titled("Kickoff call"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Mapping
//!
//! | Error          | Status | Retryable          |
//! |----------------|--------|--------------------|
//! | `NotFound`     | 404    | no                 |
//! | `Unauthorized` | 403    | no                 |
//! | `Conflict`     | 409    | lock/position races |
//! | `Invalid`      | 422    | no                 |

pub mod access;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod ordering;
pub mod resolver;
pub mod service;
pub mod store;
pub mod views;

// Re-export main types for convenience
pub use access::{admit, AccessEvaluator};
pub use config::{ConfigError, EngineConfig};
pub use error::{reason, EngineError, EngineResult};
pub use lifecycle::{DeletionReport, EntityLifecycleCoordinator};
pub use ordering::{OrderedCollectionManager, ReorderEntry, ReorderOutcome};
pub use resolver::{Tenant, TenantResolver};
pub use service::{BoardService, NewClient, NewTask, TaskUpdate};
pub use store::{LockSet, MemoryStore, Record, Scope, Storage, StorageError};
