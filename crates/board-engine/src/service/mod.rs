//! Board service
//!
//! The operation surface of the engine. Every operation follows the same
//! path:
//!
//! ```text
//! snapshot ──→ resolve + authorize ──→ plan locks
//!                                          │
//!                            begin(locks) ─┘
//!                               resolve + authorize again (under locks)
//!                               mutate (ordering / lifecycle)
//!                            commit, or roll back on any error
//! ```
//!
//! Listings read from one snapshot and never take locks.

mod assignments;
mod clients;
mod pipelines;
mod tasks;
mod workspaces;

pub use clients::NewClient;
pub use tasks::{NewTask, TaskUpdate};

use board_rbac::{EntityKind, Operation};
use std::sync::Arc;
use uuid::Uuid;

use crate::access::admit;
use crate::config::EngineConfig;
use crate::error::{reason, EngineError, EngineResult};
use crate::lifecycle::EntityLifecycleCoordinator;
use crate::resolver::Tenant;
use crate::store::{Entity, MemoryStore, Storage, Transaction};

/// Workspace board operations over a store.
///
/// # Example
///
/// ```rust,no_run
/// use board_engine::{BoardService, EngineConfig, ReorderEntry};
/// use uuid::Uuid;
///
/// # async fn example() -> board_engine::EngineResult<()> {
/// let service = BoardService::in_memory(EngineConfig::default());
/// let owner = Uuid::now_v7();
///
/// let (workspace, _default) = service.create_workspace(owner, "Acme").await?;
/// let leads = service.create_pipeline(owner, workspace.id, "Leads").await?;
///
/// // Put "Leads" first.
/// service
///     .reorder_pipelines(owner, workspace.id, vec![ReorderEntry::new(leads.id)])
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct BoardService<S: Storage> {
    store: Arc<S>,
    config: EngineConfig,
    lifecycle: EntityLifecycleCoordinator<S>,
}

impl<S: Storage> BoardService<S> {
    /// Create a service over a store.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let lifecycle = EntityLifecycleCoordinator::new(store.clone(), config.clone());
        Self {
            store,
            config,
            lifecycle,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The lifecycle coordinator used for cascading operations.
    pub fn lifecycle(&self) -> &EntityLifecycleCoordinator<S> {
        &self.lifecycle
    }

    /// Resolve and authorize against a snapshot, before any lock is taken.
    async fn preflight(
        &self,
        actor: Uuid,
        kind: EntityKind,
        id: Uuid,
        operation: Operation,
    ) -> EngineResult<Tenant> {
        let snapshot = self.store.snapshot().await?;
        admit(&snapshot, actor, kind, id, operation).await
    }
}

impl BoardService<MemoryStore> {
    /// Service over a fresh in-memory store using the configured lock
    /// timeout.
    pub fn in_memory(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::with_lock_timeout(config.lock_timeout()));
        Self::new(store, config)
    }
}

/// Admit `operation` on the record `id` of type `E`, apply `change` to it
/// and write it back.
async fn modify<T, E, F>(
    tx: &mut T,
    actor: Uuid,
    id: Uuid,
    operation: Operation,
    change: F,
) -> EngineResult<E>
where
    T: Transaction,
    E: Entity + Clone,
    F: FnOnce(&mut E, &Tenant) -> EngineResult<()>,
{
    let tenant = admit(&*tx, actor, E::KIND, id, operation).await?;
    let mut entity: E = tenant.target_as()?;
    change(&mut entity, &tenant)?;
    tx.update(entity.clone().into()).await?;
    Ok(entity)
}

fn require_text(value: &str, reason: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        Err(EngineError::invalid(reason))
    } else {
        Ok(())
    }
}

fn require_title(title: &str) -> EngineResult<()> {
    require_text(title, reason::EMPTY_TITLE)
}
