//! Storage port
//!
//! The engine reads and writes records only through these traits. Every
//! mutation runs inside a [`Transaction`] that holds exclusive locks on the
//! scopes it touches; [`run_atomic`] commits the unit of work on success and
//! rolls it back on failure.
//!
//! ```text
//! Storage::begin(LockSet) ──→ Transaction (locks held, lowest id first)
//!                               │  find / find_children   (sees own writes)
//!                               │  create / update / delete (scope must be held)
//!                               ▼
//!                        commit ──→ constraints checked, state swapped
//!                        rollback / drop ──→ nothing applied
//! ```

pub mod memory;
pub mod record;

pub use memory::{MemorySnapshot, MemoryStore, MemoryTransaction, StoreStats};
pub use record::{Entity, LockSet, Record, Scope};

use async_trait::async_trait;
use board_org::Membership;
use board_rbac::EntityKind;
use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Storage error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Row does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind looked up.
        kind: EntityKind,
        /// Id looked up.
        id: Uuid,
    },

    /// Row with this id already exists
    #[error("{kind} {id} already exists")]
    Duplicate {
        /// Kind of the row.
        kind: EntityKind,
        /// Id of the row.
        id: Uuid,
    },

    /// Write touched a scope the transaction does not hold
    #[error("Scope {0} is not locked by this transaction")]
    ScopeNotLocked(Scope),

    /// Two live rows share a position in one scope
    #[error("Position {pos} is taken twice in scope {scope}")]
    UniqueViolation {
        /// Scope with the collision.
        scope: Scope,
        /// Colliding position.
        pos: u32,
    },

    /// Row references a missing row, or a deleted row is still referenced
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Scope lock not acquired in time
    #[error("Timed out waiting for scope lock {0}")]
    LockTimeout(Scope),

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Read access to stored records.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Find a record by kind and id.
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>>;

    /// Children of a scope.
    ///
    /// Positional kinds come back ordered by `pos`; other kinds by creation
    /// time.
    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>>;

    /// Every membership row of a user, across workspaces.
    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>>;
}

/// A unit of work holding scope locks.
///
/// Writes are visible to reads on the same transaction. Dropping a
/// transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Reader + Sized {
    /// Check if this transaction holds the lock on `scope`.
    fn holds(&self, scope: &Scope) -> bool;

    /// Insert a new record.
    async fn create(&mut self, record: Record) -> StorageResult<()>;

    /// Replace an existing record.
    ///
    /// Both the record's current scope and its new scope must be held.
    async fn update(&mut self, record: Record) -> StorageResult<()>;

    /// Delete a record.
    async fn delete(&mut self, kind: EntityKind, id: Uuid) -> StorageResult<()>;

    /// Check constraints and apply every write at once.
    async fn commit(self) -> StorageResult<()>;

    /// Discard every write.
    async fn rollback(self) -> StorageResult<()>;
}

/// A transactional record store.
#[async_trait]
pub trait Storage: Reader + 'static {
    /// Transaction type.
    type Tx: Transaction + 'static;

    /// Point-in-time read view.
    type Snapshot: Reader + 'static;

    /// Start a unit of work, taking every lock in `locks` in order.
    async fn begin(&self, locks: LockSet) -> StorageResult<Self::Tx>;

    /// Take a consistent read view for multi-scope listings.
    async fn snapshot(&self) -> StorageResult<Self::Snapshot>;
}

/// Run `work` as one unit of work.
///
/// The closure receives the transaction and hands it back with its result;
/// `Ok` commits, `Err` rolls back. Either every write lands or none does.
///
/// # Example
///
/// ```rust,no_run
/// use board_engine::store::{run_atomic, LockSet, MemoryStore, Scope, Transaction};
/// use board_engine::{EngineError, EngineResult};
/// use board_org::Workspace;
/// use uuid::Uuid;
///
/// # async fn example() -> EngineResult<()> {
/// let store = MemoryStore::new();
/// let owner = Uuid::now_v7();
/// let workspace = Workspace::new("Acme", owner);
///
/// run_atomic(&store, LockSet::new().with(Scope::owned_by(owner)), |mut tx| async move {
///     let result = tx.create(workspace.into()).await.map_err(EngineError::from);
///     (tx, result)
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_atomic<S, T, F, Fut>(store: &S, locks: LockSet, work: F) -> EngineResult<T>
where
    S: Storage + ?Sized,
    F: FnOnce(S::Tx) -> Fut,
    Fut: Future<Output = (S::Tx, EngineResult<T>)>,
{
    let tx = store.begin(locks).await?;
    let (tx, result) = work(tx).await;

    match result {
        Ok(value) => {
            if let Err(err) = tx.commit().await {
                tracing::warn!(error = %err, "unit of work rejected at commit");
                return Err(err.into());
            }
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(reason = err.reason(), "unit of work rolled back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Load a record of type `T`, failing `NotFound` if it is missing.
pub async fn load<T, R>(reader: &R, id: Uuid) -> EngineResult<T>
where
    T: Entity,
    R: Reader + ?Sized,
{
    reader
        .find(T::KIND, id)
        .await?
        .and_then(T::from_record)
        .ok_or_else(|| EngineError::not_found(T::KIND))
}

/// Load the children of a scope as records of type `T`.
pub async fn load_children<T, R>(reader: &R, scope: Scope) -> EngineResult<Vec<T>>
where
    T: Entity,
    R: Reader + ?Sized,
{
    Ok(reader
        .find_children(scope)
        .await?
        .into_iter()
        .filter_map(T::from_record)
        .collect())
}
