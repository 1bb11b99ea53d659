//! In-memory transactional store.
//!
//! Committed state is an immutable map behind an `Arc` that is swapped
//! wholesale on commit, so readers and snapshots never observe a partially
//! applied unit of work. Scope locks are per-scope async mutexes taken in
//! ascending order with a timeout.

use async_trait::async_trait;
use board_org::Membership;
use board_rbac::EntityKind;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::record::{LockSet, Record, Scope};
use super::{Reader, Storage, StorageError, StorageResult, Transaction};

type Rows = HashMap<Uuid, Record>;

/// Default time a transaction waits for a scope lock.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Units of work committed
    pub commits: u64,
    /// Units of work rolled back explicitly
    pub rollbacks: u64,
    /// Commits refused by a constraint
    pub rejected_commits: u64,
    /// Transactions that gave up waiting for a scope lock
    pub lock_timeouts: u64,
}

/// In-memory store.
///
/// Suitable for single-process deployments and testing. Cloning shares the
/// underlying state.
#[derive(Clone)]
pub struct MemoryStore {
    /// Committed rows
    committed: Arc<RwLock<Arc<Rows>>>,
    /// Lock registry, one mutex per scope
    scope_locks: Arc<Mutex<HashMap<Scope, Arc<Mutex<()>>>>>,
    /// Statistics
    stats: Arc<RwLock<StoreStats>>,
    /// Time allowed for taking each scope lock
    lock_timeout: Duration,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create with a custom lock timeout.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            committed: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
            scope_locks: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(RwLock::new(StoreStats::default())),
            lock_timeout,
        }
    }

    /// Get store statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }

    /// Number of committed records of a kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.committed
            .read()
            .await
            .values()
            .filter(|r| r.kind() == kind)
            .count()
    }

    async fn scope_mutex(&self, scope: Scope) -> Arc<Mutex<()>> {
        let mut registry = self.scope_locks.lock().await;
        registry
            .entry(scope)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn current(&self) -> Arc<Rows> {
        self.committed.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reader for MemoryStore {
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>> {
        Ok(find_in(&*self.current().await, kind, id))
    }

    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        Ok(children_in(self.current().await.values(), scope))
    }

    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>> {
        Ok(memberships_in(self.current().await.values(), user_id))
    }
}

#[async_trait]
impl Storage for MemoryStore {
    type Tx = MemoryTransaction;
    type Snapshot = MemorySnapshot;

    async fn begin(&self, locks: LockSet) -> StorageResult<MemoryTransaction> {
        let mut guards = Vec::with_capacity(locks.len());

        for scope in locks.iter() {
            let mutex = self.scope_mutex(*scope).await;
            match tokio::time::timeout(self.lock_timeout, mutex.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    self.stats.write().await.lock_timeouts += 1;
                    tracing::warn!(
                        scope = %scope,
                        timeout_ms = self.lock_timeout.as_millis() as u64,
                        "timed out waiting for scope lock"
                    );
                    return Err(StorageError::LockTimeout(*scope));
                }
            }
        }

        tracing::trace!(scopes = locks.len(), "transaction started");

        Ok(MemoryTransaction {
            committed: self.committed.clone(),
            stats: self.stats.clone(),
            overlay: HashMap::new(),
            held: locks,
            _guards: guards,
        })
    }

    async fn snapshot(&self) -> StorageResult<MemorySnapshot> {
        Ok(MemorySnapshot {
            rows: self.current().await,
        })
    }
}

/// Point-in-time view of a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    rows: Arc<Rows>,
}

#[async_trait]
impl Reader for MemorySnapshot {
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>> {
        Ok(find_in(&self.rows, kind, id))
    }

    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        Ok(children_in(self.rows.values(), scope))
    }

    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>> {
        Ok(memberships_in(self.rows.values(), user_id))
    }
}

/// Transaction on a [`MemoryStore`].
///
/// Writes are buffered in an overlay (`None` marks a deletion) and merged
/// into the committed state on commit.
pub struct MemoryTransaction {
    committed: Arc<RwLock<Arc<Rows>>>,
    stats: Arc<RwLock<StoreStats>>,
    overlay: HashMap<Uuid, Option<Record>>,
    held: LockSet,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("held", &self.held)
            .field("pending_writes", &self.overlay.len())
            .finish()
    }
}

impl MemoryTransaction {
    async fn view(&self, kind: EntityKind, id: Uuid) -> Option<Record> {
        match self.overlay.get(&id) {
            Some(Some(record)) if record.kind() == kind => Some(record.clone()),
            Some(_) => None,
            None => find_in(&**self.committed.read().await, kind, id),
        }
    }

    fn require_held(&self, scope: Scope) -> StorageResult<()> {
        if self.held.contains(&scope) {
            Ok(())
        } else {
            Err(StorageError::ScopeNotLocked(scope))
        }
    }

    fn merged(&self, committed: &Rows) -> Vec<Record> {
        committed
            .iter()
            .filter(|(id, _)| !self.overlay.contains_key(id))
            .map(|(_, record)| record.clone())
            .chain(self.overlay.values().flatten().cloned())
            .collect()
    }
}

#[async_trait]
impl Reader for MemoryTransaction {
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>> {
        Ok(self.view(kind, id).await)
    }

    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        let committed = self.committed.read().await.clone();
        Ok(children_in(self.merged(&committed).iter(), scope))
    }

    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>> {
        let committed = self.committed.read().await.clone();
        Ok(memberships_in(self.merged(&committed).iter(), user_id))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn holds(&self, scope: &Scope) -> bool {
        self.held.contains(scope)
    }

    async fn create(&mut self, record: Record) -> StorageResult<()> {
        self.require_held(record.scope())?;

        let id = record.id();
        let exists = match self.overlay.get(&id) {
            Some(entry) => entry.is_some(),
            None => self.committed.read().await.contains_key(&id),
        };
        if exists {
            return Err(StorageError::Duplicate {
                kind: record.kind(),
                id,
            });
        }

        self.overlay.insert(id, Some(record));
        Ok(())
    }

    async fn update(&mut self, record: Record) -> StorageResult<()> {
        let (kind, id) = (record.kind(), record.id());
        let current = self
            .view(kind, id)
            .await
            .ok_or(StorageError::NotFound { kind, id })?;

        self.require_held(current.scope())?;
        self.require_held(record.scope())?;

        self.overlay.insert(id, Some(record));
        Ok(())
    }

    async fn delete(&mut self, kind: EntityKind, id: Uuid) -> StorageResult<()> {
        let current = self
            .view(kind, id)
            .await
            .ok_or(StorageError::NotFound { kind, id })?;

        self.require_held(current.scope())?;

        self.overlay.insert(id, None);
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        let writes = self.overlay.len();
        let mut state = self.committed.write().await;
        let mut next: Rows = (**state).clone();

        let mut touched = BTreeSet::new();
        let mut upserted = Vec::new();
        let mut deleted = HashSet::new();

        for (id, change) in self.overlay {
            if let Some(old) = next.get(&id) {
                touched.insert(old.scope());
            }
            match change {
                Some(record) => {
                    touched.insert(record.scope());
                    upserted.push(id);
                    next.insert(id, record);
                }
                None => {
                    deleted.insert(id);
                    next.remove(&id);
                }
            }
        }

        if let Err(err) = check_constraints(&next, &touched, &upserted, &deleted) {
            self.stats.write().await.rejected_commits += 1;
            return Err(err);
        }

        *state = Arc::new(next);
        self.stats.write().await.commits += 1;
        tracing::trace!(writes, "transaction committed");

        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        self.stats.write().await.rollbacks += 1;
        tracing::trace!(discarded = self.overlay.len(), "transaction rolled back");
        Ok(())
    }
}

fn find_in(rows: &Rows, kind: EntityKind, id: Uuid) -> Option<Record> {
    rows.get(&id).filter(|r| r.kind() == kind).cloned()
}

fn children_in<'a>(rows: impl Iterator<Item = &'a Record>, scope: Scope) -> Vec<Record> {
    let mut children: Vec<Record> = rows.filter(|r| r.scope() == scope).cloned().collect();
    children.sort_by(|a, b| {
        a.pos()
            .cmp(&b.pos())
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    });
    children
}

fn memberships_in<'a>(rows: impl Iterator<Item = &'a Record>, user_id: Uuid) -> Vec<Membership> {
    let mut memberships: Vec<Membership> = rows
        .filter_map(|r| match r {
            Record::Membership(m) if m.user_id == user_id => Some(m.clone()),
            _ => None,
        })
        .collect();
    memberships.sort_by_key(|m| m.added_at);
    memberships
}

fn check_constraints(
    rows: &Rows,
    touched: &BTreeSet<Scope>,
    upserted: &[Uuid],
    deleted: &HashSet<Uuid>,
) -> StorageResult<()> {
    for scope in touched.iter().filter(|s| s.is_positional()) {
        let mut seen = HashSet::new();
        for record in rows.values().filter(|r| r.scope() == *scope) {
            if let Some(pos) = record.pos() {
                if !seen.insert(pos) {
                    return Err(StorageError::UniqueViolation { scope: *scope, pos });
                }
            }
        }
    }

    for id in upserted {
        let Some(record) = rows.get(id) else { continue };
        for (kind, target) in record.references() {
            if find_in(rows, kind, target).is_none() {
                return Err(StorageError::ForeignKeyViolation(format!(
                    "{} {} references missing {} {}",
                    record.kind(),
                    record.id(),
                    kind,
                    target
                )));
            }
        }
    }

    if !deleted.is_empty() {
        for record in rows.values() {
            if let Some((kind, target)) = record
                .references()
                .into_iter()
                .find(|(_, target)| deleted.contains(target))
            {
                return Err(StorageError::ForeignKeyViolation(format!(
                    "{} {} still references deleted {} {}",
                    record.kind(),
                    record.id(),
                    kind,
                    target
                )));
            }
        }
    }

    Ok(())
}
