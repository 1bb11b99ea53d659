//! Tenant resolution.
//!
//! Walks the fixed parent chain of any record up to its workspace using
//! single-hop lookups.

use board_org::Workspace;
use board_rbac::EntityKind;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::store::{Entity, Reader, Record};

/// A resolved target: the record itself and the workspace that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    /// Owning workspace.
    pub workspace: Workspace,
    /// The record the operation targets.
    pub target: Record,
}

impl Tenant {
    /// The target as a concrete record type.
    pub fn target_as<T: Entity>(&self) -> EngineResult<T> {
        T::from_record(self.target.clone()).ok_or_else(|| EngineError::not_found(T::KIND))
    }
}

/// Resolves the owning workspace of any record.
///
/// # Example
///
/// ```rust,no_run
/// use board_engine::{MemoryStore, TenantResolver};
/// use board_rbac::EntityKind;
/// use uuid::Uuid;
///
/// # async fn example(task_id: Uuid) -> board_engine::EngineResult<()> {
/// let store = MemoryStore::new();
/// let workspace_id = TenantResolver::new(&store)
///     .resolve_workspace(EntityKind::Task, task_id)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct TenantResolver<'a, R: Reader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: Reader + ?Sized> TenantResolver<'a, R> {
    /// Create a resolver over a reader.
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Id of the workspace that owns `(kind, id)`.
    ///
    /// Fails `NotFound` (`<kind>_not_found`) naming the first missing link.
    pub async fn resolve_workspace(&self, kind: EntityKind, id: Uuid) -> EngineResult<Uuid> {
        Ok(self.resolve(kind, id).await?.workspace.id)
    }

    /// The record `(kind, id)` together with its owning workspace.
    pub async fn resolve(&self, kind: EntityKind, id: Uuid) -> EngineResult<Tenant> {
        let target = self.fetch(kind, id).await?;

        let mut current = target.clone();
        while !matches!(current, Record::Workspace(_)) {
            let (Some(parent_kind), Some(parent_id)) =
                (current.kind().parent_kind(), current.parent_id())
            else {
                return Err(EngineError::not_found(EntityKind::Workspace));
            };
            current = self.fetch(parent_kind, parent_id).await?;
        }

        let workspace = Workspace::from_record(current)
            .ok_or_else(|| EngineError::not_found(EntityKind::Workspace))?;
        Ok(Tenant { workspace, target })
    }

    async fn fetch(&self, kind: EntityKind, id: Uuid) -> EngineResult<Record> {
        self.reader.find(kind, id).await?.ok_or_else(|| {
            tracing::debug!(kind = %kind, id = %id, "parent chain broken");
            EngineError::not_found(kind)
        })
    }
}
