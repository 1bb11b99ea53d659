//! Access evaluation.
//!
//! The single choke point every operation passes through before it reads or
//! mutates workspace-scoped records.

use board_org::{Membership, Workspace};
use board_rbac::{
    evaluate, evaluate_owner_only, AccessDecision, Capability, EntityKind, Grant, Operation,
};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::resolver::{Tenant, TenantResolver};
use crate::store::{load, load_children, Reader, Scope};

/// Decides whether an actor may exercise a capability on a workspace.
///
/// Ownership grants everything. Otherwise the membership row decides: VIEW
/// is satisfied by either level, EDIT only by EDIT.
pub struct AccessEvaluator<'a, R: Reader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: Reader + ?Sized> AccessEvaluator<'a, R> {
    /// Create an evaluator over a reader.
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Decide `capability` for `user_id` on the workspace `workspace_id`.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - Workspace being accessed
    /// * `user_id` - Acting user
    /// * `capability` - VIEW or EDIT
    ///
    /// # Returns
    ///
    /// The decision; `NotFound` only if the workspace itself is missing.
    pub async fn authorize(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        capability: Capability,
    ) -> EngineResult<AccessDecision> {
        let workspace: Workspace = load(self.reader, workspace_id).await?;
        self.authorize_in(&workspace, user_id, capability).await
    }

    /// Decide `capability` on an already loaded workspace.
    pub async fn authorize_in(
        &self,
        workspace: &Workspace,
        user_id: Uuid,
        capability: Capability,
    ) -> EngineResult<AccessDecision> {
        if workspace.is_owned_by(user_id) {
            return Ok(evaluate(workspace.owner_id, user_id, None, capability));
        }

        let membership = self.membership_of(workspace.id, user_id).await?;
        Ok(evaluate(
            workspace.owner_id,
            user_id,
            membership.map(|m| m.permission),
            capability,
        ))
    }

    /// Allow `operation` or fail `Unauthorized`.
    pub async fn require(
        &self,
        workspace: &Workspace,
        user_id: Uuid,
        operation: Operation,
    ) -> EngineResult<Grant> {
        let decision = if operation.requires_owner() {
            evaluate_owner_only(workspace.owner_id, user_id)
        } else {
            self.authorize_in(workspace, user_id, operation.capability())
                .await?
        };

        match decision {
            AccessDecision::Allow(grant) => Ok(grant),
            AccessDecision::Deny(reason) => {
                tracing::warn!(
                    workspace_id = %workspace.id,
                    actor = %user_id,
                    operation = ?operation,
                    reason = reason.as_str(),
                    "access denied"
                );
                Err(EngineError::Unauthorized(reason.as_str().to_string()))
            }
        }
    }

    /// The membership row of `user_id` in a workspace, if any.
    pub async fn membership_of(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<Option<Membership>> {
        let memberships: Vec<Membership> =
            load_children(self.reader, Scope::memberships(workspace_id)).await?;
        Ok(memberships.into_iter().find(|m| m.user_id == user_id))
    }

    /// Check if `user_id` is the owner or holds any membership row.
    pub async fn is_member(&self, workspace: &Workspace, user_id: Uuid) -> EngineResult<bool> {
        Ok(workspace.is_owned_by(user_id)
            || self.membership_of(workspace.id, user_id).await?.is_some())
    }
}

/// Resolve `(kind, id)` to its workspace and authorize `operation` on it.
///
/// Every service operation starts here.
pub async fn admit<R: Reader + ?Sized>(
    reader: &R,
    actor: Uuid,
    kind: EntityKind,
    id: Uuid,
    operation: Operation,
) -> EngineResult<Tenant> {
    let tenant = TenantResolver::new(reader).resolve(kind, id).await?;
    AccessEvaluator::new(reader)
        .require(&tenant.workspace, actor, operation)
        .await?;
    Ok(tenant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LockSet, MemoryStore, Storage, Transaction};
    use board_org::PermissionLevel;
    use board_rbac::{DenyReason, Grant};

    async fn workspace_with_member(
        store: &MemoryStore,
        level: Option<PermissionLevel>,
    ) -> (Workspace, Uuid) {
        let owner = Uuid::now_v7();
        let member = Uuid::now_v7();
        let workspace = Workspace::new("Acme", owner);

        let mut tx = store
            .begin(
                LockSet::new()
                    .with(Scope::owned_by(owner))
                    .with(Scope::memberships(workspace.id)),
            )
            .await
            .unwrap();
        tx.create(workspace.clone().into()).await.unwrap();
        if let Some(level) = level {
            tx.create(Membership::new(workspace.id, member, level).into())
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        (workspace, member)
    }

    #[tokio::test]
    async fn test_owner_allowed_without_membership() {
        let store = MemoryStore::new();
        let (workspace, _) = workspace_with_member(&store, None).await;
        let evaluator = AccessEvaluator::new(&store);

        for capability in Capability::all() {
            assert_eq!(
                evaluator
                    .authorize(workspace.id, workspace.owner_id, capability)
                    .await
                    .unwrap(),
                AccessDecision::Allow(Grant::Owner)
            );
        }
    }

    #[tokio::test]
    async fn test_view_member_denied_edit() {
        let store = MemoryStore::new();
        let (workspace, member) =
            workspace_with_member(&store, Some(PermissionLevel::View)).await;
        let evaluator = AccessEvaluator::new(&store);

        assert!(evaluator
            .authorize(workspace.id, member, Capability::View)
            .await
            .unwrap()
            .is_allowed());
        assert_eq!(
            evaluator
                .require(&workspace, member, Operation::CreatePipeline)
                .await,
            Err(EngineError::Unauthorized("insufficient_permission".into()))
        );
    }

    #[tokio::test]
    async fn test_stranger_denied() {
        let store = MemoryStore::new();
        let (workspace, _) = workspace_with_member(&store, None).await;
        let stranger = Uuid::now_v7();

        assert_eq!(
            AccessEvaluator::new(&store)
                .authorize(workspace.id, stranger, Capability::View)
                .await
                .unwrap(),
            AccessDecision::Deny(DenyReason::NotMember)
        );
    }

    #[tokio::test]
    async fn test_edit_member_cannot_delete_workspace() {
        let store = MemoryStore::new();
        let (workspace, member) =
            workspace_with_member(&store, Some(PermissionLevel::Edit)).await;

        assert_eq!(
            AccessEvaluator::new(&store)
                .require(&workspace, member, Operation::DeleteWorkspace)
                .await,
            Err(EngineError::Unauthorized("owner_only".into()))
        );
    }

    #[tokio::test]
    async fn test_authorize_missing_workspace() {
        let store = MemoryStore::new();
        let err = AccessEvaluator::new(&store)
            .authorize(Uuid::now_v7(), Uuid::now_v7(), Capability::View)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::NotFound("workspace_not_found".into()));
    }
}
