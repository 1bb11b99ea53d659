//! Workspace and membership operations.

use board_org::{Membership, PermissionLevel, Pipeline, Workspace};
use board_rbac::{EntityKind, Grant, Operation};
use uuid::Uuid;

use super::{modify, require_title, BoardService};
use crate::access::{admit, AccessEvaluator};
use crate::error::{reason, EngineError, EngineResult};
use crate::lifecycle::DeletionReport;
use crate::store::{load, load_children, run_atomic, LockSet, Reader, Scope, Storage, Transaction};
use crate::views::{MemberView, WorkspaceSummary};

impl<S: Storage> BoardService<S> {
    /// Create a workspace owned by `actor`, with its default pipeline.
    pub async fn create_workspace(
        &self,
        actor: Uuid,
        title: &str,
    ) -> EngineResult<(Workspace, Pipeline)> {
        self.lifecycle
            .create_workspace_with_default_pipeline(title, actor)
            .await
    }

    /// Get a workspace. Requires VIEW.
    pub async fn get_workspace(&self, actor: Uuid, workspace_id: Uuid) -> EngineResult<Workspace> {
        let tenant = self
            .preflight(
                actor,
                EntityKind::Workspace,
                workspace_id,
                Operation::GetWorkspace,
            )
            .await?;
        Ok(tenant.workspace)
    }

    /// Workspaces the actor owns or is a member of.
    pub async fn list_workspaces(&self, actor: Uuid) -> EngineResult<Vec<WorkspaceSummary>> {
        let snapshot = self.store.snapshot().await?;

        let owned: Vec<Workspace> = load_children(&snapshot, Scope::owned_by(actor)).await?;
        let mut summaries: Vec<WorkspaceSummary> = owned
            .into_iter()
            .map(|workspace| WorkspaceSummary {
                workspace,
                access: Grant::Owner,
            })
            .collect();

        for membership in snapshot.find_memberships_of(actor).await? {
            let workspace: Workspace = load(&snapshot, membership.workspace_id).await?;
            summaries.push(WorkspaceSummary {
                workspace,
                access: Grant::Member(membership.permission),
            });
        }

        Ok(summaries)
    }

    /// Rename a workspace. Requires EDIT.
    pub async fn rename_workspace(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        title: &str,
    ) -> EngineResult<Workspace> {
        require_title(title)?;
        let tenant = self
            .preflight(
                actor,
                EntityKind::Workspace,
                workspace_id,
                Operation::RenameWorkspace,
            )
            .await?;

        let locks = LockSet::new().with(tenant.target.scope());
        let title = title.to_string();

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = modify(
                &mut tx,
                actor,
                workspace_id,
                Operation::RenameWorkspace,
                |workspace: &mut Workspace, _| {
                    workspace.rename(title);
                    Ok(())
                },
            )
            .await;
            (tx, result)
        })
        .await
    }

    /// Delete a workspace and everything in it. Owner only.
    pub async fn delete_workspace(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        self.lifecycle.delete_workspace(actor, workspace_id).await
    }

    /// The owner followed by every member. Requires VIEW.
    pub async fn list_members(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
    ) -> EngineResult<Vec<MemberView>> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::ListMembers,
        )
        .await?;

        let memberships: Vec<Membership> =
            load_children(&snapshot, Scope::memberships(workspace_id)).await?;

        let mut members = vec![MemberView::owner(tenant.workspace.owner_id)];
        members.extend(
            memberships
                .into_iter()
                .map(|m| MemberView::member(m.user_id, m.permission)),
        );
        Ok(members)
    }

    /// Give `user_id` a membership row. Requires EDIT.
    ///
    /// Fails `Invalid` for the owner and `Conflict` if the user already has
    /// a row.
    pub async fn add_member(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        user_id: Uuid,
        permission: PermissionLevel,
    ) -> EngineResult<Membership> {
        let locks = LockSet::new().with(Scope::memberships(workspace_id));

        let membership = run_atomic(self.store(), locks, |mut tx| async move {
            let result = add_member_in(&mut tx, actor, workspace_id, user_id, permission).await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            permission = %permission,
            actor = %actor,
            "member added"
        );
        Ok(membership)
    }

    /// Change a member's permission level. Requires EDIT.
    pub async fn update_member_permission(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        user_id: Uuid,
        permission: PermissionLevel,
    ) -> EngineResult<Membership> {
        let locks = LockSet::new().with(Scope::memberships(workspace_id));

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = async {
                let mut membership = member_row(
                    &mut tx,
                    actor,
                    workspace_id,
                    user_id,
                    Operation::UpdateMemberPermission,
                )
                .await?;
                membership.permission = permission;
                tx.update(membership.clone().into()).await?;
                Ok::<_, EngineError>(membership)
            }
            .await;
            (tx, result)
        })
        .await
    }

    /// Remove a member's row. Requires EDIT.
    pub async fn remove_member(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<()> {
        let locks = LockSet::new().with(Scope::memberships(workspace_id));

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = async {
                let membership = member_row(
                    &mut tx,
                    actor,
                    workspace_id,
                    user_id,
                    Operation::RemoveMember,
                )
                .await?;
                tx.delete(EntityKind::Membership, membership.id).await?;
                Ok::<_, EngineError>(())
            }
            .await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            actor = %actor,
            "member removed"
        );
        Ok(())
    }
}

async fn add_member_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    workspace_id: Uuid,
    user_id: Uuid,
    permission: PermissionLevel,
) -> EngineResult<Membership> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Workspace,
        workspace_id,
        Operation::AddMember,
    )
    .await?;
    if tenant.workspace.is_owned_by(user_id) {
        return Err(EngineError::invalid(reason::OWNER_MEMBERSHIP_NOT_ALLOWED));
    }

    let evaluator = AccessEvaluator::new(&*tx);
    if evaluator.membership_of(workspace_id, user_id).await?.is_some() {
        return Err(EngineError::conflict(reason::MEMBER_ALREADY_EXISTS));
    }

    let membership = Membership::new(workspace_id, user_id, permission).with_adder(actor);
    tx.create(membership.clone().into()).await?;
    Ok(membership)
}

/// Admit `operation` on the workspace and load the member's row.
async fn member_row<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    workspace_id: Uuid,
    user_id: Uuid,
    operation: Operation,
) -> EngineResult<Membership> {
    admit(&*tx, actor, EntityKind::Workspace, workspace_id, operation).await?;
    AccessEvaluator::new(&*tx)
        .membership_of(workspace_id, user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(reason::MEMBERSHIP_NOT_FOUND.to_string()))
}
