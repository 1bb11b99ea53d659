//! Client assignment operations.

use board_org::{Client, ClientAssignment, Membership};
use board_rbac::{EntityKind, Operation};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{modify, BoardService};
use crate::access::{admit, AccessEvaluator};
use crate::error::{reason, EngineError, EngineResult};
use crate::lifecycle::DeletionReport;
use crate::ordering::{OrderedCollectionManager, ReorderEntry, ReorderOutcome};
use crate::store::{load, load_children, run_atomic, LockSet, Scope, Storage, Transaction};
use crate::views::MemberView;

impl<S: Storage> BoardService<S> {
    /// Append an assignment of `client_id` to a pipeline. Requires EDIT.
    ///
    /// The client must belong to the pipeline's workspace.
    pub async fn create_client_assignment(
        &self,
        actor: Uuid,
        pipeline_id: Uuid,
        client_id: Uuid,
    ) -> EngineResult<ClientAssignment> {
        let locks = LockSet::new().with(Scope::assignments(pipeline_id));

        let assignment = run_atomic(self.store(), locks, |mut tx| async move {
            let result = create_assignment_in(&mut tx, actor, pipeline_id, client_id).await;
            (tx, result)
        })
        .await?;

        tracing::debug!(
            pipeline_id = %pipeline_id,
            client_assignment_id = %assignment.id,
            pos = assignment.pos,
            "client assignment created"
        );
        Ok(assignment)
    }

    /// Set or clear an assignment's deadline. Requires EDIT.
    pub async fn set_assignment_deadline(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        deadline: Option<DateTime<Utc>>,
    ) -> EngineResult<ClientAssignment> {
        self.change_assignment(
            actor,
            assignment_id,
            Operation::SetAssignmentDeadline,
            move |assignment| {
                assignment.set_deadline(deadline);
                Ok(())
            },
        )
        .await
    }

    /// Delete an assignment with its tasks. Requires EDIT.
    pub async fn delete_client_assignment(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        self.lifecycle.delete_assignment(actor, assignment_id).await
    }

    /// Reorder the assignments of a pipeline. Requires EDIT.
    ///
    /// Entries may move to another pipeline of the same workspace and may
    /// nest task orders.
    pub async fn reorder_client_assignments(
        &self,
        actor: Uuid,
        pipeline_id: Uuid,
        entries: Vec<ReorderEntry>,
    ) -> EngineResult<ReorderOutcome> {
        self.reorder_scope(
            actor,
            EntityKind::Pipeline,
            pipeline_id,
            Operation::ReorderClientAssignments,
            entries,
        )
        .await
    }

    /// Put a workspace user on an assignment. Requires EDIT.
    ///
    /// The user must be the owner or a member of the workspace.
    pub async fn add_assignment_member(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<ClientAssignment> {
        let tenant = self
            .preflight(
                actor,
                EntityKind::ClientAssignment,
                assignment_id,
                Operation::AddAssignmentMember,
            )
            .await?;
        let locks = LockSet::new().with(tenant.target.scope());

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = add_assignment_member_in(&mut tx, actor, assignment_id, user_id).await;
            (tx, result)
        })
        .await
    }

    /// Take a user off an assignment. Requires EDIT.
    pub async fn remove_assignment_member(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<ClientAssignment> {
        self.change_assignment(
            actor,
            assignment_id,
            Operation::RemoveAssignmentMember,
            move |assignment| {
                if assignment.remove_member(user_id) {
                    Ok(())
                } else {
                    Err(EngineError::NotFound(reason::MEMBER_NOT_ASSIGNED.to_string()))
                }
            },
        )
        .await
    }

    /// Users on an assignment. Requires VIEW.
    pub async fn list_assignment_members(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
    ) -> EngineResult<Vec<Uuid>> {
        let tenant = self
            .preflight(
                actor,
                EntityKind::ClientAssignment,
                assignment_id,
                Operation::ListAssignmentMembers,
            )
            .await?;
        let assignment: ClientAssignment = tenant.target_as()?;
        Ok(assignment.members)
    }

    /// Workspace users not yet on an assignment. Requires VIEW.
    pub async fn list_unassigned_members(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
    ) -> EngineResult<Vec<MemberView>> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::ClientAssignment,
            assignment_id,
            Operation::ListAssignmentMembers,
        )
        .await?;
        let assignment: ClientAssignment = tenant.target_as()?;

        let memberships: Vec<Membership> =
            load_children(&snapshot, Scope::memberships(tenant.workspace.id)).await?;

        let candidates = std::iter::once(MemberView::owner(tenant.workspace.owner_id)).chain(
            memberships
                .into_iter()
                .map(|m| MemberView::member(m.user_id, m.permission)),
        );
        Ok(candidates
            .filter(|m| !assignment.has_member(m.user_id))
            .collect())
    }

    /// Lock the assignment's scope and apply `change` to it.
    async fn change_assignment<F>(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        operation: Operation,
        change: F,
    ) -> EngineResult<ClientAssignment>
    where
        F: FnOnce(&mut ClientAssignment) -> EngineResult<()> + Send,
    {
        let tenant = self
            .preflight(actor, EntityKind::ClientAssignment, assignment_id, operation)
            .await?;
        let locks = LockSet::new().with(tenant.target.scope());

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = modify(
                &mut tx,
                actor,
                assignment_id,
                operation,
                |a: &mut ClientAssignment, _| change(a),
            )
            .await;
            (tx, result)
        })
        .await
    }
}

async fn create_assignment_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    pipeline_id: Uuid,
    client_id: Uuid,
) -> EngineResult<ClientAssignment> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Pipeline,
        pipeline_id,
        Operation::CreateClientAssignment,
    )
    .await?;

    let client: Client = load(&*tx, client_id).await?;
    if client.workspace_id != tenant.workspace.id {
        return Err(EngineError::invalid(reason::CLIENT_NOT_IN_WORKSPACE));
    }

    OrderedCollectionManager::new(tx)
        .insert(ClientAssignment::new(pipeline_id, client_id))
        .await
}

async fn add_assignment_member_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    assignment_id: Uuid,
    user_id: Uuid,
) -> EngineResult<ClientAssignment> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::ClientAssignment,
        assignment_id,
        Operation::AddAssignmentMember,
    )
    .await?;

    if !AccessEvaluator::new(&*tx)
        .is_member(&tenant.workspace, user_id)
        .await?
    {
        return Err(EngineError::invalid(reason::USER_NOT_IN_WORKSPACE));
    }

    let mut assignment: ClientAssignment = tenant.target_as()?;
    if !assignment.add_member(user_id) {
        return Err(EngineError::conflict(reason::MEMBER_ALREADY_ASSIGNED));
    }
    tx.update(assignment.clone().into()).await?;
    Ok(assignment)
}
