//! Pipeline operations.

use board_org::{Client, ClientAssignment, Pipeline, Task};
use board_rbac::{EntityKind, Operation};
use std::collections::HashMap;
use uuid::Uuid;

use super::{modify, require_title, BoardService};
use crate::access::admit;
use crate::error::{reason, EngineError, EngineResult};
use crate::lifecycle::DeletionReport;
use crate::ordering::{reorder_locks, OrderedCollectionManager, ReorderEntry, ReorderOutcome};
use crate::store::{load_children, run_atomic, LockSet, Scope, Storage, Transaction};
use crate::views::{AssignmentView, PipelineView};

impl<S: Storage> BoardService<S> {
    /// Append a non-default pipeline to a workspace. Requires EDIT.
    pub async fn create_pipeline(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        title: &str,
    ) -> EngineResult<Pipeline> {
        require_title(title)?;
        let locks = LockSet::new().with(Scope::pipelines(workspace_id));
        let pipeline = Pipeline::new(workspace_id, title, actor);

        let pipeline = run_atomic(self.store(), locks, |mut tx| async move {
            let result = create_pipeline_in(&mut tx, actor, pipeline).await;
            (tx, result)
        })
        .await?;

        tracing::debug!(
            workspace_id = %workspace_id,
            pipeline_id = %pipeline.id,
            pos = pipeline.pos,
            "pipeline created"
        );
        Ok(pipeline)
    }

    /// Rename a pipeline. Requires EDIT.
    pub async fn rename_pipeline(
        &self,
        actor: Uuid,
        pipeline_id: Uuid,
        title: &str,
    ) -> EngineResult<Pipeline> {
        require_title(title)?;
        let tenant = self
            .preflight(
                actor,
                EntityKind::Pipeline,
                pipeline_id,
                Operation::RenamePipeline,
            )
            .await?;

        let locks = LockSet::new().with(tenant.target.scope());
        let title = title.to_string();

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = modify(
                &mut tx,
                actor,
                pipeline_id,
                Operation::RenamePipeline,
                |pipeline: &mut Pipeline, _| {
                    pipeline.rename(title);
                    Ok(())
                },
            )
            .await;
            (tx, result)
        })
        .await
    }

    /// Delete a non-default pipeline with its assignments and tasks.
    ///
    /// Fails `Conflict` (`default_pipeline_deletion_not_allowed`) for the
    /// default pipeline.
    pub async fn delete_pipeline(
        &self,
        actor: Uuid,
        pipeline_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        self.lifecycle.delete_pipeline(actor, pipeline_id).await
    }

    /// Every pipeline of a workspace with its assignments and their tasks,
    /// ordered by position. Requires VIEW.
    pub async fn list_pipelines(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
    ) -> EngineResult<Vec<PipelineView>> {
        let snapshot = self.store.snapshot().await?;
        admit(
            &snapshot,
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::ListPipelines,
        )
        .await?;

        let clients: HashMap<Uuid, Client> =
            load_children::<Client, _>(&snapshot, Scope::clients(workspace_id))
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        let pipelines: Vec<Pipeline> =
            load_children(&snapshot, Scope::pipelines(workspace_id)).await?;
        let mut views = Vec::with_capacity(pipelines.len());

        for pipeline in pipelines {
            let assignments: Vec<ClientAssignment> =
                load_children(&snapshot, Scope::assignments(pipeline.id)).await?;

            let mut client_assignments = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let tasks: Vec<Task> =
                    load_children(&snapshot, Scope::tasks(assignment.id)).await?;
                let client = clients
                    .get(&assignment.client_id)
                    .cloned()
                    .ok_or_else(|| EngineError::not_found(EntityKind::Client))?;
                client_assignments.push(AssignmentView {
                    assignment,
                    client,
                    tasks,
                });
            }

            views.push(PipelineView {
                pipeline,
                client_assignments,
            });
        }

        Ok(views)
    }

    /// Reorder the pipelines of a workspace, optionally reordering or moving
    /// client assignments into each of them. Requires EDIT.
    pub async fn reorder_pipelines(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        entries: Vec<ReorderEntry>,
    ) -> EngineResult<ReorderOutcome> {
        self.reorder_scope(
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::ReorderPipelines,
            entries,
        )
        .await
    }

    /// Plan locks from a snapshot, then reorder the ordered children of
    /// `(parent_kind, parent_id)` under those locks.
    pub(super) async fn reorder_scope(
        &self,
        actor: Uuid,
        parent_kind: EntityKind,
        parent_id: Uuid,
        operation: Operation,
        entries: Vec<ReorderEntry>,
    ) -> EngineResult<ReorderOutcome> {
        let scope = Scope::ordered_children_of(parent_kind, parent_id)
            .ok_or_else(|| EngineError::invalid(reason::UNORDERED_SCOPE))?;

        let snapshot = self.store.snapshot().await?;
        admit(&snapshot, actor, parent_kind, parent_id, operation).await?;
        let locks = reorder_locks(&snapshot, scope, &entries).await?;

        let outcome = run_atomic(self.store(), locks, |mut tx| async move {
            let result = reorder_in(
                &mut tx,
                actor,
                (parent_kind, parent_id),
                operation,
                scope,
                &entries,
            )
            .await;
            (tx, result)
        })
        .await?;

        tracing::debug!(
            scope = %scope,
            actor = %actor,
            touched = outcome.scopes.len(),
            updated = outcome.updated,
            "reorder committed"
        );
        Ok(outcome)
    }
}

async fn create_pipeline_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    pipeline: Pipeline,
) -> EngineResult<Pipeline> {
    admit(
        &*tx,
        actor,
        EntityKind::Workspace,
        pipeline.workspace_id,
        Operation::CreatePipeline,
    )
    .await?;
    OrderedCollectionManager::new(tx).insert(pipeline).await
}

async fn reorder_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    (parent_kind, parent_id): (EntityKind, Uuid),
    operation: Operation,
    scope: Scope,
    entries: &[ReorderEntry],
) -> EngineResult<ReorderOutcome> {
    admit(&*tx, actor, parent_kind, parent_id, operation).await?;
    OrderedCollectionManager::new(tx).reorder(scope, entries).await
}
