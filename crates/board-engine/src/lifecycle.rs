//! Multi-entity lifecycle operations.
//!
//! Workspace creation with its default pipeline and every cascading delete
//! run as one unit of work: either the whole tree changes or nothing does.
//!
//! Locks are planned from a snapshot, then the unit of work re-resolves and
//! re-authorizes under those locks. A row that appeared in between lands in
//! a scope the transaction does not hold, so the write fails `Conflict`
//! instead of leaving an orphan behind.

use board_org::{Client, ClientAssignment, Membership, Pipeline, Task, Workspace};
use board_rbac::{EntityKind, Operation};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::access::admit;
use crate::config::EngineConfig;
use crate::error::{reason, EngineError, EngineResult};
use crate::ordering::OrderedCollectionManager;
use crate::store::{load_children, run_atomic, LockSet, Reader, Scope, Storage, Transaction};

/// Rows removed by a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// Workspaces removed
    pub workspaces: usize,
    /// Pipelines removed, the default one included
    pub pipelines: usize,
    /// Client assignments removed
    pub client_assignments: usize,
    /// Tasks removed
    pub tasks: usize,
    /// Clients removed
    pub clients: usize,
    /// Membership rows removed
    pub memberships: usize,
}

/// Orchestrates operations spanning several records.
pub struct EntityLifecycleCoordinator<S: Storage> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Storage> EntityLifecycleCoordinator<S> {
    /// Create a coordinator.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create a workspace owned by `owner_id` together with its default
    /// pipeline at position 0.
    ///
    /// If the pipeline cannot be created the workspace is not created either.
    pub async fn create_workspace_with_default_pipeline(
        &self,
        title: &str,
        owner_id: Uuid,
    ) -> EngineResult<(Workspace, Pipeline)> {
        if title.trim().is_empty() {
            return Err(EngineError::invalid(reason::EMPTY_TITLE));
        }

        let workspace = Workspace::new(title, owner_id);
        let pipeline = Pipeline::default_for(
            workspace.id,
            self.config.default_pipeline_title.as_str(),
            owner_id,
        );
        let locks = LockSet::new()
            .with(Scope::owned_by(owner_id))
            .with(Scope::pipelines(workspace.id));

        let (workspace, pipeline) = run_atomic(&*self.store, locks, |mut tx| async move {
            let result = create_workspace_in(&mut tx, workspace, pipeline).await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %workspace.id,
            owner = %owner_id,
            default_pipeline_id = %pipeline.id,
            "workspace created"
        );
        Ok((workspace, pipeline))
    }

    /// Delete a non-default pipeline with its assignments and their tasks,
    /// then close the gap it leaves.
    pub async fn delete_pipeline(
        &self,
        actor: Uuid,
        pipeline_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Pipeline,
            pipeline_id,
            Operation::DeletePipeline,
        )
        .await?;
        let pipeline: Pipeline = tenant.target_as()?;
        if pipeline.is_default {
            return Err(EngineError::conflict(
                reason::DEFAULT_PIPELINE_DELETION_NOT_ALLOWED,
            ));
        }

        let mut locks = LockSet::new().with(Scope::pipelines(pipeline.workspace_id));
        add_pipeline_tree_locks(&snapshot, pipeline.id, &mut locks).await?;

        let report = run_atomic(&*self.store, locks, |mut tx| async move {
            let result = delete_pipeline_in(&mut tx, actor, pipeline_id).await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %pipeline.workspace_id,
            pipeline_id = %pipeline_id,
            actor = %actor,
            client_assignments = report.client_assignments,
            tasks = report.tasks,
            "pipeline deleted"
        );
        Ok(report)
    }

    /// Delete a client assignment with its tasks, then close the gap.
    pub async fn delete_assignment(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::ClientAssignment,
            assignment_id,
            Operation::DeleteClientAssignment,
        )
        .await?;
        let assignment: ClientAssignment = tenant.target_as()?;

        let locks = LockSet::new()
            .with(Scope::assignments(assignment.pipeline_id))
            .with(Scope::tasks(assignment.id));

        let report = run_atomic(&*self.store, locks, |mut tx| async move {
            let result = delete_assignment_in(&mut tx, actor, assignment_id).await;
            (tx, result)
        })
        .await?;

        tracing::debug!(
            assignment_id = %assignment_id,
            tasks = report.tasks,
            "client assignment deleted"
        );
        Ok(report)
    }

    /// Delete a task, then close the gap.
    pub async fn delete_task(&self, actor: Uuid, task_id: Uuid) -> EngineResult<DeletionReport> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Task,
            task_id,
            Operation::DeleteTask,
        )
        .await?;
        let task: Task = tenant.target_as()?;

        let locks = LockSet::new().with(Scope::tasks(task.client_assignment_id));

        run_atomic(&*self.store, locks, |mut tx| async move {
            let result = delete_task_in(&mut tx, actor, task_id).await;
            (tx, result)
        })
        .await
    }

    /// Delete a client together with every assignment that references it
    /// and their tasks, then compact each affected pipeline.
    pub async fn delete_client(&self, actor: Uuid, client_id: Uuid) -> EngineResult<DeletionReport> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Client,
            client_id,
            Operation::DeleteClient,
        )
        .await?;
        let workspace_id = tenant.workspace.id;

        let mut locks = LockSet::new().with(Scope::clients(workspace_id));
        for assignment in assignments_of_client(&snapshot, workspace_id, client_id).await? {
            locks.insert(Scope::assignments(assignment.pipeline_id));
            locks.insert(Scope::tasks(assignment.id));
        }

        let report = run_atomic(&*self.store, locks, |mut tx| async move {
            let result = delete_client_in(&mut tx, actor, client_id).await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %workspace_id,
            client_id = %client_id,
            actor = %actor,
            client_assignments = report.client_assignments,
            tasks = report.tasks,
            "client deleted"
        );
        Ok(report)
    }

    /// Delete a workspace and everything in it, including the default
    /// pipeline. Only the owner may do this.
    pub async fn delete_workspace(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
    ) -> EngineResult<DeletionReport> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::DeleteWorkspace,
        )
        .await?;

        let mut locks = LockSet::new()
            .with(Scope::owned_by(tenant.workspace.owner_id))
            .with(Scope::pipelines(workspace_id))
            .with(Scope::clients(workspace_id))
            .with(Scope::memberships(workspace_id));
        for pipeline in snapshot.find_children(Scope::pipelines(workspace_id)).await? {
            add_pipeline_tree_locks(&snapshot, pipeline.id(), &mut locks).await?;
        }

        let report = run_atomic(&*self.store, locks, |mut tx| async move {
            let result = delete_workspace_in(&mut tx, actor, workspace_id).await;
            (tx, result)
        })
        .await?;

        tracing::info!(
            workspace_id = %workspace_id,
            actor = %actor,
            pipelines = report.pipelines,
            client_assignments = report.client_assignments,
            tasks = report.tasks,
            clients = report.clients,
            "workspace deleted"
        );
        Ok(report)
    }
}

async fn create_workspace_in<T: Transaction>(
    tx: &mut T,
    workspace: Workspace,
    pipeline: Pipeline,
) -> EngineResult<(Workspace, Pipeline)> {
    tx.create(workspace.clone().into()).await?;
    let pipeline = OrderedCollectionManager::new(tx).insert(pipeline).await?;
    Ok((workspace, pipeline))
}

async fn delete_pipeline_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    pipeline_id: Uuid,
) -> EngineResult<DeletionReport> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Pipeline,
        pipeline_id,
        Operation::DeletePipeline,
    )
    .await?;
    let pipeline: Pipeline = tenant.target_as()?;
    if pipeline.is_default {
        return Err(EngineError::conflict(
            reason::DEFAULT_PIPELINE_DELETION_NOT_ALLOWED,
        ));
    }

    let mut report = DeletionReport::default();
    delete_pipeline_tree(tx, pipeline.id, &mut report).await?;
    OrderedCollectionManager::new(tx)
        .compact(Scope::pipelines(pipeline.workspace_id))
        .await?;
    Ok(report)
}

async fn delete_assignment_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    assignment_id: Uuid,
) -> EngineResult<DeletionReport> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::ClientAssignment,
        assignment_id,
        Operation::DeleteClientAssignment,
    )
    .await?;
    let assignment: ClientAssignment = tenant.target_as()?;

    let mut report = DeletionReport::default();
    delete_assignment_tree(tx, assignment.id, &mut report).await?;
    OrderedCollectionManager::new(tx)
        .compact(Scope::assignments(assignment.pipeline_id))
        .await?;
    Ok(report)
}

async fn delete_task_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    task_id: Uuid,
) -> EngineResult<DeletionReport> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Task,
        task_id,
        Operation::DeleteTask,
    )
    .await?;
    let task: Task = tenant.target_as()?;

    tx.delete(EntityKind::Task, task.id).await?;
    OrderedCollectionManager::new(tx)
        .compact(Scope::tasks(task.client_assignment_id))
        .await?;

    Ok(DeletionReport {
        tasks: 1,
        ..Default::default()
    })
}

async fn delete_client_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    client_id: Uuid,
) -> EngineResult<DeletionReport> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Client,
        client_id,
        Operation::DeleteClient,
    )
    .await?;
    let client: Client = tenant.target_as()?;

    let mut report = DeletionReport::default();
    let mut affected = BTreeSet::new();
    for assignment in assignments_of_client(&*tx, client.workspace_id, client.id).await? {
        affected.insert(assignment.pipeline_id);
        delete_assignment_tree(tx, assignment.id, &mut report).await?;
    }

    tx.delete(EntityKind::Client, client.id).await?;
    report.clients += 1;

    let mut manager = OrderedCollectionManager::new(tx);
    for pipeline_id in affected {
        manager.compact(Scope::assignments(pipeline_id)).await?;
    }
    Ok(report)
}

async fn delete_workspace_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    workspace_id: Uuid,
) -> EngineResult<DeletionReport> {
    admit(
        &*tx,
        actor,
        EntityKind::Workspace,
        workspace_id,
        Operation::DeleteWorkspace,
    )
    .await?;

    let mut report = DeletionReport::default();
    for pipeline in tx.find_children(Scope::pipelines(workspace_id)).await? {
        delete_pipeline_tree(tx, pipeline.id(), &mut report).await?;
    }

    let clients: Vec<Client> = load_children(&*tx, Scope::clients(workspace_id)).await?;
    for client in clients {
        tx.delete(EntityKind::Client, client.id).await?;
        report.clients += 1;
    }

    let memberships: Vec<Membership> =
        load_children(&*tx, Scope::memberships(workspace_id)).await?;
    for membership in memberships {
        tx.delete(EntityKind::Membership, membership.id).await?;
        report.memberships += 1;
    }

    tx.delete(EntityKind::Workspace, workspace_id).await?;
    report.workspaces += 1;
    Ok(report)
}

/// Delete a pipeline, its assignments and their tasks.
async fn delete_pipeline_tree<T: Transaction>(
    tx: &mut T,
    pipeline_id: Uuid,
    report: &mut DeletionReport,
) -> EngineResult<()> {
    for assignment in tx.find_children(Scope::assignments(pipeline_id)).await? {
        delete_assignment_tree(tx, assignment.id(), report).await?;
    }
    tx.delete(EntityKind::Pipeline, pipeline_id).await?;
    report.pipelines += 1;
    Ok(())
}

/// Delete an assignment and its tasks.
async fn delete_assignment_tree<T: Transaction>(
    tx: &mut T,
    assignment_id: Uuid,
    report: &mut DeletionReport,
) -> EngineResult<()> {
    for task in tx.find_children(Scope::tasks(assignment_id)).await? {
        tx.delete(EntityKind::Task, task.id()).await?;
        report.tasks += 1;
    }
    tx.delete(EntityKind::ClientAssignment, assignment_id).await?;
    report.client_assignments += 1;
    Ok(())
}

async fn add_pipeline_tree_locks<R: Reader + ?Sized>(
    reader: &R,
    pipeline_id: Uuid,
    locks: &mut LockSet,
) -> EngineResult<()> {
    locks.insert(Scope::assignments(pipeline_id));
    for assignment in reader.find_children(Scope::assignments(pipeline_id)).await? {
        locks.insert(Scope::tasks(assignment.id()));
    }
    Ok(())
}

/// Every assignment in a workspace that references `client_id`.
pub(crate) async fn assignments_of_client<R: Reader + ?Sized>(
    reader: &R,
    workspace_id: Uuid,
    client_id: Uuid,
) -> EngineResult<Vec<ClientAssignment>> {
    let mut found = Vec::new();
    for pipeline in reader.find_children(Scope::pipelines(workspace_id)).await? {
        let assignments: Vec<ClientAssignment> =
            load_children(reader, Scope::assignments(pipeline.id())).await?;
        found.extend(assignments.into_iter().filter(|a| a.client_id == client_id));
    }
    Ok(found)
}
