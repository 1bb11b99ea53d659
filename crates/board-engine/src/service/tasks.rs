//! Task operations.

use board_org::{ClientAssignment, Task};
use board_rbac::{EntityKind, Operation};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{modify, require_title, BoardService};
use crate::access::admit;
use crate::error::{reason, EngineError, EngineResult};
use crate::lifecycle::DeletionReport;
use crate::ordering::{OrderedCollectionManager, ReorderEntry, ReorderOutcome};
use crate::store::{load, load_children, run_atomic, LockSet, Scope, Storage, Transaction};

/// Payload for creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    /// Task title; must not be blank.
    pub title: String,
    /// Optional description; a blank one is dropped.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional due date.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A task with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a task. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    /// New title; must not be blank.
    #[serde(default)]
    pub title: Option<String>,
    /// An empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
    /// New due date.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// Clear the deadline. Wins over `deadline`.
    #[serde(default)]
    pub clear_deadline: bool,
}

impl TaskUpdate {
    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = if description.trim().is_empty() {
                None
            } else {
                Some(description)
            };
        }
        if self.clear_deadline {
            task.deadline = None;
        } else if let Some(deadline) = self.deadline {
            task.deadline = Some(deadline);
        }
        task.updated_at = Utc::now();
    }
}

impl<S: Storage> BoardService<S> {
    /// Append a task to an assignment. Requires EDIT.
    pub async fn create_task(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        new_task: NewTask,
    ) -> EngineResult<Task> {
        require_title(&new_task.title)?;
        let locks = LockSet::new().with(Scope::tasks(assignment_id));

        let task = run_atomic(self.store(), locks, |mut tx| async move {
            let result = create_task_in(&mut tx, actor, assignment_id, new_task).await;
            (tx, result)
        })
        .await?;

        tracing::debug!(
            client_assignment_id = %assignment_id,
            task_id = %task.id,
            pos = task.pos,
            "task created"
        );
        Ok(task)
    }

    /// Change a task's title, description or deadline. Requires EDIT.
    pub async fn update_task(
        &self,
        actor: Uuid,
        task_id: Uuid,
        update: TaskUpdate,
    ) -> EngineResult<Task> {
        if let Some(title) = &update.title {
            require_title(title)?;
        }
        self.change_task(actor, task_id, Operation::UpdateTask, move |task| {
            update.apply(task);
            Ok(())
        })
        .await
    }

    /// Mark a task done or open. Requires EDIT.
    pub async fn set_task_completed(
        &self,
        actor: Uuid,
        task_id: Uuid,
        completed: bool,
    ) -> EngineResult<Task> {
        self.change_task(actor, task_id, Operation::SetTaskCompleted, move |task| {
            if completed {
                task.complete();
            } else {
                task.reopen();
            }
            Ok(())
        })
        .await
    }

    /// Delete a task and close the gap it leaves. Requires EDIT.
    pub async fn delete_task(&self, actor: Uuid, task_id: Uuid) -> EngineResult<DeletionReport> {
        self.lifecycle.delete_task(actor, task_id).await
    }

    /// Reorder the tasks of an assignment. Requires EDIT.
    ///
    /// Entries may move to another assignment of the same workspace.
    pub async fn reorder_tasks(
        &self,
        actor: Uuid,
        assignment_id: Uuid,
        entries: Vec<ReorderEntry>,
    ) -> EngineResult<ReorderOutcome> {
        self.reorder_scope(
            actor,
            EntityKind::ClientAssignment,
            assignment_id,
            Operation::ReorderTasks,
            entries,
        )
        .await
    }

    /// Assign a user to a task. Requires EDIT.
    ///
    /// The user must be on the task's client assignment.
    pub async fn assign_task_member(
        &self,
        actor: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<Task> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Task,
            task_id,
            Operation::AssignTaskMember,
        )
        .await?;
        let task: Task = tenant.target_as()?;
        let assignment: ClientAssignment = load(&snapshot, task.client_assignment_id).await?;

        // The assignment's member list is read under its own scope lock.
        let locks = LockSet::new()
            .with(tenant.target.scope())
            .with(Scope::assignments(assignment.pipeline_id));

        run_atomic(self.store(), locks, |mut tx| async move {
            let result = assign_task_member_in(&mut tx, actor, task_id, user_id).await;
            (tx, result)
        })
        .await
    }

    /// Unassign a user from a task. Requires EDIT.
    pub async fn unassign_task_member(
        &self,
        actor: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> EngineResult<Task> {
        self.change_task(actor, task_id, Operation::UnassignTaskMember, move |task| {
            if task.unassign(user_id) {
                Ok(())
            } else {
                Err(EngineError::NotFound(reason::MEMBER_NOT_ASSIGNED.to_string()))
            }
        })
        .await
    }

    /// Users assigned to a task. Requires VIEW.
    pub async fn list_task_members(&self, actor: Uuid, task_id: Uuid) -> EngineResult<Vec<Uuid>> {
        let tenant = self
            .preflight(actor, EntityKind::Task, task_id, Operation::ListTaskMembers)
            .await?;
        let task: Task = tenant.target_as()?;
        Ok(task.assignees)
    }

    /// Users on the task's client assignment who are not yet assigned to the
    /// task, in assignment order. Requires VIEW.
    pub async fn list_unassigned_task_members(
        &self,
        actor: Uuid,
        task_id: Uuid,
    ) -> EngineResult<Vec<Uuid>> {
        let snapshot = self.store.snapshot().await?;
        let tenant = admit(
            &snapshot,
            actor,
            EntityKind::Task,
            task_id,
            Operation::ListTaskMembers,
        )
        .await?;
        let task: Task = tenant.target_as()?;
        let assignment: ClientAssignment = load(&snapshot, task.client_assignment_id).await?;

        Ok(assignment
            .members
            .into_iter()
            .filter(|user_id| !task.assignees.contains(user_id))
            .collect())
    }

    /// Every task of a pipeline, ordered by assignment position and then by
    /// task position. Requires VIEW.
    pub async fn list_tasks(&self, actor: Uuid, pipeline_id: Uuid) -> EngineResult<Vec<Task>> {
        let snapshot = self.store.snapshot().await?;
        admit(
            &snapshot,
            actor,
            EntityKind::Pipeline,
            pipeline_id,
            Operation::ListTasks,
        )
        .await?;

        let assignments: Vec<ClientAssignment> =
            load_children(&snapshot, Scope::assignments(pipeline_id)).await?;

        let mut tasks = Vec::new();
        for assignment in assignments {
            tasks.extend(load_children::<Task, _>(&snapshot, Scope::tasks(assignment.id)).await?);
        }
        Ok(tasks)
    }

    async fn change_task<F>(
        &self,
        actor: Uuid,
        task_id: Uuid,
        operation: Operation,
        change: F,
    ) -> EngineResult<Task>
    where
        F: FnOnce(&mut Task) -> EngineResult<()> + Send,
    {
        let tenant = self
            .preflight(actor, EntityKind::Task, task_id, operation)
            .await?;
        let locks = LockSet::new().with(tenant.target.scope());

        run_atomic(self.store(), locks, |mut tx| async move {
            let result =
                modify(&mut tx, actor, task_id, operation, |t: &mut Task, _| change(t)).await;
            (tx, result)
        })
        .await
    }
}

async fn create_task_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    assignment_id: Uuid,
    new_task: NewTask,
) -> EngineResult<Task> {
    admit(
        &*tx,
        actor,
        EntityKind::ClientAssignment,
        assignment_id,
        Operation::CreateTask,
    )
    .await?;

    let mut task = Task::new(assignment_id, new_task.title);
    task.description = new_task.description.filter(|d| !d.trim().is_empty());
    task.deadline = new_task.deadline;

    OrderedCollectionManager::new(tx).insert(task).await
}

async fn assign_task_member_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    task_id: Uuid,
    user_id: Uuid,
) -> EngineResult<Task> {
    let tenant = admit(
        &*tx,
        actor,
        EntityKind::Task,
        task_id,
        Operation::AssignTaskMember,
    )
    .await?;
    let mut task: Task = tenant.target_as()?;

    let assignment: ClientAssignment = load(&*tx, task.client_assignment_id).await?;
    if !assignment.has_member(user_id) {
        return Err(EngineError::invalid(reason::USER_NOT_ON_ASSIGNMENT));
    }

    if !task.assign(user_id) {
        return Err(EngineError::conflict(reason::MEMBER_ALREADY_ASSIGNED));
    }
    tx.update(task.clone().into()).await?;
    Ok(task)
}
