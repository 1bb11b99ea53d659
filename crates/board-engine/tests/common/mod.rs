//! Shared fixture for board engine integration tests.

#![allow(dead_code)]

use board_engine::{BoardService, EngineConfig, MemoryStore, NewClient, NewTask};
use board_org::{Client, ClientAssignment, PermissionLevel, Pipeline, Task, Workspace};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A workspace with its default pipeline, owned by `owner`.
pub struct TestFixture {
    /// Service over an in-memory store.
    pub service: Arc<BoardService<MemoryStore>>,
    /// Workspace owner.
    pub owner: Uuid,
    /// The workspace under test.
    pub workspace: Workspace,
    /// Its default pipeline.
    pub inbox: Pipeline,
}

impl TestFixture {
    /// Create a fresh store and a workspace in it.
    pub async fn new() -> Self {
        let config = EngineConfig::default().with_lock_timeout(Duration::from_secs(2));
        let service = Arc::new(BoardService::in_memory(config));
        let owner = Uuid::now_v7();
        let (workspace, inbox) = service
            .create_workspace(owner, "Acme")
            .await
            .expect("workspace");

        Self {
            service,
            owner,
            workspace,
            inbox,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &MemoryStore {
        self.service.store()
    }

    /// Add a member at `level` and return their id.
    pub async fn member(&self, level: PermissionLevel) -> Uuid {
        let user = Uuid::now_v7();
        self.service
            .add_member(self.owner, self.workspace.id, user, level)
            .await
            .expect("add member");
        user
    }

    pub async fn pipeline(&self, title: &str) -> Pipeline {
        self.service
            .create_pipeline(self.owner, self.workspace.id, title)
            .await
            .expect("pipeline")
    }

    pub async fn client(&self, name: &str) -> Client {
        self.service
            .create_client(self.owner, self.workspace.id, NewClient::named(name))
            .await
            .expect("client")
    }

    /// Create a client named `name` and place it in `pipeline`.
    pub async fn card(&self, pipeline: &Pipeline, name: &str) -> ClientAssignment {
        let client = self.client(name).await;
        self.service
            .create_client_assignment(self.owner, pipeline.id, client.id)
            .await
            .expect("assignment")
    }

    pub async fn task(&self, assignment: &ClientAssignment, title: &str) -> Task {
        self.service
            .create_task(self.owner, assignment.id, NewTask::titled(title))
            .await
            .expect("task")
    }

    /// Ids of the pipelines of the workspace, in board order.
    pub async fn pipeline_order(&self) -> Vec<Uuid> {
        self.service
            .list_pipelines(self.owner, self.workspace.id)
            .await
            .expect("list pipelines")
            .into_iter()
            .map(|view| view.pipeline.id)
            .collect()
    }

    /// `(id, pos)` of each assignment in `pipeline_id`, in board order.
    pub async fn card_order(&self, pipeline_id: Uuid) -> Vec<(Uuid, u32)> {
        self.service
            .list_pipelines(self.owner, self.workspace.id)
            .await
            .expect("list pipelines")
            .into_iter()
            .find(|view| view.pipeline.id == pipeline_id)
            .map(|view| {
                view.client_assignments
                    .into_iter()
                    .map(|a| (a.assignment.id, a.assignment.pos))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Positions must be exactly `0..n-1`.
pub fn assert_dense(positions: impl IntoIterator<Item = u32>) {
    let positions: Vec<u32> = positions.into_iter().collect();
    let expected: Vec<u32> = (0..positions.len() as u32).collect();
    assert_eq!(positions, expected, "positions are not dense");
}
