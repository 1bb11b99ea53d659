//! Workspace bootstrap and cascading deletes.
//!
//! Rollback behavior is checked with a store wrapper that fails writes of
//! one record kind, sharing state with a plain [`MemoryStore`].

mod common;

use async_trait::async_trait;
use board_engine::store::{
    LockSet, MemorySnapshot, MemoryTransaction, Reader, Record, Scope, Storage, StorageError,
    StorageResult, Transaction,
};
use board_engine::{reason, BoardService, EngineConfig, EngineError, MemoryStore, NewTask};
use board_org::Membership;
use board_rbac::EntityKind;
use common::{assert_dense, TestFixture};
use std::sync::Arc;
use uuid::Uuid;

/// Store that refuses creates or deletes of one kind.
struct FaultyStore {
    inner: MemoryStore,
    fail_create: Option<EntityKind>,
    fail_delete: Option<EntityKind>,
}

struct FaultyTransaction {
    inner: MemoryTransaction,
    fail_create: Option<EntityKind>,
    fail_delete: Option<EntityKind>,
}

#[async_trait]
impl Reader for FaultyStore {
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>> {
        self.inner.find(kind, id).await
    }

    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        self.inner.find_children(scope).await
    }

    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>> {
        self.inner.find_memberships_of(user_id).await
    }
}

#[async_trait]
impl Storage for FaultyStore {
    type Tx = FaultyTransaction;
    type Snapshot = MemorySnapshot;

    async fn begin(&self, locks: LockSet) -> StorageResult<FaultyTransaction> {
        Ok(FaultyTransaction {
            inner: self.inner.begin(locks).await?,
            fail_create: self.fail_create,
            fail_delete: self.fail_delete,
        })
    }

    async fn snapshot(&self) -> StorageResult<MemorySnapshot> {
        self.inner.snapshot().await
    }
}

#[async_trait]
impl Reader for FaultyTransaction {
    async fn find(&self, kind: EntityKind, id: Uuid) -> StorageResult<Option<Record>> {
        self.inner.find(kind, id).await
    }

    async fn find_children(&self, scope: Scope) -> StorageResult<Vec<Record>> {
        self.inner.find_children(scope).await
    }

    async fn find_memberships_of(&self, user_id: Uuid) -> StorageResult<Vec<Membership>> {
        self.inner.find_memberships_of(user_id).await
    }
}

#[async_trait]
impl Transaction for FaultyTransaction {
    fn holds(&self, scope: &Scope) -> bool {
        self.inner.holds(scope)
    }

    async fn create(&mut self, record: Record) -> StorageResult<()> {
        if self.fail_create == Some(record.kind()) {
            return Err(StorageError::Backend("injected create failure".to_string()));
        }
        self.inner.create(record).await
    }

    async fn update(&mut self, record: Record) -> StorageResult<()> {
        self.inner.update(record).await
    }

    async fn delete(&mut self, kind: EntityKind, id: Uuid) -> StorageResult<()> {
        if self.fail_delete == Some(kind) {
            return Err(StorageError::Backend("injected delete failure".to_string()));
        }
        self.inner.delete(kind, id).await
    }

    async fn commit(self) -> StorageResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.inner.rollback().await
    }
}

fn faulty_service(
    inner: &MemoryStore,
    fail_create: Option<EntityKind>,
    fail_delete: Option<EntityKind>,
) -> BoardService<FaultyStore> {
    let store = FaultyStore {
        inner: inner.clone(),
        fail_create,
        fail_delete,
    };
    BoardService::new(Arc::new(store), EngineConfig::default())
}

#[tokio::test]
async fn test_workspace_starts_with_default_pipeline() {
    let fx = TestFixture::new().await;

    assert!(fx.inbox.is_default);
    assert_eq!(fx.inbox.pos, 0);
    assert_eq!(fx.inbox.workspace_id, fx.workspace.id);
    assert_eq!(fx.inbox.title, EngineConfig::default().default_pipeline_title);
    assert_eq!(fx.workspace.owner_id, fx.owner);
}

#[tokio::test]
async fn test_default_pipeline_title_is_configurable() {
    let service = BoardService::in_memory(
        EngineConfig::default().with_default_pipeline_title("Inbox"),
    );
    let (_, inbox) = service
        .create_workspace(Uuid::now_v7(), "Acme")
        .await
        .unwrap();
    assert_eq!(inbox.title, "Inbox");
}

#[tokio::test]
async fn test_empty_workspace_title_rejected() {
    let fx = TestFixture::new().await;
    let err = fx
        .service
        .create_workspace(fx.owner, "   ")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::EMPTY_TITLE));
    assert_eq!(fx.store().count(EntityKind::Workspace).await, 1);
}

#[tokio::test]
async fn test_workspace_creation_rolls_back_without_pipeline() {
    let inner = MemoryStore::new();
    let service = faulty_service(&inner, Some(EntityKind::Pipeline), None);

    let err = service
        .create_workspace(Uuid::now_v7(), "Acme")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::conflict(reason::STORAGE_FAILURE));

    assert_eq!(inner.count(EntityKind::Workspace).await, 0);
    assert_eq!(inner.count(EntityKind::Pipeline).await, 0);
    assert_eq!(inner.stats().await.rollbacks, 1);
}

#[tokio::test]
async fn test_default_pipeline_cannot_be_deleted() {
    let fx = TestFixture::new().await;
    let err = fx
        .service
        .delete_pipeline(fx.owner, fx.inbox.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::conflict(reason::DEFAULT_PIPELINE_DELETION_NOT_ALLOWED)
    );
    assert_eq!(err.status_code(), 409);
    assert_eq!(fx.pipeline_order().await, vec![fx.inbox.id]);
}

#[tokio::test]
async fn test_delete_pipeline_cascades_and_compacts() {
    let fx = TestFixture::new().await;
    let leads = fx.pipeline("Leads").await;
    let won = fx.pipeline("Won").await;
    let a = fx.card(&leads, "Globex").await;
    let b = fx.card(&leads, "Initech").await;
    fx.task(&a, "Call").await;
    fx.task(&a, "Email").await;
    fx.task(&b, "Invoice").await;

    let report = fx.service.delete_pipeline(fx.owner, leads.id).await.unwrap();
    assert_eq!(report.pipelines, 1);
    assert_eq!(report.client_assignments, 2);
    assert_eq!(report.tasks, 3);
    assert_eq!(report.clients, 0);

    assert_eq!(fx.pipeline_order().await, vec![fx.inbox.id, won.id]);
    let views = fx
        .service
        .list_pipelines(fx.owner, fx.workspace.id)
        .await
        .unwrap();
    assert_dense(views.iter().map(|v| v.pipeline.pos));

    assert_eq!(fx.store().count(EntityKind::ClientAssignment).await, 0);
    assert_eq!(fx.store().count(EntityKind::Task).await, 0);
    // Clients outlive their placements.
    assert_eq!(fx.store().count(EntityKind::Client).await, 2);
}

#[tokio::test]
async fn test_failed_cascade_leaves_tree_intact() {
    let fx = TestFixture::new().await;
    let leads = fx.pipeline("Leads").await;
    let a = fx.card(&leads, "Globex").await;
    fx.task(&a, "Call").await;

    let faulty = faulty_service(fx.store(), None, Some(EntityKind::Task));
    let err = faulty.delete_pipeline(fx.owner, leads.id).await.unwrap_err();
    assert_eq!(err, EngineError::conflict(reason::STORAGE_FAILURE));

    assert_eq!(fx.pipeline_order().await, vec![fx.inbox.id, leads.id]);
    assert_eq!(fx.card_order(leads.id).await, vec![(a.id, 0)]);
    assert_eq!(fx.store().count(EntityKind::Task).await, 1);
}

#[tokio::test]
async fn test_delete_task_compacts() {
    let fx = TestFixture::new().await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let t0 = fx.task(&card, "Call").await;
    let t1 = fx.task(&card, "Email").await;
    let t2 = fx.task(&card, "Invoice").await;

    let report = fx.service.delete_task(fx.owner, t0.id).await.unwrap();
    assert_eq!(report.tasks, 1);

    let tasks = fx.service.list_tasks(fx.owner, fx.inbox.id).await.unwrap();
    assert_eq!(
        tasks.iter().map(|t| (t.id, t.pos)).collect::<Vec<_>>(),
        vec![(t1.id, 0), (t2.id, 1)]
    );
}

#[tokio::test]
async fn test_delete_client_removes_every_placement() {
    let fx = TestFixture::new().await;
    let leads = fx.pipeline("Leads").await;
    let globex = fx.client("Globex").await;
    let other = fx.card(&fx.inbox, "Initech").await;

    let first = fx
        .service
        .create_client_assignment(fx.owner, fx.inbox.id, globex.id)
        .await
        .unwrap();
    let second = fx
        .service
        .create_client_assignment(fx.owner, leads.id, globex.id)
        .await
        .unwrap();
    fx.task(&first, "Call").await;
    fx.task(&second, "Email").await;

    let listing = fx
        .service
        .list_clients(fx.owner, fx.workspace.id)
        .await
        .unwrap();
    let placed = listing
        .iter()
        .find(|c| c.client.id == globex.id)
        .unwrap();
    assert_eq!(placed.placements.len(), 2);

    let report = fx.service.delete_client(fx.owner, globex.id).await.unwrap();
    assert_eq!(report.clients, 1);
    assert_eq!(report.client_assignments, 2);
    assert_eq!(report.tasks, 2);

    assert_eq!(fx.card_order(fx.inbox.id).await, vec![(other.id, 0)]);
    assert!(fx.card_order(leads.id).await.is_empty());
    assert_eq!(fx.store().count(EntityKind::Task).await, 0);
}

#[tokio::test]
async fn test_delete_workspace_leaves_no_orphans() {
    let fx = TestFixture::new().await;
    fx.member(board_org::PermissionLevel::View).await;
    let leads = fx.pipeline("Leads").await;
    let card = fx.card(&leads, "Globex").await;
    fx.card(&fx.inbox, "Initech").await;
    fx.task(&card, "Call").await;

    // A second workspace must survive.
    let (survivor, _) = fx
        .service
        .create_workspace(fx.owner, "Other")
        .await
        .unwrap();

    let report = fx
        .service
        .delete_workspace(fx.owner, fx.workspace.id)
        .await
        .unwrap();
    assert_eq!(report.workspaces, 1);
    assert_eq!(report.pipelines, 2);
    assert_eq!(report.client_assignments, 2);
    assert_eq!(report.tasks, 1);
    assert_eq!(report.clients, 2);
    assert_eq!(report.memberships, 1);

    let store = fx.store();
    assert_eq!(store.count(EntityKind::Workspace).await, 1);
    assert_eq!(store.count(EntityKind::Pipeline).await, 1);
    assert_eq!(store.count(EntityKind::ClientAssignment).await, 0);
    assert_eq!(store.count(EntityKind::Task).await, 0);
    assert_eq!(store.count(EntityKind::Client).await, 0);
    assert_eq!(store.count(EntityKind::Membership).await, 0);

    assert!(fx
        .service
        .get_workspace(fx.owner, survivor.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_task_update_and_completion() {
    let fx = TestFixture::new().await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let task = fx
        .service
        .create_task(
            fx.owner,
            card.id,
            NewTask {
                title: "Call".to_string(),
                description: Some("Intro call".to_string()),
                deadline: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.description.as_deref(), Some("Intro call"));

    let deadline = chrono::Utc::now();
    let task = fx
        .service
        .update_task(
            fx.owner,
            task.id,
            board_engine::TaskUpdate {
                title: Some("Follow-up call".to_string()),
                description: Some(String::new()),
                deadline: Some(deadline),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.title, "Follow-up call");
    assert_eq!(task.description, None);
    assert_eq!(task.deadline, Some(deadline));

    let err = fx
        .service
        .update_task(
            fx.owner,
            task.id,
            board_engine::TaskUpdate {
                title: Some(" ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::EMPTY_TITLE));

    let task = fx
        .service
        .set_task_completed(fx.owner, task.id, true)
        .await
        .unwrap();
    assert!(task.completed);
    let task = fx
        .service
        .set_task_completed(fx.owner, task.id, false)
        .await
        .unwrap();
    assert!(!task.completed);
}

#[tokio::test]
async fn test_unassigned_clients_search() {
    let fx = TestFixture::new().await;
    fx.card(&fx.inbox, "Placed Corp").await;
    let globex = fx
        .service
        .create_client(
            fx.owner,
            fx.workspace.id,
            board_engine::NewClient {
                name: "Globex".to_string(),
                email: Some("hank@globex.example".to_string()),
                phone: None,
            },
        )
        .await
        .unwrap();
    let initech = fx.client("Initech").await;

    let all = fx
        .service
        .list_unassigned_clients(fx.owner, fx.workspace.id, None)
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![globex.id, initech.id]
    );

    let hits = fx
        .service
        .list_unassigned_clients(fx.owner, fx.workspace.id, Some("GLOBEX.EX"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, globex.id);

    let err = fx
        .service
        .create_client(fx.owner, fx.workspace.id, board_engine::NewClient::named(""))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::EMPTY_NAME));
}

#[tokio::test]
async fn test_set_assignment_deadline() {
    let fx = TestFixture::new().await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let deadline = chrono::Utc::now();

    let card = fx
        .service
        .set_assignment_deadline(fx.owner, card.id, Some(deadline))
        .await
        .unwrap();
    assert_eq!(card.deadline, Some(deadline));

    let card = fx
        .service
        .set_assignment_deadline(fx.owner, card.id, None)
        .await
        .unwrap();
    assert_eq!(card.deadline, None);
}
