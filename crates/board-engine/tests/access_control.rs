//! Tenant resolution and access evaluation through the service surface.

mod common;

use board_engine::{reason, EngineError, NewClient, NewTask, ReorderEntry};
use board_org::PermissionLevel;
use board_rbac::Grant;
use common::TestFixture;
use uuid::Uuid;

fn unauthorized(reason: &str) -> EngineError {
    EngineError::Unauthorized(reason.to_string())
}

#[tokio::test]
async fn test_stranger_is_denied_everywhere() {
    let fx = TestFixture::new().await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let task = fx.task(&card, "Call").await;
    let stranger = Uuid::now_v7();

    let err = fx
        .service
        .get_workspace(stranger, fx.workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));

    let err = fx
        .service
        .list_pipelines(stranger, fx.workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));

    // Leaf records resolve up to the same workspace.
    let err = fx
        .service
        .set_task_completed(stranger, task.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));
    assert_eq!(err.status_code(), 403);

    let err = fx
        .service
        .list_assignment_members(stranger, card.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let fx = TestFixture::new().await;

    let err = fx
        .service
        .get_workspace(fx.owner, Uuid::now_v7())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("workspace_not_found".to_string()));

    let err = fx
        .service
        .update_task(fx.owner, Uuid::now_v7(), Default::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("task_not_found".to_string()));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_view_member_reads_but_cannot_edit() {
    let fx = TestFixture::new().await;
    let viewer = fx.member(PermissionLevel::View).await;
    let card = fx.card(&fx.inbox, "Globex").await;

    let views = fx
        .service
        .list_pipelines(viewer, fx.workspace.id)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].client_assignments.len(), 1);

    let err = fx
        .service
        .create_pipeline(viewer, fx.workspace.id, "Leads")
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("insufficient_permission"));

    let err = fx
        .service
        .create_task(viewer, card.id, NewTask::titled("Call"))
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("insufficient_permission"));

    let err = fx
        .service
        .reorder_pipelines(viewer, fx.workspace.id, vec![ReorderEntry::new(fx.inbox.id)])
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("insufficient_permission"));
}

#[tokio::test]
async fn test_edit_member_can_modify() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;

    let pipeline = fx
        .service
        .create_pipeline(editor, fx.workspace.id, "Leads")
        .await
        .unwrap();
    assert_eq!(pipeline.created_by, editor);

    let client = fx
        .service
        .create_client(editor, fx.workspace.id, NewClient::named("Globex"))
        .await
        .unwrap();
    let card = fx
        .service
        .create_client_assignment(editor, pipeline.id, client.id)
        .await
        .unwrap();
    let task = fx
        .service
        .create_task(editor, card.id, NewTask::titled("Call"))
        .await
        .unwrap();

    let done = fx
        .service
        .set_task_completed(editor, task.id, true)
        .await
        .unwrap();
    assert!(done.completed);
}

#[tokio::test]
async fn test_workspace_deletion_is_owner_only() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;

    let err = fx
        .service
        .delete_workspace(editor, fx.workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("owner_only"));

    fx.service
        .delete_workspace(fx.owner, fx.workspace.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_membership_management() {
    let fx = TestFixture::new().await;
    let user = Uuid::now_v7();

    fx.service
        .add_member(fx.owner, fx.workspace.id, user, PermissionLevel::View)
        .await
        .unwrap();

    let err = fx
        .service
        .add_member(fx.owner, fx.workspace.id, user, PermissionLevel::Edit)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::conflict(reason::MEMBER_ALREADY_EXISTS));

    let err = fx
        .service
        .add_member(fx.owner, fx.workspace.id, fx.owner, PermissionLevel::Edit)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::OWNER_MEMBERSHIP_NOT_ALLOWED));

    // A viewer cannot manage members.
    let err = fx
        .service
        .add_member(user, fx.workspace.id, Uuid::now_v7(), PermissionLevel::View)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("insufficient_permission"));

    let updated = fx
        .service
        .update_member_permission(fx.owner, fx.workspace.id, user, PermissionLevel::Edit)
        .await
        .unwrap();
    assert_eq!(updated.permission, PermissionLevel::Edit);

    let members = fx
        .service
        .list_members(user, fx.workspace.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[0].owner);
    assert_eq!(members[0].user_id, fx.owner);
    assert_eq!(members[1].permission, PermissionLevel::Edit);

    fx.service
        .remove_member(fx.owner, fx.workspace.id, user)
        .await
        .unwrap();
    let err = fx
        .service
        .get_workspace(user, fx.workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));

    let err = fx
        .service
        .remove_member(fx.owner, fx.workspace.id, user)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound(reason::MEMBERSHIP_NOT_FOUND.to_string())
    );
}

#[tokio::test]
async fn test_list_workspaces_reports_grant() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;
    let (own, _) = fx
        .service
        .create_workspace(editor, "Side project")
        .await
        .unwrap();

    let summaries = fx.service.list_workspaces(editor).await.unwrap();
    assert_eq!(summaries.len(), 2);

    let owned = summaries
        .iter()
        .find(|s| s.workspace.id == own.id)
        .unwrap();
    assert_eq!(owned.access, Grant::Owner);

    let joined = summaries
        .iter()
        .find(|s| s.workspace.id == fx.workspace.id)
        .unwrap();
    assert_eq!(joined.access, Grant::Member(PermissionLevel::Edit));

    assert!(fx
        .service
        .list_workspaces(Uuid::now_v7())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_assignment_members_must_be_in_workspace() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;
    let viewer = fx.member(PermissionLevel::View).await;
    let card = fx.card(&fx.inbox, "Globex").await;

    let err = fx
        .service
        .add_assignment_member(fx.owner, card.id, Uuid::now_v7())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::USER_NOT_IN_WORKSPACE));

    fx.service
        .add_assignment_member(fx.owner, card.id, editor)
        .await
        .unwrap();
    let updated = fx
        .service
        .add_assignment_member(fx.owner, card.id, fx.owner)
        .await
        .unwrap();
    assert_eq!(updated.members, vec![editor, fx.owner]);

    let err = fx
        .service
        .add_assignment_member(fx.owner, card.id, editor)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::conflict(reason::MEMBER_ALREADY_ASSIGNED));

    let members = fx
        .service
        .list_assignment_members(viewer, card.id)
        .await
        .unwrap();
    assert_eq!(members, vec![editor, fx.owner]);

    let unassigned = fx
        .service
        .list_unassigned_members(viewer, card.id)
        .await
        .unwrap();
    assert_eq!(
        unassigned.iter().map(|m| m.user_id).collect::<Vec<_>>(),
        vec![viewer]
    );

    fx.service
        .remove_assignment_member(fx.owner, card.id, editor)
        .await
        .unwrap();
    let err = fx
        .service
        .remove_assignment_member(fx.owner, card.id, editor)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound(reason::MEMBER_NOT_ASSIGNED.to_string())
    );
}

#[tokio::test]
async fn test_task_assignees_come_from_assignment() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let task = fx.task(&card, "Call").await;

    let err = fx
        .service
        .assign_task_member(fx.owner, task.id, editor)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::USER_NOT_ON_ASSIGNMENT));

    fx.service
        .add_assignment_member(fx.owner, card.id, editor)
        .await
        .unwrap();
    let task = fx
        .service
        .assign_task_member(editor, task.id, editor)
        .await
        .unwrap();
    assert_eq!(task.assignees, vec![editor]);

    let err = fx
        .service
        .assign_task_member(fx.owner, task.id, editor)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::conflict(reason::MEMBER_ALREADY_ASSIGNED));

    let task = fx
        .service
        .unassign_task_member(fx.owner, task.id, editor)
        .await
        .unwrap();
    assert!(task.assignees.is_empty());

    let err = fx
        .service
        .unassign_task_member(fx.owner, task.id, editor)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound(reason::MEMBER_NOT_ASSIGNED.to_string())
    );
}

#[tokio::test]
async fn test_task_member_listings() {
    let fx = TestFixture::new().await;
    let editor = fx.member(PermissionLevel::Edit).await;
    let viewer = fx.member(PermissionLevel::View).await;
    let card = fx.card(&fx.inbox, "Globex").await;
    let task = fx.task(&card, "Call").await;

    for user in [editor, fx.owner] {
        fx.service
            .add_assignment_member(fx.owner, card.id, user)
            .await
            .unwrap();
    }
    fx.service
        .assign_task_member(fx.owner, task.id, editor)
        .await
        .unwrap();

    let assigned = fx
        .service
        .list_task_members(viewer, task.id)
        .await
        .unwrap();
    assert_eq!(assigned, vec![editor]);

    // Workspace members off the assignment are never candidates.
    let candidates = fx
        .service
        .list_unassigned_task_members(viewer, task.id)
        .await
        .unwrap();
    assert_eq!(candidates, vec![fx.owner]);

    let stranger = Uuid::now_v7();
    let err = fx
        .service
        .list_task_members(stranger, task.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));
    let err = fx
        .service
        .list_unassigned_task_members(stranger, task.id)
        .await
        .unwrap_err();
    assert_eq!(err, unauthorized("not_a_member"));

    let err = fx
        .service
        .list_unassigned_task_members(fx.owner, Uuid::now_v7())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("task_not_found".to_string()));
}

#[tokio::test]
async fn test_client_from_other_workspace_rejected() {
    let fx = TestFixture::new().await;
    let (other, _) = fx
        .service
        .create_workspace(fx.owner, "Other")
        .await
        .unwrap();
    let foreign = fx
        .service
        .create_client(fx.owner, other.id, NewClient::named("Globex"))
        .await
        .unwrap();

    let err = fx
        .service
        .create_client_assignment(fx.owner, fx.inbox.id, foreign.id)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::invalid(reason::CLIENT_NOT_IN_WORKSPACE));
    assert_eq!(err.status_code(), 422);
}
