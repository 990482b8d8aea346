//! Task transitions, subtask answers and activity projections

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use taskdeck_core::{activity, authn, bots, projects, subtasks, tasks, Capability, Error};
use taskdeck_db::entities::{activity_log, prelude::*, subtask, task};

async fn project_with_task(
    db: &sea_orm::DatabaseConnection,
    principal: &taskdeck_core::Principal,
) -> (taskdeck_db::entities::project::Model, task::Model) {
    let project = projects::create_project(
        db,
        principal,
        projects::NewProject {
            name: "Sprint".to_string(),
            description: None,
        },
    )
    .await
    .expect("Failed to create project");

    let task = tasks::create_task(
        db,
        principal,
        tasks::NewTask {
            project_id: project.id,
            title: "Ship it".to_string(),
            description: None,
            assigned_to: None,
        },
    )
    .await
    .expect("Failed to create task");

    (project, task)
}

#[tokio::test]
async fn done_transition_sets_and_clears_completed_at() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let (_project, task) = project_with_task(&db, &admin).await;

    assert!(task.completed_at.is_none());

    let done = tasks::update_task(
        &db,
        &admin,
        task.id,
        tasks::TaskChanges {
            status: Some(task::TaskStatus::Done),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to update");
    assert_eq!(done.status, task::TaskStatus::Done);
    assert!(done.completed_at.is_some());

    let reopened = tasks::update_task(
        &db,
        &admin,
        task.id,
        tasks::TaskChanges {
            status: Some(task::TaskStatus::Pending),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to update");
    assert_eq!(reopened.status, task::TaskStatus::Pending);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn each_status_change_appends_exactly_one_task_entry() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let (_project, task) = project_with_task(&db, &admin).await;

    let before = task_entry_count(&db, &task.id.to_string()).await;

    tasks::update_task(
        &db,
        &admin,
        task.id,
        tasks::TaskChanges {
            status: Some(task::TaskStatus::InProgress),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to update");

    let after = task_entry_count(&db, &task.id.to_string()).await;

    assert_eq!(after, before + 1);
}

async fn task_entry_count(db: &sea_orm::DatabaseConnection, task_id: &str) -> u64 {
    use sea_orm::PaginatorTrait;
    ActivityLog::find()
        .filter(activity_log::Column::EntityKind.eq("task"))
        .filter(activity_log::Column::EntityId.eq(task_id))
        .count(db)
        .await
        .expect("Failed to count")
}

#[tokio::test]
async fn multiple_choice_answer_must_be_an_option() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let (_project, task) = project_with_task(&db, &admin).await;

    let sub = subtasks::create_subtask(
        &db,
        &admin,
        subtasks::NewSubtask {
            task_id: task.id,
            kind: subtask::SubtaskKind::MultipleChoice,
            prompt: "Deploy target?".to_string(),
            options: vec!["staging".to_string(), "production".to_string()],
            assigned_to: None,
        },
    )
    .await
    .expect("Failed to create subtask");

    let err = subtasks::answer_subtask(&db, &admin, sub.id, "laptop")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let unchanged = Subtask::find_by_id(sub.id)
        .one(&db)
        .await
        .expect("query")
        .expect("subtask exists");
    assert!(!unchanged.answered);
    assert!(unchanged.selected_option.is_none());

    let answered = subtasks::answer_subtask(&db, &admin, sub.id, "staging")
        .await
        .expect("Valid answer should succeed");
    assert!(answered.answered);
    assert_eq!(answered.selected_option.as_deref(), Some("staging"));
}

#[tokio::test]
async fn multiple_choice_requires_options() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let (_project, task) = project_with_task(&db, &admin).await;

    let err = subtasks::create_subtask(
        &db,
        &admin,
        subtasks::NewSubtask {
            task_id: task.id,
            kind: subtask::SubtaskKind::MultipleChoice,
            prompt: "Pick one".to_string(),
            options: vec![],
            assigned_to: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn task_creation_requires_live_project() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let err = tasks::create_task(
        &db,
        &admin,
        tasks::NewTask {
            project_id: uuid::Uuid::new_v4(),
            title: "Floating".to_string(),
            description: None,
            assigned_to: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "project", .. }));
}

#[tokio::test]
async fn bot_without_capability_is_forbidden() {
    let db = common::test_db().await;
    let (_team, owner) = common::team_with_admin(&db, "Acme", "alice").await;
    let (_project, task) = project_with_task(&db, &owner).await;

    let created = bots::create_bot(
        &db,
        &owner,
        bots::NewBot {
            username: "reader-bot".to_string(),
            permissions: [Capability::Read].into_iter().collect(),
        },
    )
    .await
    .expect("Failed to create bot");
    let bot = authn::resolve(&db, &created.token).await.expect("resolve");

    // Reading is allowed, mutating is not.
    assert!(tasks::get_task(&db, &bot, task.id).await.is_ok());

    let err = tasks::update_task(
        &db,
        &bot,
        task.id,
        tasks::TaskChanges {
            status: Some(task::TaskStatus::Done),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden(Capability::UpdateTasks)));

    let err = tasks::delete_task(&db, &bot, task.id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(Capability::DeleteTasks)));
}

#[tokio::test]
async fn assignment_activity_reaches_the_assignee_feed() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let assignee = common::register(&db, "bob").await;
    let (_project, task) = project_with_task(&db, &admin).await;

    let since = Utc::now() - Duration::minutes(5);

    tasks::update_task(
        &db,
        &admin,
        task.id,
        tasks::TaskChanges {
            assigned_to: Some(Some(assignee.id)),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to assign");

    tasks::update_task(
        &db,
        &admin,
        task.id,
        tasks::TaskChanges {
            status: Some(task::TaskStatus::InProgress),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to update");

    let feed = activity::assigned_to_user(&db, assignee.id, since)
        .await
        .expect("Failed to query feed");

    // Both the assignment itself and the later update on the assigned task.
    let actions: Vec<_> = feed.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"task_assigned"));
    assert!(actions.contains(&"task_updated"));

    // Newest first.
    let ids: Vec<i64> = feed.iter().map(|e| e.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn all_since_excludes_the_requesting_actor() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let since = Utc::now() - Duration::minutes(5);

    projects::create_project(
        &db,
        &admin,
        projects::NewProject {
            name: "Noise".to_string(),
            description: None,
        },
    )
    .await
    .expect("Failed to create project");

    let with_own = activity::all_since(&db, since, None)
        .await
        .expect("Failed to query");
    assert!(with_own.iter().any(|e| e.actor_id == Some(admin.id())));

    let without_own = activity::all_since(&db, since, Some(admin.id()))
        .await
        .expect("Failed to query");
    assert!(without_own.iter().all(|e| e.actor_id != Some(admin.id())));
}

#[tokio::test]
async fn recent_returns_newest_first_with_limit() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    for i in 0..5 {
        projects::create_project(
            &db,
            &admin,
            projects::NewProject {
                name: format!("P{i}"),
                description: None,
            },
        )
        .await
        .expect("Failed to create project");
    }

    let entries = activity::recent(&db, 3).await.expect("Failed to query");
    assert_eq!(entries.len(), 3);
    assert!(entries[0].id > entries[1].id && entries[1].id > entries[2].id);
}
