//! Integration tests for taskdeck-db
//!
//! Tests entity round-trips against a real SQLite in-memory database

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};
use taskdeck_db::{
    connect,
    entities::{activity_log, bot, project, subtask, task, user},
    migrate,
};
use uuid::Uuid;

/// Helper to create a test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

async fn insert_user(db: &sea_orm::DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("$argon2id$stub".to_string()),
        full_name: Set(None),
        team_id: Set(None),
        is_team_admin: Set(false),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_and_read_task() {
    let db = setup_test_db().await;
    let creator = insert_user(&db, "alice").await;

    let team_id = Uuid::new_v4();
    let project_id = Uuid::new_v4();
    let task_id = Uuid::new_v4();

    let row = task::ActiveModel {
        id: Set(task_id),
        team_id: Set(team_id),
        project_id: Set(project_id),
        title: Set("Write release notes".to_string()),
        description: Set(Some("v0.1".to_string())),
        status: Set(task::TaskStatus::Pending),
        owner_id: Set(Some(creator.id)),
        assigned_to: Set(None),
        completed_at: Set(None),
        created_by: Set(creator.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    };

    row.insert(&db).await.expect("Failed to insert task");

    let found = task::Entity::find_by_id(task_id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Task not found");

    assert_eq!(found.title, "Write release notes");
    assert_eq!(found.status, task::TaskStatus::Pending);
    assert_eq!(found.owner_id, Some(creator.id));
    assert!(found.completed_at.is_none());
}

#[tokio::test]
async fn test_update_task_status() {
    let db = setup_test_db().await;
    let creator = insert_user(&db, "bob").await;

    let task_id = Uuid::new_v4();
    task::ActiveModel {
        id: Set(task_id),
        team_id: Set(Uuid::new_v4()),
        project_id: Set(Uuid::new_v4()),
        title: Set("Flip status".to_string()),
        description: Set(None),
        status: Set(task::TaskStatus::Pending),
        owner_id: Set(Some(creator.id)),
        assigned_to: Set(None),
        completed_at: Set(None),
        created_by: Set(creator.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert");

    let found = task::Entity::find_by_id(task_id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Task not found");

    let mut active: task::ActiveModel = found.into();
    active.status = Set(task::TaskStatus::Done);
    active.completed_at = Set(Some(Utc::now()));

    let updated = active.update(&db).await.expect("Failed to update");

    assert_eq!(updated.status, task::TaskStatus::Done);
    assert!(updated.completed_at.is_some());
}

#[tokio::test]
async fn test_delete_subtask() {
    let db = setup_test_db().await;

    let subtask_id = Uuid::new_v4();
    let inserted = subtask::ActiveModel {
        id: Set(subtask_id),
        task_id: Set(Uuid::new_v4()),
        kind: Set(subtask::SubtaskKind::OpenAnswer),
        prompt: Set("Summarize the incident".to_string()),
        options: Set(subtask::OptionList::default()),
        selected_option: Set(None),
        answered: Set(false),
        assigned_to: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert");

    inserted.delete(&db).await.expect("Failed to delete");

    let found = subtask::Entity::find_by_id(subtask_id)
        .one(&db)
        .await
        .expect("Failed to query");

    assert!(found.is_none());
}

#[tokio::test]
async fn test_query_tasks_by_project() {
    let db = setup_test_db().await;
    let creator = insert_user(&db, "carol").await;

    let project_id = Uuid::new_v4();
    for i in 1..=3 {
        task::ActiveModel {
            id: Set(Uuid::new_v4()),
            team_id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            title: Set(format!("Task {i}")),
            description: Set(None),
            status: Set(task::TaskStatus::Pending),
            owner_id: Set(Some(creator.id)),
            assigned_to: Set(None),
            completed_at: Set(None),
            created_by: Set(creator.id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&db)
        .await
        .expect("Failed to insert");
    }

    // One task under a different project
    task::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(Uuid::new_v4()),
        project_id: Set(Uuid::new_v4()),
        title: Set("Elsewhere".to_string()),
        description: Set(None),
        status: Set(task::TaskStatus::Pending),
        owner_id: Set(Some(creator.id)),
        assigned_to: Set(None),
        completed_at: Set(None),
        created_by: Set(creator.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert");

    let tasks = task::Entity::find()
        .filter(task::Column::ProjectId.eq(project_id))
        .all(&db)
        .await
        .expect("Failed to query");

    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.project_id == project_id));
}

#[tokio::test]
async fn test_bot_permissions_roundtrip() {
    let db = setup_test_db().await;
    let owner = insert_user(&db, "dave").await;

    let permissions: bot::PermissionSet =
        [bot::Capability::Read, bot::Capability::UpdateTasks]
            .into_iter()
            .collect();

    let bot_id = Uuid::new_v4();
    bot::ActiveModel {
        id: Set(bot_id),
        username: Set("deploy-bot".to_string()),
        api_token: Set("bot_0123456789abcdef".to_string()),
        owner_id: Set(owner.id),
        permissions: Set(permissions.clone()),
        is_active: Set(true),
        last_used_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert bot");

    let found = bot::Entity::find_by_id(bot_id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Bot not found");

    assert_eq!(found.permissions, permissions);
    assert!(found.permissions.allows(bot::Capability::Read));
    assert!(!found.permissions.allows(bot::Capability::DeleteTasks));
}

#[tokio::test]
async fn test_unique_bot_token() {
    let db = setup_test_db().await;
    let owner = insert_user(&db, "erin").await;

    let make = |name: &str| bot::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(name.to_string()),
        api_token: Set("bot_deadbeef".to_string()),
        owner_id: Set(owner.id),
        permissions: Set(bot::PermissionSet::new()),
        is_active: Set(true),
        last_used_at: Set(None),
        created_at: Set(Utc::now()),
    };

    make("first-bot").insert(&db).await.expect("Failed to insert");
    let duplicate = make("second-bot").insert(&db).await;

    assert!(duplicate.is_err(), "Duplicate token should violate unique index");
}

#[tokio::test]
async fn test_orphan_rows_are_representable() {
    // Parent links carry no FK, so a task may reference a missing project.
    let db = setup_test_db().await;
    let creator = insert_user(&db, "frank").await;

    let ghost_project = Uuid::new_v4();
    let inserted = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(Uuid::new_v4()),
        project_id: Set(ghost_project),
        title: Set("Orphan".to_string()),
        description: Set(None),
        status: Set(task::TaskStatus::Pending),
        owner_id: Set(Some(creator.id)),
        assigned_to: Set(None),
        completed_at: Set(None),
        created_by: Set(creator.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await;

    assert!(inserted.is_ok());

    let parent = project::Entity::find_by_id(ghost_project)
        .one(&db)
        .await
        .expect("Failed to query");
    assert!(parent.is_none());
}

#[tokio::test]
async fn test_concurrent_activity_appends() {
    let db = setup_test_db().await;

    let mut handles = vec![];

    for i in 0..10 {
        let db_clone = db.clone();
        let handle = tokio::spawn(async move {
            activity_log::ActiveModel {
                actor_id: Set(None),
                actor_kind: Set(None),
                action: Set("task_created".to_string()),
                entity_kind: Set("task".to_string()),
                entity_id: Set(format!("task-{i}")),
                entity_name: Set(None),
                details: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_clone)
            .await
        });

        handles.push(handle);
    }

    for handle in handles {
        let result = handle.await.expect("Task panicked");
        assert!(result.is_ok());
    }

    let count = activity_log::Entity::find()
        .filter(activity_log::Column::Action.eq("task_created"))
        .count(&db)
        .await
        .expect("Failed to count");

    assert_eq!(count, 10);
}
