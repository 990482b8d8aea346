//! Task service
//!
//! Tasks always hang off a live project and inherit its team. Status
//! transitions keep `completed_at` exact: set on entry into `done`,
//! cleared on exit.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use taskdeck_db::entities::bot::Capability;
use taskdeck_db::entities::{prelude::*, project, task, user};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::{activity, authz, integrity};

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
}

/// Changes applicable to a task. The double `Option` on `assigned_to`
/// distinguishes "leave as is" from "clear the assignment".
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<task::TaskStatus>,
    pub assigned_to: Option<Option<Uuid>>,
}

fn team_scope(principal: &Principal) -> Result<Uuid> {
    principal
        .effective_team_id()
        .ok_or_else(|| Error::validation("principal does not belong to a team"))
}

async fn validate_assignee(db: &DatabaseConnection, user_id: Uuid) -> Result<()> {
    let assignee = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?;
    if assignee.is_none() {
        return Err(Error::validation(format!(
            "assignee {user_id} is not an active user"
        )));
    }
    Ok(())
}

/// Fetch a task within the principal's team or fail with not-found.
pub async fn get_task(
    db: &DatabaseConnection,
    principal: &Principal,
    task_id: Uuid,
) -> Result<task::Model> {
    authz::require(principal, Capability::Read)?;
    let team_id = team_scope(principal)?;

    Task::find_by_id(task_id)
        .filter(task::Column::TeamId.eq(team_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("task", task_id))
}

/// Tasks in the principal's team, optionally narrowed to one project,
/// newest first.
pub async fn list_tasks(
    db: &DatabaseConnection,
    principal: &Principal,
    project_id: Option<Uuid>,
) -> Result<Vec<task::Model>> {
    authz::require(principal, Capability::Read)?;
    let team_id = team_scope(principal)?;

    let mut query = Task::find().filter(task::Column::TeamId.eq(team_id));
    if let Some(project_id) = project_id {
        query = query.filter(task::Column::ProjectId.eq(project_id));
    }

    let tasks = query
        .order_by_desc(task::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(tasks)
}

/// Create a task under a live project in the principal's team.
pub async fn create_task(
    db: &DatabaseConnection,
    principal: &Principal,
    input: NewTask,
) -> Result<task::Model> {
    authz::require(principal, Capability::CreateTasks)?;
    let team_id = team_scope(principal)?;

    let title = input.title.trim();
    if title.is_empty() {
        return Err(Error::validation("task title must not be empty"));
    }

    // The parent must be live; the schema will not catch a stale id.
    let project = Project::find_by_id(input.project_id)
        .filter(project::Column::TeamId.eq(team_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("project", input.project_id))?;

    if let Some(assignee) = input.assigned_to {
        validate_assignee(db, assignee).await?;
    }

    let now = Utc::now();
    let created = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(project.team_id),
        project_id: Set(project.id),
        title: Set(title.to_string()),
        description: Set(input.description),
        status: Set(task::TaskStatus::Pending),
        owner_id: Set(Some(principal.id())),
        assigned_to: Set(input.assigned_to),
        completed_at: Set(None),
        created_by: Set(principal.id()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let details = input
        .assigned_to
        .map(|assignee| json!({ "assigned_to": assignee.to_string() }));

    activity::record(
        db,
        Some(principal),
        "task_created",
        "task",
        &created.id.to_string(),
        Some(&created.title),
        details,
    )
    .await?;

    Ok(created)
}

/// Apply changes to a task; exactly one activity entry per call.
pub async fn update_task(
    db: &DatabaseConnection,
    principal: &Principal,
    task_id: Uuid,
    changes: TaskChanges,
) -> Result<task::Model> {
    authz::require(principal, Capability::UpdateTasks)?;
    let existing = get_task(db, principal, task_id).await?;

    let old_status = existing.status.clone();
    let mut details = serde_json::Map::new();
    let mut assignment_set: Option<Uuid> = None;

    let mut active: task::ActiveModel = existing.into();

    if let Some(title) = changes.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(Error::validation("task title must not be empty"));
        }
        details.insert("title".into(), json!(title));
        active.title = Set(title);
    }

    if let Some(description) = changes.description {
        active.description = Set(description);
    }

    if let Some(new_status) = changes.status {
        if new_status != old_status {
            // completed_at tracks the `done` boundary exactly.
            if new_status == task::TaskStatus::Done {
                active.completed_at = Set(Some(Utc::now()));
            } else if old_status == task::TaskStatus::Done {
                active.completed_at = Set(None);
            }
            details.insert("oldStatus".into(), json!(old_status));
            details.insert("newStatus".into(), json!(new_status));
        }
        active.status = Set(new_status);
    }

    if let Some(assignment) = changes.assigned_to {
        if let Some(assignee) = assignment {
            validate_assignee(db, assignee).await?;
            assignment_set = Some(assignee);
            details.insert("assigned_to".into(), json!(assignee.to_string()));
        } else {
            details.insert("assigned_to".into(), json!(null));
        }
        active.assigned_to = Set(assignment);
    }

    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    let action = if assignment_set.is_some() && details.len() == 1 {
        "task_assigned"
    } else {
        "task_updated"
    };

    activity::record(
        db,
        Some(principal),
        action,
        "task",
        &updated.id.to_string(),
        Some(&updated.title),
        Some(json!(details)),
    )
    .await?;

    Ok(updated)
}

/// Cascade-delete a task via the integrity engine.
pub async fn delete_task(
    db: &DatabaseConnection,
    principal: &Principal,
    task_id: Uuid,
) -> Result<integrity::TaskDeletion> {
    authz::require(principal, Capability::DeleteTasks)?;
    let task = get_task(db, principal, task_id).await?;

    integrity::delete_task(db, Some(principal), &task).await
}
