//! Subtask service
//!
//! Subtasks are either multiple-choice (answer must be one of the stored
//! options) or open-answer. `answered` is true exactly when an answer has
//! been accepted.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::json;
use taskdeck_db::entities::bot::Capability;
use taskdeck_db::entities::{prelude::*, subtask, task, user};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::{activity, authz};

/// Input for creating a subtask
#[derive(Debug, Clone)]
pub struct NewSubtask {
    pub task_id: Uuid,
    pub kind: subtask::SubtaskKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub assigned_to: Option<Uuid>,
}

fn team_scope(principal: &Principal) -> Result<Uuid> {
    principal
        .effective_team_id()
        .ok_or_else(|| Error::validation("principal does not belong to a team"))
}

/// Fetch a subtask whose parent task sits in the principal's team.
pub async fn get_subtask(
    db: &DatabaseConnection,
    principal: &Principal,
    subtask_id: Uuid,
) -> Result<subtask::Model> {
    authz::require(principal, Capability::Read)?;
    let team_id = team_scope(principal)?;

    let subtask = Subtask::find_by_id(subtask_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("subtask", subtask_id))?;

    // Scope via the parent; an orphan row is invisible until swept.
    let parent = subtask
        .find_related(Task)
        .filter(task::Column::TeamId.eq(team_id))
        .one(db)
        .await?;
    if parent.is_none() {
        return Err(Error::not_found("subtask", subtask_id));
    }

    Ok(subtask)
}

/// Subtasks of one task, oldest first.
pub async fn list_subtasks(
    db: &DatabaseConnection,
    principal: &Principal,
    task_id: Uuid,
) -> Result<Vec<subtask::Model>> {
    // Task lookup carries the Read check and team scoping.
    let task = crate::tasks::get_task(db, principal, task_id).await?;

    let subtasks = Subtask::find()
        .filter(subtask::Column::TaskId.eq(task.id))
        .order_by_asc(subtask::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(subtasks)
}

/// Create a subtask under a live task.
pub async fn create_subtask(
    db: &DatabaseConnection,
    principal: &Principal,
    input: NewSubtask,
) -> Result<subtask::Model> {
    authz::require(principal, Capability::CreateTasks)?;

    let task = crate::tasks::get_task(db, principal, input.task_id).await?;

    let prompt = input.prompt.trim();
    if prompt.is_empty() {
        return Err(Error::validation("subtask prompt must not be empty"));
    }
    if input.kind == subtask::SubtaskKind::MultipleChoice && input.options.is_empty() {
        return Err(Error::validation(
            "multiple_choice subtasks need at least one option",
        ));
    }

    if let Some(assignee) = input.assigned_to {
        let active = User::find_by_id(assignee)
            .filter(user::Column::IsActive.eq(true))
            .one(db)
            .await?;
        if active.is_none() {
            return Err(Error::validation(format!(
                "assignee {assignee} is not an active user"
            )));
        }
    }

    let now = Utc::now();
    let created = subtask::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task.id),
        kind: Set(input.kind),
        prompt: Set(prompt.to_string()),
        options: Set(subtask::OptionList(input.options)),
        selected_option: Set(None),
        answered: Set(false),
        assigned_to: Set(input.assigned_to),
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
        "subtask_created",
        "subtask",
        &created.id.to_string(),
        Some(&created.prompt),
        details,
    )
    .await?;

    Ok(created)
}

/// Record an answer. For multiple choice the value must be one of the
/// configured options; a rejected answer leaves `answered` untouched.
pub async fn answer_subtask(
    db: &DatabaseConnection,
    principal: &Principal,
    subtask_id: Uuid,
    answer: &str,
) -> Result<subtask::Model> {
    authz::require(principal, Capability::UpdateTasks)?;
    let existing = get_subtask(db, principal, subtask_id).await?;

    if existing.kind == subtask::SubtaskKind::MultipleChoice
        && !existing.options.contains(answer)
    {
        return Err(Error::validation(format!(
            "'{answer}' is not one of the configured options"
        )));
    }

    let prompt = existing.prompt.clone();
    let mut active: subtask::ActiveModel = existing.into();
    active.selected_option = Set(Some(answer.to_string()));
    active.answered = Set(true);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    activity::record(
        db,
        Some(principal),
        "subtask_answered",
        "subtask",
        &updated.id.to_string(),
        Some(&prompt),
        Some(json!({ "answer": answer })),
    )
    .await?;

    Ok(updated)
}

/// Point a subtask at a different human, or clear the assignment.
pub async fn assign_subtask(
    db: &DatabaseConnection,
    principal: &Principal,
    subtask_id: Uuid,
    assignee: Option<Uuid>,
) -> Result<subtask::Model> {
    authz::require(principal, Capability::UpdateTasks)?;
    let existing = get_subtask(db, principal, subtask_id).await?;

    if let Some(user_id) = assignee {
        let active = User::find_by_id(user_id)
            .filter(user::Column::IsActive.eq(true))
            .one(db)
            .await?;
        if active.is_none() {
            return Err(Error::validation(format!(
                "assignee {user_id} is not an active user"
            )));
        }
    }

    let prompt = existing.prompt.clone();
    let mut active: subtask::ActiveModel = existing.into();
    active.assigned_to = Set(assignee);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    let details = match assignee {
        Some(user_id) => json!({ "assigned_to": user_id.to_string() }),
        None => json!({ "assigned_to": null }),
    };

    activity::record(
        db,
        Some(principal),
        "subtask_assigned",
        "subtask",
        &updated.id.to_string(),
        Some(&prompt),
        Some(details),
    )
    .await?;

    Ok(updated)
}

/// Delete a subtask. Subtasks are leaves; nothing cascades.
pub async fn delete_subtask(
    db: &DatabaseConnection,
    principal: &Principal,
    subtask_id: Uuid,
) -> Result<()> {
    authz::require(principal, Capability::DeleteTasks)?;
    let existing = get_subtask(db, principal, subtask_id).await?;

    let id = existing.id;
    let prompt = existing.prompt.clone();
    existing.delete(db).await?;

    activity::record(
        db,
        Some(principal),
        "subtask_deleted",
        "subtask",
        &id.to_string(),
        Some(&prompt),
        None,
    )
    .await?;

    Ok(())
}
