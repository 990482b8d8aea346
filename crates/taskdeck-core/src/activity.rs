//! Append-only activity log
//!
//! Every mutating operation appends exactly one entry before the request
//! is considered successful. `record` takes any connection so it can join
//! the caller's transaction; the read projections are newest-first.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use taskdeck_db::entities::{activity_log, prelude::*, subtask, task};
use uuid::Uuid;

use crate::error::Result;
use crate::principal::Principal;

/// Append one entry. Completes (or fails) before the caller reports
/// success; there are no silent drops.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    actor: Option<&Principal>,
    action: &str,
    entity_kind: &str,
    entity_id: &str,
    entity_name: Option<&str>,
    details: Option<JsonValue>,
) -> Result<()> {
    activity_log::ActiveModel {
        actor_id: Set(actor.map(Principal::id)),
        actor_kind: Set(actor.map(Principal::kind)),
        action: Set(action.to_string()),
        entity_kind: Set(entity_kind.to_string()),
        entity_id: Set(entity_id.to_string()),
        entity_name: Set(entity_name.map(str::to_string)),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// The most recent `limit` entries, newest first.
pub async fn recent(db: &DatabaseConnection, limit: u64) -> Result<Vec<activity_log::Model>> {
    let entries = ActivityLog::find()
        .order_by_desc(activity_log::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(entries)
}

/// Everything after `since`, optionally excluding one actor's own entries
/// (so "what changed since I last looked" skips the looker's own edits).
pub async fn all_since(
    db: &DatabaseConnection,
    since: DateTime<Utc>,
    exclude_actor: Option<Uuid>,
) -> Result<Vec<activity_log::Model>> {
    let mut query = ActivityLog::find().filter(activity_log::Column::CreatedAt.gt(since));

    if let Some(actor_id) = exclude_actor {
        // NULL actors (system repairs) must survive the exclusion.
        query = query.filter(
            Condition::any()
                .add(activity_log::Column::ActorId.ne(actor_id))
                .add(activity_log::Column::ActorId.is_null()),
        );
    }

    let entries = query
        .order_by_desc(activity_log::Column::Id)
        .all(db)
        .await?;
    Ok(entries)
}

/// Activity relevant to a user: entries whose target task (directly, or via
/// a subtask's parent task) is assigned to the user, plus explicit
/// assignments naming the user.
pub async fn assigned_to_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<activity_log::Model>> {
    let assigned_tasks: Vec<Uuid> = Task::find()
        .filter(task::Column::AssignedTo.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let assigned_subtasks: Vec<Uuid> = if assigned_tasks.is_empty() {
        Vec::new()
    } else {
        Subtask::find()
            .filter(subtask::Column::TaskId.is_in(assigned_tasks.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect()
    };

    let task_ids: HashSet<String> = assigned_tasks.iter().map(Uuid::to_string).collect();
    let subtask_ids: HashSet<String> = assigned_subtasks.iter().map(Uuid::to_string).collect();
    let user_id_str = user_id.to_string();

    let entries = ActivityLog::find()
        .filter(activity_log::Column::CreatedAt.gt(since))
        .order_by_desc(activity_log::Column::Id)
        .all(db)
        .await?;

    Ok(entries
        .into_iter()
        .filter(|entry| {
            let targets_assigned = match entry.entity_kind.as_str() {
                "task" => task_ids.contains(&entry.entity_id),
                "subtask" => subtask_ids.contains(&entry.entity_id),
                _ => false,
            };
            targets_assigned || names_user(entry, &user_id_str)
        })
        .collect())
}

/// Whether an entry is an explicit assignment naming the user.
fn names_user(entry: &activity_log::Model, user_id: &str) -> bool {
    let Some(details) = &entry.details else {
        return false;
    };
    details
        .get("assigned_to")
        .and_then(JsonValue::as_str)
        .is_some_and(|assignee| assignee == user_id)
}
