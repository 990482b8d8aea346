//! Manual referential integrity
//!
//! The schema carries no foreign keys on the project → task → subtask
//! edges, so deletion order is this engine's responsibility: dependents
//! first, inside one transaction per top-level delete, with one activity
//! entry summarizing what went. The orphan sweep repairs rows whose parent
//! vanished through any other path; running it twice deletes nothing the
//! second time.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use taskdeck_db::entities::{prelude::*, project, subtask, task};
use tracing::info;
use uuid::Uuid;

use crate::activity;
use crate::error::{Error, Result};
use crate::principal::Principal;

/// Outcome of a project cascade delete
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectDeletion {
    pub id: Uuid,
    pub deleted: bool,
    pub tasks_deleted: u64,
    pub subtasks_deleted: u64,
}

/// Outcome of a task cascade delete
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskDeletion {
    pub id: Uuid,
    pub deleted: bool,
    pub subtasks_deleted: u64,
}

/// Outcome of an orphan sweep; counts, never an error
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub orphan_tasks_deleted: u64,
    pub orphan_subtasks_deleted: u64,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_tasks_deleted == 0 && self.orphan_subtasks_deleted == 0
    }
}

/// Delete a project's subtasks, tasks, then the project itself.
/// Runs on the caller's connection so removals can join a wider
/// transaction (e.g. account removal).
pub(crate) async fn cascade_delete_project<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<(u64, u64)> {
    let task_ids: Vec<Uuid> = Task::find()
        .filter(task::Column::ProjectId.eq(project_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let subtasks_deleted = if task_ids.is_empty() {
        0
    } else {
        Subtask::delete_many()
            .filter(subtask::Column::TaskId.is_in(task_ids.clone()))
            .exec(conn)
            .await?
            .rows_affected
    };

    let tasks_deleted = Task::delete_many()
        .filter(task::Column::ProjectId.eq(project_id))
        .exec(conn)
        .await?
        .rows_affected;

    Project::delete_by_id(project_id).exec(conn).await?;

    Ok((tasks_deleted, subtasks_deleted))
}

/// Delete a task's subtasks, then the task.
pub(crate) async fn cascade_delete_task<C: ConnectionTrait>(
    conn: &C,
    task_id: Uuid,
) -> Result<u64> {
    let subtasks_deleted = Subtask::delete_many()
        .filter(subtask::Column::TaskId.eq(task_id))
        .exec(conn)
        .await?
        .rows_affected;

    Task::delete_by_id(task_id).exec(conn).await?;

    Ok(subtasks_deleted)
}

/// Cascade-delete a project. One transaction, one activity entry;
/// dependent deletions are summarized in the entry's details.
pub async fn delete_project(
    db: &DatabaseConnection,
    actor: Option<&Principal>,
    project: &project::Model,
) -> Result<ProjectDeletion> {
    let txn = db.begin().await?;

    let outcome = async {
        let (tasks_deleted, subtasks_deleted) = cascade_delete_project(&txn, project.id).await?;

        activity::record(
            &txn,
            actor,
            "project_deleted",
            "project",
            &project.id.to_string(),
            Some(&project.name),
            Some(json!({
                "tasksDeleted": tasks_deleted,
                "subtasksDeleted": subtasks_deleted,
            })),
        )
        .await?;

        Ok::<_, Error>(ProjectDeletion {
            id: project.id,
            deleted: true,
            tasks_deleted,
            subtasks_deleted,
        })
    }
    .await;

    match outcome {
        Ok(deletion) => {
            txn.commit().await?;
            info!(
                project = %project.name,
                tasks = deletion.tasks_deleted,
                subtasks = deletion.subtasks_deleted,
                "project cascade delete complete"
            );
            Ok(deletion)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}

/// Cascade-delete a task. Same shape, one level down.
pub async fn delete_task(
    db: &DatabaseConnection,
    actor: Option<&Principal>,
    task: &task::Model,
) -> Result<TaskDeletion> {
    let txn = db.begin().await?;

    let outcome = async {
        let subtasks_deleted = cascade_delete_task(&txn, task.id).await?;

        activity::record(
            &txn,
            actor,
            "task_deleted",
            "task",
            &task.id.to_string(),
            Some(&task.title),
            Some(json!({ "subtasksDeleted": subtasks_deleted })),
        )
        .await?;

        Ok::<_, Error>(TaskDeletion {
            id: task.id,
            deleted: true,
            subtasks_deleted,
        })
    }
    .await;

    match outcome {
        Ok(deletion) => {
            txn.commit().await?;
            Ok(deletion)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}

/// Find and delete rows whose parent no longer exists: tasks under a
/// vanished project (their subtasks go with them), then subtasks under a
/// vanished task. Idempotent, safe to run on a schedule; inconsistencies
/// are a repair outcome, not an error.
pub async fn sweep_orphans(db: &DatabaseConnection) -> Result<SweepReport> {
    let txn = db.begin().await?;

    let outcome = async {
        let live_projects: HashSet<Uuid> = Project::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let orphan_task_ids: Vec<Uuid> = Task::find()
            .all(&txn)
            .await?
            .into_iter()
            .filter(|t| !live_projects.contains(&t.project_id))
            .map(|t| t.id)
            .collect();

        let mut report = SweepReport::default();

        if !orphan_task_ids.is_empty() {
            report.orphan_subtasks_deleted += Subtask::delete_many()
                .filter(subtask::Column::TaskId.is_in(orphan_task_ids.clone()))
                .exec(&txn)
                .await?
                .rows_affected;

            report.orphan_tasks_deleted = Task::delete_many()
                .filter(task::Column::Id.is_in(orphan_task_ids))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        let live_tasks: HashSet<Uuid> = Task::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let orphan_subtask_ids: Vec<Uuid> = Subtask::find()
            .all(&txn)
            .await?
            .into_iter()
            .filter(|s| !live_tasks.contains(&s.task_id))
            .map(|s| s.id)
            .collect();

        if !orphan_subtask_ids.is_empty() {
            report.orphan_subtasks_deleted += Subtask::delete_many()
                .filter(subtask::Column::Id.is_in(orphan_subtask_ids))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        if !report.is_clean() {
            activity::record(
                &txn,
                None,
                "orphan_sweep_completed",
                "system",
                "orphan-sweep",
                None,
                Some(json!({
                    "orphanTasksDeleted": report.orphan_tasks_deleted,
                    "orphanSubtasksDeleted": report.orphan_subtasks_deleted,
                })),
            )
            .await?;
        }

        Ok::<_, Error>(report)
    }
    .await;

    match outcome {
        Ok(report) => {
            txn.commit().await?;
            if !report.is_clean() {
                info!(
                    tasks = report.orphan_tasks_deleted,
                    subtasks = report.orphan_subtasks_deleted,
                    "orphan sweep repaired inconsistent rows"
                );
            }
            Ok(report)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}
