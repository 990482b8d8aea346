//! Account lifecycle: registration and removal with content transfer
//!
//! Removal never strands content. Everything the principal owns or is
//! assigned moves to a transfer target (or is cleared to unassigned under
//! the team fallback), and all of it — reassignments, session cleanup, the
//! principal row, the activity entry — commits or rolls back as one
//! transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use taskdeck_auth::hash_password;
use taskdeck_db::entities::{bot, prelude::*, project, session, subtask, task, team_request, user};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::{activity, integrity};

/// Input for registering a human account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Everything a principal owns or is assigned, enumerated before removal
#[derive(Debug, Clone, Default)]
pub struct OwnedContent {
    pub owned_projects: Vec<project::Model>,
    pub owned_tasks: Vec<task::Model>,
    pub assigned_tasks: Vec<task::Model>,
    pub assigned_subtasks: Vec<subtask::Model>,
}

/// Outcome of a user removal
#[derive(Debug, Clone, Serialize)]
pub struct RemovalSummary {
    pub removed_id: Uuid,
    pub removed_username: String,
    /// Target of the transfer; `None` means the unassigned fallback ran
    pub transferred_to: Option<Uuid>,
    pub projects_reassigned: u64,
    pub tasks_reassigned: u64,
    pub task_assignments_updated: u64,
    pub subtask_assignments_updated: u64,
    pub bots_removed: u64,
}

/// What to do with a bot's owned content on removal
#[derive(Debug, Clone)]
pub enum BotContentDisposition {
    /// Reassign to the given user, or to the bot's owner when `None`
    Transfer(Option<Uuid>),
    /// Cascade-delete everything the bot owns
    Delete,
}

/// Outcome of a bot removal
#[derive(Debug, Clone, Serialize)]
pub struct BotRemovalSummary {
    pub removed_id: Uuid,
    pub removed_username: String,
    pub transferred_to: Option<Uuid>,
    pub projects_reassigned: u64,
    pub tasks_reassigned: u64,
    pub projects_deleted: u64,
    pub tasks_deleted: u64,
    pub subtasks_deleted: u64,
}

/// Register a human account. Username and email must be unique; the
/// password is stored as an argon2id hash.
pub async fn register_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(Error::validation("username must not be empty"));
    }
    if !input.email.contains('@') {
        return Err(Error::validation("email address is not valid"));
    }
    if input.password.len() < 8 {
        return Err(Error::validation("password must be at least 8 characters"));
    }

    let clash = User::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Username.eq(username))
                .add(user::Column::Email.eq(input.email.as_str())),
        )
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(Error::validation("username or email is already taken"));
    }

    let now = Utc::now();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(input.email),
        password_hash: Set(hash_password(&input.password)?),
        full_name: Set(input.full_name),
        team_id: Set(None),
        is_team_admin: Set(false),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    activity::record(
        db,
        None,
        "user_registered",
        "user",
        &created.id.to_string(),
        Some(&created.username),
        None,
    )
    .await?;

    Ok(created)
}

/// Enumerate everything a principal owns or is assigned.
pub async fn owned_content<C: ConnectionTrait>(
    conn: &C,
    principal_id: Uuid,
) -> Result<OwnedContent> {
    Ok(OwnedContent {
        owned_projects: Project::find()
            .filter(project::Column::OwnerId.eq(principal_id))
            .all(conn)
            .await?,
        owned_tasks: Task::find()
            .filter(task::Column::OwnerId.eq(principal_id))
            .all(conn)
            .await?,
        assigned_tasks: Task::find()
            .filter(task::Column::AssignedTo.eq(principal_id))
            .all(conn)
            .await?,
        assigned_subtasks: Subtask::find()
            .filter(subtask::Column::AssignedTo.eq(principal_id))
            .all(conn)
            .await?,
    })
}

/// Where a removed user's content goes
enum Resolution {
    Transfer(user::Model),
    Unassign,
}

/// Resolve the transfer target per policy: an explicit target wins; a
/// teamless user needs some other active human (else the removal fails);
/// a team member's content prefers another admin, then any member, and
/// falls back to unassigned when the team has nobody else.
async fn resolve_transfer_target(
    db: &DatabaseConnection,
    target: &user::Model,
    explicit: Option<Uuid>,
) -> Result<Resolution> {
    if let Some(id) = explicit {
        let candidate = User::find_by_id(id)
            .filter(user::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| Error::validation(format!("transfer target {id} is not an active user")))?;
        if candidate.id == target.id {
            return Err(Error::validation(
                "cannot transfer content to the user being removed",
            ));
        }
        return Ok(Resolution::Transfer(candidate));
    }

    match target.team_id {
        None => {
            let candidate = User::find()
                .filter(user::Column::Id.ne(target.id))
                .filter(user::Column::IsActive.eq(true))
                .one(db)
                .await?;
            candidate
                .map(Resolution::Transfer)
                .ok_or(Error::NoTransferTargetAvailable)
        }
        Some(team_id) => {
            let other_admin = User::find()
                .filter(user::Column::TeamId.eq(team_id))
                .filter(user::Column::IsTeamAdmin.eq(true))
                .filter(user::Column::Id.ne(target.id))
                .filter(user::Column::IsActive.eq(true))
                .one(db)
                .await?;
            if let Some(admin) = other_admin {
                return Ok(Resolution::Transfer(admin));
            }

            let other_member = User::find()
                .filter(user::Column::TeamId.eq(team_id))
                .filter(user::Column::Id.ne(target.id))
                .filter(user::Column::IsActive.eq(true))
                .one(db)
                .await?;
            Ok(other_member
                .map(Resolution::Transfer)
                .unwrap_or(Resolution::Unassign))
        }
    }
}

/// Remove a human account, transferring or clearing everything it owns.
pub async fn remove_user(
    db: &DatabaseConnection,
    actor: Option<&Principal>,
    target_user_id: Uuid,
    transfer_to: Option<Uuid>,
) -> Result<RemovalSummary> {
    let target = User::find_by_id(target_user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", target_user_id))?;

    let resolution = resolve_transfer_target(db, &target, transfer_to).await?;

    let txn = db.begin().await?;

    let outcome = async {
        let owned_bots: Vec<Uuid> = Bot::find()
            .filter(bot::Column::OwnerId.eq(target.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        let mut summary = RemovalSummary {
            removed_id: target.id,
            removed_username: target.username.clone(),
            transferred_to: None,
            projects_reassigned: 0,
            tasks_reassigned: 0,
            task_assignments_updated: 0,
            subtask_assignments_updated: 0,
            bots_removed: 0,
        };

        match &resolution {
            Resolution::Transfer(to) => {
                summary.transferred_to = Some(to.id);

                summary.projects_reassigned = Project::update_many()
                    .set(project::ActiveModel {
                        owner_id: Set(Some(to.id)),
                        ..Default::default()
                    })
                    .filter(project::Column::OwnerId.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.tasks_reassigned = Task::update_many()
                    .set(task::ActiveModel {
                        owner_id: Set(Some(to.id)),
                        ..Default::default()
                    })
                    .filter(task::Column::OwnerId.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.task_assignments_updated = Task::update_many()
                    .set(task::ActiveModel {
                        assigned_to: Set(Some(to.id)),
                        ..Default::default()
                    })
                    .filter(task::Column::AssignedTo.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.subtask_assignments_updated = Subtask::update_many()
                    .set(subtask::ActiveModel {
                        assigned_to: Set(Some(to.id)),
                        ..Default::default()
                    })
                    .filter(subtask::Column::AssignedTo.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                // Bots follow their owner's content to the new owner.
                if !owned_bots.is_empty() {
                    Bot::update_many()
                        .set(bot::ActiveModel {
                            owner_id: Set(to.id),
                            ..Default::default()
                        })
                        .filter(bot::Column::OwnerId.eq(target.id))
                        .exec(&txn)
                        .await?;
                }
            }
            Resolution::Unassign => {
                // Ownership held by the user, and by bots that are about
                // to go (a bot cannot outlive its owning human).
                let mut vacating = vec![target.id];
                vacating.extend(owned_bots.iter().copied());

                summary.projects_reassigned = Project::update_many()
                    .set(project::ActiveModel {
                        owner_id: Set(None),
                        ..Default::default()
                    })
                    .filter(project::Column::OwnerId.is_in(vacating.clone()))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.tasks_reassigned = Task::update_many()
                    .set(task::ActiveModel {
                        owner_id: Set(None),
                        ..Default::default()
                    })
                    .filter(task::Column::OwnerId.is_in(vacating))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.task_assignments_updated = Task::update_many()
                    .set(task::ActiveModel {
                        assigned_to: Set(None),
                        ..Default::default()
                    })
                    .filter(task::Column::AssignedTo.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.subtask_assignments_updated = Subtask::update_many()
                    .set(subtask::ActiveModel {
                        assigned_to: Set(None),
                        ..Default::default()
                    })
                    .filter(subtask::Column::AssignedTo.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.bots_removed = Bot::delete_many()
                    .filter(bot::Column::OwnerId.eq(target.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;
            }
        }

        TeamRequest::delete_many()
            .filter(team_request::Column::UserId.eq(target.id))
            .exec(&txn)
            .await?;

        Session::delete_many()
            .filter(session::Column::UserId.eq(target.id))
            .exec(&txn)
            .await?;

        User::delete_by_id(target.id).exec(&txn).await?;

        activity::record(
            &txn,
            actor,
            "user_removed",
            "user",
            &target.id.to_string(),
            Some(&target.username),
            Some(json!({
                "transferredTo": summary.transferred_to.map(|id| id.to_string()),
                "projectsReassigned": summary.projects_reassigned,
                "tasksReassigned": summary.tasks_reassigned,
                "taskAssignmentsUpdated": summary.task_assignments_updated,
                "subtaskAssignmentsUpdated": summary.subtask_assignments_updated,
                "botsRemoved": summary.bots_removed,
            })),
        )
        .await?;

        Ok::<_, Error>(summary)
    }
    .await;

    match outcome {
        Ok(summary) => {
            txn.commit().await?;
            info!(
                username = %summary.removed_username,
                transferred_to = ?summary.transferred_to,
                "user removed"
            );
            Ok(summary)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}

/// Remove a bot, either transferring its content or cascade-deleting it.
pub async fn remove_bot(
    db: &DatabaseConnection,
    actor: Option<&Principal>,
    bot_id: Uuid,
    disposition: BotContentDisposition,
) -> Result<BotRemovalSummary> {
    let bot = Bot::find_by_id(bot_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bot", bot_id))?;

    let mut summary = BotRemovalSummary {
        removed_id: bot.id,
        removed_username: bot.username.clone(),
        transferred_to: None,
        projects_reassigned: 0,
        tasks_reassigned: 0,
        projects_deleted: 0,
        tasks_deleted: 0,
        subtasks_deleted: 0,
    };

    // Resolve the transfer target before opening the transaction.
    let transfer_target = match &disposition {
        BotContentDisposition::Transfer(explicit) => {
            let target_id = explicit.unwrap_or(bot.owner_id);
            let target = User::find_by_id(target_id)
                .filter(user::Column::IsActive.eq(true))
                .one(db)
                .await?
                .ok_or_else(|| {
                    Error::validation(format!("transfer target {target_id} is not an active user"))
                })?;
            Some(target)
        }
        BotContentDisposition::Delete => None,
    };

    let txn = db.begin().await?;

    let outcome = async {
        match transfer_target {
            Some(target) => {
                summary.transferred_to = Some(target.id);

                summary.projects_reassigned = Project::update_many()
                    .set(project::ActiveModel {
                        owner_id: Set(Some(target.id)),
                        ..Default::default()
                    })
                    .filter(project::Column::OwnerId.eq(bot.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;

                summary.tasks_reassigned = Task::update_many()
                    .set(task::ActiveModel {
                        owner_id: Set(Some(target.id)),
                        ..Default::default()
                    })
                    .filter(task::Column::OwnerId.eq(bot.id))
                    .exec(&txn)
                    .await?
                    .rows_affected;
            }
            None => {
                // Cascade owned projects first; tasks the bot owns inside
                // other projects go after, so they are not counted twice.
                let owned_projects: Vec<Uuid> = Project::find()
                    .filter(project::Column::OwnerId.eq(bot.id))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();

                for project_id in owned_projects {
                    let (tasks, subtasks) =
                        integrity::cascade_delete_project(&txn, project_id).await?;
                    summary.projects_deleted += 1;
                    summary.tasks_deleted += tasks;
                    summary.subtasks_deleted += subtasks;
                }

                let owned_tasks: Vec<Uuid> = Task::find()
                    .filter(task::Column::OwnerId.eq(bot.id))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();

                for task_id in owned_tasks {
                    let subtasks = integrity::cascade_delete_task(&txn, task_id).await?;
                    summary.tasks_deleted += 1;
                    summary.subtasks_deleted += subtasks;
                }
            }
        }

        Bot::delete_by_id(bot.id).exec(&txn).await?;

        activity::record(
            &txn,
            actor,
            "bot_removed",
            "bot",
            &bot.id.to_string(),
            Some(&bot.username),
            Some(json!({
                "transferredTo": summary.transferred_to.map(|id| id.to_string()),
                "projectsReassigned": summary.projects_reassigned,
                "tasksReassigned": summary.tasks_reassigned,
                "projectsDeleted": summary.projects_deleted,
                "tasksDeleted": summary.tasks_deleted,
                "subtasksDeleted": summary.subtasks_deleted,
            })),
        )
        .await?;

        Ok::<_, Error>(summary)
    }
    .await;

    match outcome {
        Ok(summary) => {
            txn.commit().await?;
            info!(username = %summary.removed_username, "bot removed");
            Ok(summary)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}
