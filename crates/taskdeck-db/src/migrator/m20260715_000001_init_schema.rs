//! Consolidated initial schema migration
//!
//! `tasks.project_id` and `subtasks.task_id` deliberately carry no foreign
//! key: the store must be able to represent orphans so the integrity engine
//! owns cascade deletion and repair.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create users table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Username, 255).not_null().unique_key())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len_null(User::FullName, 255))
                    .col(uuid_null(User::TeamId))
                    .col(boolean(User::IsTeamAdmin).not_null().default(false))
                    .col(boolean(User::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone_null(User::LastLogin))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_team_id")
                    .table(User::Table)
                    .col(User::TeamId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create teams table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(uuid(Team::Id).primary_key())
                    .col(string_len(Team::Name, 255).not_null().unique_key())
                    .col(uuid(Team::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Team::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Team::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. Create sessions table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(string_len(Session::Id, 128).not_null().primary_key())
                    .col(uuid(Session::UserId).not_null())
                    .col(timestamp_with_time_zone(Session::ExpiresAt).not_null())
                    .col(
                        timestamp_with_time_zone(Session::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_user_id")
                            .from(Session::Table, Session::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_user_id")
                    .table(Session::Table)
                    .col(Session::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_expires_at")
                    .table(Session::Table)
                    .col(Session::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. Create team_requests table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(TeamRequest::Table)
                    .if_not_exists()
                    .col(uuid(TeamRequest::Id).primary_key())
                    .col(uuid(TeamRequest::TeamId).not_null())
                    .col(uuid(TeamRequest::UserId).not_null())
                    .col(
                        string_len(TeamRequest::Status, 32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        timestamp_with_time_zone(TeamRequest::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(TeamRequest::ResolvedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_requests_team_id")
                            .from(TeamRequest::Table, TeamRequest::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_requests_user_id")
                            .from(TeamRequest::Table, TeamRequest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_team_requests_team_user")
                    .table(TeamRequest::Table)
                    .col(TeamRequest::TeamId)
                    .col(TeamRequest::UserId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 5. Create bots table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Bot::Table)
                    .if_not_exists()
                    .col(uuid(Bot::Id).primary_key())
                    .col(string_len(Bot::Username, 255).not_null().unique_key())
                    .col(string_len(Bot::ApiToken, 128).not_null().unique_key())
                    .col(uuid(Bot::OwnerId).not_null())
                    .col(json(Bot::Permissions).not_null())
                    .col(boolean(Bot::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone_null(Bot::LastUsedAt))
                    .col(
                        timestamp_with_time_zone(Bot::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bots_owner_id")
                            .from(Bot::Table, Bot::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bots_api_token")
                    .table(Bot::Table)
                    .col(Bot::ApiToken)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bots_owner_id")
                    .table(Bot::Table)
                    .col(Bot::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 6. Create projects table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(uuid(Project::Id).primary_key())
                    .col(uuid(Project::TeamId).not_null())
                    .col(string_len(Project::Name, 255).not_null())
                    .col(text_null(Project::Description))
                    .col(
                        string_len(Project::Status, 32)
                            .not_null()
                            .default("active"),
                    )
                    .col(uuid_null(Project::OwnerId))
                    .col(uuid(Project::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Project::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Project::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_team_id")
                            .from(Project::Table, Project::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_team_id")
                    .table(Project::Table)
                    .col(Project::TeamId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_owner_id")
                    .table(Project::Table)
                    .col(Project::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 7. Create tasks table (no FK to projects on purpose)
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(uuid(Task::Id).primary_key())
                    .col(uuid(Task::TeamId).not_null())
                    .col(uuid(Task::ProjectId).not_null())
                    .col(string_len(Task::Title, 255).not_null())
                    .col(text_null(Task::Description))
                    .col(string_len(Task::Status, 32).not_null().default("pending"))
                    .col(uuid_null(Task::OwnerId))
                    .col(uuid_null(Task::AssignedTo))
                    .col(timestamp_with_time_zone_null(Task::CompletedAt))
                    .col(uuid(Task::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Task::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Task::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_project_id")
                    .table(Task::Table)
                    .col(Task::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_team_id")
                    .table(Task::Table)
                    .col(Task::TeamId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_assigned_to")
                    .table(Task::Table)
                    .col(Task::AssignedTo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_owner_id")
                    .table(Task::Table)
                    .col(Task::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 8. Create subtasks table (no FK to tasks on purpose)
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Subtask::Table)
                    .if_not_exists()
                    .col(uuid(Subtask::Id).primary_key())
                    .col(uuid(Subtask::TaskId).not_null())
                    .col(string_len(Subtask::Kind, 32).not_null())
                    .col(text(Subtask::Prompt).not_null())
                    .col(json(Subtask::Options).not_null())
                    .col(string_len_null(Subtask::SelectedOption, 255))
                    .col(boolean(Subtask::Answered).not_null().default(false))
                    .col(uuid_null(Subtask::AssignedTo))
                    .col(
                        timestamp_with_time_zone(Subtask::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Subtask::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subtasks_task_id")
                    .table(Subtask::Table)
                    .col(Subtask::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subtasks_assigned_to")
                    .table(Subtask::Table)
                    .col(Subtask::AssignedTo)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 9. Create activity_log table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(ActivityLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityLog::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(uuid_null(ActivityLog::ActorId))
                    .col(string_len_null(ActivityLog::ActorKind, 16))
                    .col(string_len(ActivityLog::Action, 64).not_null())
                    .col(string_len(ActivityLog::EntityKind, 32).not_null())
                    .col(string_len(ActivityLog::EntityId, 64).not_null())
                    .col(string_len_null(ActivityLog::EntityName, 255))
                    .col(json_null(ActivityLog::Details))
                    .col(
                        timestamp_with_time_zone(ActivityLog::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_log_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_log_actor_id")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::ActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_log_entity")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::EntityKind)
                    .col(ActivityLog::EntityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order (respecting foreign keys)
        manager
            .drop_table(Table::drop().table(ActivityLog::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Subtask::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Bot::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TeamRequest::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Session::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Team::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

// ============================================================
// Table identifiers
// ============================================================

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FullName,
    TeamId,
    IsTeamAdmin,
    IsActive,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Session {
    #[sea_orm(iden = "sessions")]
    Table,
    Id,
    UserId,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Team {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    Name,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TeamRequest {
    #[sea_orm(iden = "team_requests")]
    Table,
    Id,
    TeamId,
    UserId,
    Status,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum Bot {
    #[sea_orm(iden = "bots")]
    Table,
    Id,
    Username,
    ApiToken,
    OwnerId,
    Permissions,
    IsActive,
    LastUsedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Project {
    #[sea_orm(iden = "projects")]
    Table,
    Id,
    TeamId,
    Name,
    Description,
    Status,
    OwnerId,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Task {
    #[sea_orm(iden = "tasks")]
    Table,
    Id,
    TeamId,
    ProjectId,
    Title,
    Description,
    Status,
    OwnerId,
    AssignedTo,
    CompletedAt,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subtask {
    #[sea_orm(iden = "subtasks")]
    Table,
    Id,
    TaskId,
    Kind,
    Prompt,
    Options,
    SelectedOption,
    Answered,
    AssignedTo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ActivityLog {
    #[sea_orm(iden = "activity_log")]
    Table,
    Id,
    ActorId,
    ActorKind,
    Action,
    EntityKind,
    EntityId,
    EntityName,
    Details,
    CreatedAt,
}
