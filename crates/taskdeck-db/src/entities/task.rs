//! Task entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Task lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[sea_orm(string_value = "pending")]
    Pending,

    #[sea_orm(string_value = "in-progress")]
    InProgress,

    #[sea_orm(string_value = "done")]
    Done,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    /// Task UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Team the task is scoped to (inherited from its project)
    pub team_id: Uuid,

    /// Parent project. Must reference a live project at creation; the
    /// schema does not enforce it afterwards — the integrity sweep does.
    pub project_id: Uuid,

    /// Task title
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Lifecycle state
    pub status: TaskStatus,

    /// Owning principal (human or bot); null only via unassigned fallback
    pub owner_id: Option<Uuid>,

    /// Human currently working the task, if any
    pub assigned_to: Option<Uuid>,

    /// Set exactly when status enters `done`, cleared exactly when it leaves
    pub completed_at: Option<ChronoDateTimeUtc>,

    /// Principal that created the task
    pub created_by: Uuid,

    /// When the task was created
    pub created_at: ChronoDateTimeUtc,

    /// When the task was last updated
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent project (query-level; no schema foreign key)
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    /// Subtasks under the task (query-level; no schema foreign key)
    #[sea_orm(has_many = "super::subtask::Entity")]
    Subtasks,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::subtask::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subtasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
