//! Project entity: top of the project → task → subtask hierarchy

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Project UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Team the project is scoped to (always exactly one)
    pub team_id: Uuid,

    /// Project name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Lifecycle state
    pub status: ProjectStatus,

    /// Owning principal (human or bot). Null only after the unassigned
    /// fallback of account removal; never null at creation.
    pub owner_id: Option<Uuid>,

    /// Principal that created the project
    pub created_by: Uuid,

    /// When the project was created
    pub created_at: ChronoDateTimeUtc,

    /// When the project was last updated
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Project is scoped to a team
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,

    /// Tasks under the project (query-level only; the schema carries no
    /// foreign key on this edge)
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
