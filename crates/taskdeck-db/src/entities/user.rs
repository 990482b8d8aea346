//! User entity: human accounts

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// User UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login name (unique)
    #[sea_orm(unique)]
    pub username: String,

    /// User email (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// User's full name (optional)
    pub full_name: Option<String>,

    /// Team the user belongs to, if any (a user belongs to at most one team)
    pub team_id: Option<Uuid>,

    /// Whether the user administers their team
    pub is_team_admin: bool,

    /// Whether the account is active
    pub is_active: bool,

    /// When the user last logged in
    pub last_login: Option<ChronoDateTimeUtc>,

    /// When the account was created
    pub created_at: ChronoDateTimeUtc,

    /// When the account was last updated
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// User's login sessions
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,

    /// Bots owned by this user
    #[sea_orm(has_many = "super::bot::Entity")]
    Bots,

    /// Join requests filed by this user
    #[sea_orm(has_many = "super::team_request::Entity")]
    TeamRequests,

    /// Team the user belongs to
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::bot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bots.def()
    }
}

impl Related<super::team_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamRequests.def()
    }
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
