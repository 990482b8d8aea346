//! ActivityLog entity: append-only audit trail of every mutation
//!
//! Rows are never updated or deleted by normal operation; bulk cleanup
//! removes expired sessions, never log entries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which kind of principal performed an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    #[sea_orm(string_value = "human")]
    Human,

    #[sea_orm(string_value = "bot")]
    Bot,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_log")]
pub struct Model {
    /// Monotonic entry id; newest-first reads order by this descending
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Acting principal, absent for system-initiated repairs
    pub actor_id: Option<Uuid>,

    /// Kind of the acting principal
    pub actor_kind: Option<ActorKind>,

    /// What happened, e.g. `task_updated`, `project_deleted`
    pub action: String,

    /// Kind of the affected record: `project`, `task`, `subtask`, ...
    pub entity_kind: String,

    /// Id of the affected record
    pub entity_id: String,

    /// Human-readable name of the affected record at mutation time
    pub entity_name: Option<String>,

    /// Action-specific payload, e.g. `{"changes": ..., "oldStatus": ...}`
    pub details: Option<Json>,

    /// When the entry was appended
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
