//! Subtask entity

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Kind of answer a subtask expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum SubtaskKind {
    /// Answer must be one of the stored options (≥1 required)
    #[sea_orm(string_value = "multiple_choice")]
    MultipleChoice,

    /// Free-text answer
    #[sea_orm(string_value = "open_answer")]
    OpenAnswer,
}

/// Candidate answers for a multiple-choice subtask, stored as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct OptionList(pub Vec<String>);

impl OptionList {
    pub fn contains(&self, option: &str) -> bool {
        self.0.iter().any(|o| o == option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subtasks")]
pub struct Model {
    /// Subtask UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Parent task. Must reference a live task at creation; the schema does
    /// not enforce it afterwards — the integrity sweep does.
    pub task_id: Uuid,

    /// Kind of answer expected
    pub kind: SubtaskKind,

    /// The question or instruction
    pub prompt: String,

    /// Candidate answers; non-empty iff kind is multiple_choice
    #[sea_orm(column_type = "Json")]
    pub options: OptionList,

    /// Chosen answer; for multiple_choice always one of `options`
    pub selected_option: Option<String>,

    /// True iff `selected_option` is set
    pub answered: bool,

    /// Human currently working the subtask, if any
    pub assigned_to: Option<Uuid>,

    /// When the subtask was created
    pub created_at: ChronoDateTimeUtc,

    /// When the subtask was last updated
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent task (query-level; no schema foreign key)
    #[sea_orm(
        belongs_to = "super::task::Entity",
        from = "Column::TaskId",
        to = "super::task::Column::Id"
    )]
    Task,
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
