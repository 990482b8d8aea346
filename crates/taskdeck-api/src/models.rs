//! Wire models for the HTTP boundary
//!
//! Field names follow the original wire contract (camelCase, flat
//! key-value structures). Conversions from the entity models live here so
//! handlers stay thin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use taskdeck_core::Principal;
use taskdeck_db::entities::{
    activity_log, bot, project, subtask, task, team, team_request, user,
};
use utoipa::ToSchema;

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============================================================================
// Authentication
// ============================================================================

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login name (must be unique)
    pub username: String,
    /// Email address (must be unique)
    pub email: String,
    /// Password (minimum 8 characters)
    pub password: String,
    /// Full name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserInfo,
    /// Opaque session token, also usable as a `taskdeck_session` cookie
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The resolved identity behind a request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalInfo {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// `human` or `bot`
    pub user_type: String,
    /// Capability names; humans hold every capability
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Owning user id, bots only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl From<&Principal> for PrincipalInfo {
    fn from(principal: &Principal) -> Self {
        let user_type = match principal {
            Principal::Human(_) => "human",
            Principal::Bot(_) => "bot",
        };
        let owner_id = match principal {
            Principal::Bot(bot) => Some(bot.owner_id.to_string()),
            Principal::Human(_) => None,
        };
        Self {
            id: principal.id().to_string(),
            username: principal.username().to_string(),
            full_name: match principal {
                Principal::Human(h) => h.full_name.clone(),
                Principal::Bot(_) => None,
            },
            user_type: user_type.to_string(),
            permissions: principal
                .effective_permissions()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            team_id: principal.effective_team_id().map(|id| id.to_string()),
            owner_id,
        }
    }
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub is_team_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserInfo {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            team_id: user.team_id.map(|id| id.to_string()),
            is_team_admin: user.is_team_admin,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// Teams
// ============================================================================

/// Request to create a team
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTeamRequest {
    /// Team name (globally unique)
    pub name: String,
}

/// Team information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<team::Model> for TeamInfo {
    fn from(team: team::Model) -> Self {
        Self {
            id: team.id.to_string(),
            name: team.name,
            created_by: team.created_by.to_string(),
            created_at: team.created_at,
        }
    }
}

/// Join request information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequestInfo {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    /// `pending`, `approved` or `rejected`
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<team_request::Model> for TeamRequestInfo {
    fn from(request: team_request::Model) -> Self {
        let status = match request.status {
            team_request::RequestStatus::Pending => "pending",
            team_request::RequestStatus::Approved => "approved",
            team_request::RequestStatus::Rejected => "rejected",
        };
        Self {
            id: request.id.to_string(),
            team_id: request.team_id.to_string(),
            user_id: request.user_id.to_string(),
            status: status.to_string(),
            created_at: request.created_at,
            resolved_at: request.resolved_at,
        }
    }
}

// ============================================================================
// Projects, tasks, subtasks
// ============================================================================

/// Request to create a project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request to update a project
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `active` or `archived`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Project information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: String,
    pub team_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<project::Model> for ProjectInfo {
    fn from(project: project::Model) -> Self {
        let status = match project.status {
            project::ProjectStatus::Active => "active",
            project::ProjectStatus::Archived => "archived",
        };
        Self {
            id: project.id.to_string(),
            team_id: project.team_id.to_string(),
            name: project.name,
            description: project.description,
            status: status.to_string(),
            owner_id: project.owner_id.map(|id| id.to_string()),
            created_by: project.created_by.to_string(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Summary returned after deleting a project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeletionResponse {
    pub id: String,
    pub deleted: bool,
    pub tasks_deleted: u64,
    pub subtasks_deleted: u64,
}

/// Summary returned after deleting a task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeletionResponse {
    pub id: String,
    pub deleted: bool,
    pub subtasks_deleted: u64,
}

/// Request to create a task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Distinguish "field absent" from "field present and null": a present
/// null deserializes to `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Request to update a task. `assignedTo` accepts an explicit null to
/// clear the assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `pending`, `in-progress` or `done`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Present-and-null clears the assignment
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<Option<String>>,
}

/// Task information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub id: String,
    pub team_id: String,
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<task::Model> for TaskInfo {
    fn from(task: task::Model) -> Self {
        let status = match task.status {
            task::TaskStatus::Pending => "pending",
            task::TaskStatus::InProgress => "in-progress",
            task::TaskStatus::Done => "done",
        };
        Self {
            id: task.id.to_string(),
            team_id: task.team_id.to_string(),
            project_id: task.project_id.to_string(),
            title: task.title,
            description: task.description,
            status: status.to_string(),
            owner_id: task.owner_id.map(|id| id.to_string()),
            assigned_to: task.assigned_to.map(|id| id.to_string()),
            completed_at: task.completed_at,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Request to create a subtask
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubtaskRequest {
    /// `multiple_choice` or `open_answer`
    pub kind: String,
    pub prompt: String,
    /// Required (non-empty) for multiple_choice
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Request to answer a subtask
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerSubtaskRequest {
    pub answer: String,
}

/// Request to assign a subtask; null clears the assignment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignSubtaskRequest {
    pub assigned_to: Option<String>,
}

/// Subtask information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskInfo {
    pub id: String,
    pub task_id: String,
    pub kind: String,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    pub answered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<subtask::Model> for SubtaskInfo {
    fn from(subtask: subtask::Model) -> Self {
        let kind = match subtask.kind {
            subtask::SubtaskKind::MultipleChoice => "multiple_choice",
            subtask::SubtaskKind::OpenAnswer => "open_answer",
        };
        Self {
            id: subtask.id.to_string(),
            task_id: subtask.task_id.to_string(),
            kind: kind.to_string(),
            prompt: subtask.prompt,
            options: subtask.options.0,
            selected_option: subtask.selected_option,
            answered: subtask.answered,
            assigned_to: subtask.assigned_to.map(|id| id.to_string()),
            created_at: subtask.created_at,
        }
    }
}

// ============================================================================
// Bots
// ============================================================================

/// Request to create a bot
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBotRequest {
    /// Bot name (must be unique)
    pub username: String,
    /// Capability names, e.g. `["read", "create_tasks"]`
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Response after creating a bot; the token is shown only once
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBotResponse {
    pub bot: BotInfo,
    /// The `bot_<hex>` API token (SHOWN ONLY ONCE!)
    pub token: String,
}

/// Request to update a bot
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Bot information (without the token)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BotInfo {
    pub id: String,
    pub username: String,
    pub owner_id: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<bot::Model> for BotInfo {
    fn from(bot: bot::Model) -> Self {
        Self {
            id: bot.id.to_string(),
            username: bot.username,
            owner_id: bot.owner_id.to_string(),
            permissions: bot.permissions.iter().map(|c| c.to_string()).collect(),
            is_active: bot.is_active,
            last_used_at: bot.last_used_at,
            created_at: bot.created_at,
        }
    }
}

// ============================================================================
// Accounts, activity, maintenance
// ============================================================================

/// Summary returned after removing a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    pub removed_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_to: Option<String>,
    pub projects_reassigned: u64,
    pub tasks_reassigned: u64,
    pub task_assignments_updated: u64,
    pub subtask_assignments_updated: u64,
}

/// Summary returned after removing a bot
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BotRemovalResponse {
    pub removed_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_to: Option<String>,
    pub projects_reassigned: u64,
    pub tasks_reassigned: u64,
    pub projects_deleted: u64,
    pub tasks_deleted: u64,
    pub subtasks_deleted: u64,
}

/// One activity log entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// `human` or `bot`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<String>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<activity_log::Model> for ActivityEntry {
    fn from(entry: activity_log::Model) -> Self {
        let actor_type = entry.actor_kind.map(|kind| {
            match kind {
                activity_log::ActorKind::Human => "human",
                activity_log::ActorKind::Bot => "bot",
            }
            .to_string()
        });
        Self {
            id: entry.id,
            actor_id: entry.actor_id.map(|id| id.to_string()),
            actor_type,
            action_type: entry.action,
            entity_type: entry.entity_kind,
            entity_id: entry.entity_id,
            entity_name: entry.entity_name,
            details: entry.details,
            created_at: entry.created_at,
        }
    }
}

/// Orphan sweep report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub orphan_tasks_deleted: u64,
    pub orphan_subtasks_deleted: u64,
}
