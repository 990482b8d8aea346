use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::EntityTrait;
use serde::Deserialize;
use std::sync::Arc;
use taskdeck_core::{
    accounts, activity, authn, bots, integrity, projects, subtasks, tasks, teams, Capability,
    Error as CoreError, PermissionSet, Principal,
};
use taskdeck_db::entities::{project, subtask, task};
use tracing::debug;
use uuid::Uuid;

use crate::middleware::SessionToken;
use crate::models::*;
use crate::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Map a core error onto the HTTP taxonomy: authentication → 401,
/// authorization → 403, validation → 400, conflicts → 409, stale ids →
/// 404, everything else → 500.
fn error_response(err: CoreError) -> HandlerError {
    let (status, code) = match &err {
        CoreError::InvalidTokenFormat
        | CoreError::InvalidOrInactiveToken
        | CoreError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::HumanRequired => (StatusCode::FORBIDDEN, "HUMAN_REQUIRED"),
        CoreError::NotTeamAdmin => (StatusCode::FORBIDDEN, "NOT_TEAM_ADMIN"),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::DuplicateTeamName(_) => (StatusCode::CONFLICT, "DUPLICATE_TEAM_NAME"),
        CoreError::AlreadyRequestedOrMember => (StatusCode::CONFLICT, "ALREADY_REQUESTED"),
        CoreError::NoTransferTargetAvailable => (StatusCode::CONFLICT, "NO_TRANSFER_TARGET"),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
        CoreError::Password(_) | CoreError::Db(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: Some(code.to_string()),
        }),
    )
}

fn bad_request(message: String) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message,
            code: Some("VALIDATION".to_string()),
        }),
    )
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, HandlerError> {
    value
        .parse()
        .map_err(|_| bad_request(format!("'{value}' is not a valid {field} id")))
}

fn parse_permissions(names: &[String]) -> Result<PermissionSet, HandlerError> {
    names
        .iter()
        .map(|name| name.parse::<Capability>().map_err(bad_request))
        .collect()
}

fn parse_task_status(value: &str) -> Result<task::TaskStatus, HandlerError> {
    match value {
        "pending" => Ok(task::TaskStatus::Pending),
        "in-progress" => Ok(task::TaskStatus::InProgress),
        "done" => Ok(task::TaskStatus::Done),
        other => Err(bad_request(format!("'{other}' is not a task status"))),
    }
}

fn parse_project_status(value: &str) -> Result<project::ProjectStatus, HandlerError> {
    match value {
        "active" => Ok(project::ProjectStatus::Active),
        "archived" => Ok(project::ProjectStatus::Archived),
        other => Err(bad_request(format!("'{other}' is not a project status"))),
    }
}

fn parse_subtask_kind(value: &str) -> Result<subtask::SubtaskKind, HandlerError> {
    match value {
        "multiple_choice" => Ok(subtask::SubtaskKind::MultipleChoice),
        "open_answer" => Ok(subtask::SubtaskKind::OpenAnswer),
        other => Err(bad_request(format!("'{other}' is not a subtask kind"))),
    }
}

// ============================================================================
// System
// ============================================================================

/// Service health check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run the orphan sweep
#[utoipa::path(
    post,
    path = "/api/maintenance/sweep",
    responses(
        (status = 200, description = "Sweep report", body = SweepResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "system"
)]
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepResponse>, HandlerError> {
    let report = integrity::sweep_orphans(&state.db)
        .await
        .map_err(error_response)?;
    Ok(Json(SweepResponse {
        orphan_tasks_deleted: report.orphan_tasks_deleted,
        orphan_subtasks_deleted: report.orphan_subtasks_deleted,
    }))
}

// ============================================================================
// Authentication
// ============================================================================

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and logged in", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, HandlerError> {
    if !state.allow_signup {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Public registration is disabled".to_string(),
                code: Some("SIGNUP_DISABLED".to_string()),
            }),
        ));
    }

    let password = body.password.clone();
    let user = accounts::register_user(
        &state.db,
        accounts::NewUser {
            username: body.username,
            email: body.email,
            password: body.password,
            full_name: body.full_name,
        },
    )
    .await
    .map_err(error_response)?;

    let outcome = authn::login(&state.db, &user.username, &password)
        .await
        .map_err(error_response)?;

    Ok(Json(LoginResponse {
        user: user.into(),
        token: outcome.session_id,
        expires_at: outcome.expires_at,
    }))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HandlerError> {
    debug!(username = %body.username, "login attempt");

    let outcome = authn::login(&state.db, &body.username, &body.password)
        .await
        .map_err(error_response)?;

    let user = taskdeck_db::entities::prelude::User::find_by_id(outcome.principal.id())
        .one(&state.db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(CoreError::Unauthenticated))?;

    Ok(Json(LoginResponse {
        user: user.into(),
        token: outcome.session_id,
        expires_at: outcome.expires_at,
    }))
}

/// Invalidate the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session dropped"),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionToken>>,
) -> Result<StatusCode, HandlerError> {
    if let Some(Extension(SessionToken(token))) = session {
        authn::logout(&state.db, &token)
            .await
            .map_err(error_response)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated principal behind this request
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Resolved principal", body = PrincipalInfo),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_current_principal(
    Extension(principal): Extension<Principal>,
) -> Json<PrincipalInfo> {
    Json(PrincipalInfo::from(&principal))
}

// ============================================================================
// Teams
// ============================================================================

/// Create a team; the creator becomes its admin
#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 200, description = "Team created", body = TeamInfo),
        (status = 409, description = "Team name taken", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateTeamRequest>,
) -> Result<Json<TeamInfo>, HandlerError> {
    let team = teams::create_team(&state.db, &principal, &body.name)
        .await
        .map_err(error_response)?;
    Ok(Json(team.into()))
}

/// File a request to join a team
#[utoipa::path(
    post,
    path = "/api/teams/{id}/requests",
    params(("id" = String, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Request filed", body = TeamRequestInfo),
        (status = 409, description = "Already requested or member", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn request_to_join(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamRequestInfo>, HandlerError> {
    let request = teams::request_to_join(&state.db, &principal, team_id)
        .await
        .map_err(error_response)?;
    Ok(Json(request.into()))
}

/// Pending join requests for a team (admin only)
#[utoipa::path(
    get,
    path = "/api/teams/{id}/requests",
    params(("id" = String, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Pending requests", body = Vec<TeamRequestInfo>),
        (status = 403, description = "Not a team admin", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn list_pending_requests(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<TeamRequestInfo>>, HandlerError> {
    let requests = teams::pending_requests(&state.db, &principal, team_id)
        .await
        .map_err(error_response)?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Approve a join request (admin only)
#[utoipa::path(
    post,
    path = "/api/team-requests/{id}/approve",
    params(("id" = String, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved", body = TeamRequestInfo),
        (status = 403, description = "Not a team admin", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<TeamRequestInfo>, HandlerError> {
    let request = teams::approve_request(&state.db, &principal, request_id)
        .await
        .map_err(error_response)?;
    Ok(Json(request.into()))
}

/// Reject a join request (admin only)
#[utoipa::path(
    post,
    path = "/api/team-requests/{id}/reject",
    params(("id" = String, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request rejected", body = TeamRequestInfo),
        (status = 403, description = "Not a team admin", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<TeamRequestInfo>, HandlerError> {
    let request = teams::reject_request(&state.db, &principal, request_id)
        .await
        .map_err(error_response)?;
    Ok(Json(request.into()))
}

/// Members of a team
#[utoipa::path(
    get,
    path = "/api/teams/{id}/members",
    params(("id" = String, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team members", body = Vec<UserInfo>)
    ),
    tag = "teams"
)]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<UserInfo>>, HandlerError> {
    let members = teams::members(&state.db, team_id)
        .await
        .map_err(error_response)?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// Remove a member from the team (admin only)
#[utoipa::path(
    delete,
    path = "/api/teams/{id}/members/{user_id}",
    params(
        ("id" = String, Path, description = "Team ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = UserInfo),
        (status = 403, description = "Not a team admin", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((_team_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<UserInfo>, HandlerError> {
    let user = teams::remove_user_from_team(&state.db, &principal, user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(user.into()))
}

// ============================================================================
// Projects
// ============================================================================

/// Projects in the principal's team
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Projects", body = Vec<ProjectInfo>)
    ),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ProjectInfo>>, HandlerError> {
    let projects = projects::list_projects(&state.db, &principal)
        .await
        .map_err(error_response)?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

/// Create a project
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = ProjectInfo),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectInfo>, HandlerError> {
    let project = projects::create_project(
        &state.db,
        &principal,
        projects::NewProject {
            name: body.name,
            description: body.description,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(project.into()))
}

/// Get a project by id
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = ProjectInfo),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectInfo>, HandlerError> {
    let project = projects::get_project(&state.db, &principal, project_id)
        .await
        .map_err(error_response)?;
    Ok(Json(project.into()))
}

/// Update or archive a project
#[utoipa::path(
    patch,
    path = "/api/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectInfo),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectInfo>, HandlerError> {
    let status = body.status.as_deref().map(parse_project_status).transpose()?;
    let project = projects::update_project(
        &state.db,
        &principal,
        project_id,
        projects::ProjectChanges {
            name: body.name,
            description: body.description.map(Some),
            status,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(project.into()))
}

/// Cascade-delete a project with everything under it
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deletion summary", body = ProjectDeletionResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectDeletionResponse>, HandlerError> {
    let deletion = projects::delete_project(&state.db, &principal, project_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ProjectDeletionResponse {
        id: deletion.id.to_string(),
        deleted: deletion.deleted,
        tasks_deleted: deletion.tasks_deleted,
        subtasks_deleted: deletion.subtasks_deleted,
    }))
}

// ============================================================================
// Tasks
// ============================================================================

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub project_id: Option<Uuid>,
}

/// Tasks in the principal's team, optionally narrowed to one project
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(("projectId" = Option<String>, Query, description = "Filter by project")),
    responses(
        (status = 200, description = "Tasks", body = Vec<TaskInfo>)
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskInfo>>, HandlerError> {
    let tasks = tasks::list_tasks(&state.db, &principal, query.project_id)
        .await
        .map_err(error_response)?;
    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}

/// Create a task under a live project
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 200, description = "Task created", body = TaskInfo),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<TaskInfo>, HandlerError> {
    let project_id = parse_uuid(&body.project_id, "project")?;
    let assigned_to = body
        .assigned_to
        .as_deref()
        .map(|value| parse_uuid(value, "user"))
        .transpose()?;

    let task = tasks::create_task(
        &state.db,
        &principal,
        tasks::NewTask {
            project_id,
            title: body.title,
            description: body.description,
            assigned_to,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(task.into()))
}

/// Get a task by id
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task", body = TaskInfo),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskInfo>, HandlerError> {
    let task = tasks::get_task(&state.db, &principal, task_id)
        .await
        .map_err(error_response)?;
    Ok(Json(task.into()))
}

/// Update a task (fields, status, assignment)
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskInfo),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskInfo>, HandlerError> {
    let status = body.status.as_deref().map(parse_task_status).transpose()?;
    let assigned_to = match body.assigned_to {
        None => None,
        Some(None) => Some(None),
        Some(Some(value)) => Some(Some(parse_uuid(&value, "user")?)),
    };

    let task = tasks::update_task(
        &state.db,
        &principal,
        task_id,
        tasks::TaskChanges {
            title: body.title,
            description: body.description.map(Some),
            status,
            assigned_to,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(task.into()))
}

/// Cascade-delete a task and its subtasks
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Deletion summary", body = TaskDeletionResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskDeletionResponse>, HandlerError> {
    let deletion = tasks::delete_task(&state.db, &principal, task_id)
        .await
        .map_err(error_response)?;
    Ok(Json(TaskDeletionResponse {
        id: deletion.id.to_string(),
        deleted: deletion.deleted,
        subtasks_deleted: deletion.subtasks_deleted,
    }))
}

// ============================================================================
// Subtasks
// ============================================================================

/// Subtasks of a task
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/subtasks",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Subtasks", body = Vec<SubtaskInfo>)
    ),
    tag = "subtasks"
)]
pub async fn list_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<SubtaskInfo>>, HandlerError> {
    let subtasks = subtasks::list_subtasks(&state.db, &principal, task_id)
        .await
        .map_err(error_response)?;
    Ok(Json(subtasks.into_iter().map(Into::into).collect()))
}

/// Create a subtask under a task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/subtasks",
    params(("id" = String, Path, description = "Task ID")),
    request_body = CreateSubtaskRequest,
    responses(
        (status = 200, description = "Subtask created", body = SubtaskInfo),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "subtasks"
)]
pub async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<CreateSubtaskRequest>,
) -> Result<Json<SubtaskInfo>, HandlerError> {
    let kind = parse_subtask_kind(&body.kind)?;
    let assigned_to = body
        .assigned_to
        .as_deref()
        .map(|value| parse_uuid(value, "user"))
        .transpose()?;

    let subtask = subtasks::create_subtask(
        &state.db,
        &principal,
        subtasks::NewSubtask {
            task_id,
            kind,
            prompt: body.prompt,
            options: body.options,
            assigned_to,
        },
    )
    .await
    .map_err(error_response)?;
    Ok(Json(subtask.into()))
}

/// Answer a subtask
#[utoipa::path(
    post,
    path = "/api/subtasks/{id}/answer",
    params(("id" = String, Path, description = "Subtask ID")),
    request_body = AnswerSubtaskRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubtaskInfo),
        (status = 400, description = "Answer not among options", body = ErrorResponse)
    ),
    tag = "subtasks"
)]
pub async fn answer_subtask(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(subtask_id): Path<Uuid>,
    Json(body): Json<AnswerSubtaskRequest>,
) -> Result<Json<SubtaskInfo>, HandlerError> {
    let subtask = subtasks::answer_subtask(&state.db, &principal, subtask_id, &body.answer)
        .await
        .map_err(error_response)?;
    Ok(Json(subtask.into()))
}

/// Assign or unassign a subtask
#[utoipa::path(
    post,
    path = "/api/subtasks/{id}/assign",
    params(("id" = String, Path, description = "Subtask ID")),
    request_body = AssignSubtaskRequest,
    responses(
        (status = 200, description = "Assignment updated", body = SubtaskInfo)
    ),
    tag = "subtasks"
)]
pub async fn assign_subtask(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(subtask_id): Path<Uuid>,
    Json(body): Json<AssignSubtaskRequest>,
) -> Result<Json<SubtaskInfo>, HandlerError> {
    let assignee = body
        .assigned_to
        .as_deref()
        .map(|value| parse_uuid(value, "user"))
        .transpose()?;

    let subtask = subtasks::assign_subtask(&state.db, &principal, subtask_id, assignee)
        .await
        .map_err(error_response)?;
    Ok(Json(subtask.into()))
}

/// Delete a subtask
#[utoipa::path(
    delete,
    path = "/api/subtasks/{id}",
    params(("id" = String, Path, description = "Subtask ID")),
    responses(
        (status = 204, description = "Subtask deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "subtasks"
)]
pub async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(subtask_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    subtasks::delete_subtask(&state.db, &principal, subtask_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Bots
// ============================================================================

/// Bots owned by the current user
#[utoipa::path(
    get,
    path = "/api/bots",
    responses(
        (status = 200, description = "Bots", body = Vec<BotInfo>)
    ),
    tag = "bots"
)]
pub async fn list_bots(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<BotInfo>>, HandlerError> {
    let bots = bots::list_bots(&state.db, &principal)
        .await
        .map_err(error_response)?;
    Ok(Json(bots.into_iter().map(Into::into).collect()))
}

/// Create a bot; the token in the response is shown only once
#[utoipa::path(
    post,
    path = "/api/bots",
    request_body = CreateBotRequest,
    responses(
        (status = 200, description = "Bot created", body = CreateBotResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "bots"
)]
pub async fn create_bot(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateBotRequest>,
) -> Result<Json<CreateBotResponse>, HandlerError> {
    let permissions = parse_permissions(&body.permissions)?;

    let created = bots::create_bot(
        &state.db,
        &principal,
        bots::NewBot {
            username: body.username,
            permissions,
        },
    )
    .await
    .map_err(error_response)?;

    Ok(Json(CreateBotResponse {
        bot: created.bot.into(),
        token: created.token,
    }))
}

/// Update a bot's permissions or active flag
#[utoipa::path(
    patch,
    path = "/api/bots/{id}",
    params(("id" = String, Path, description = "Bot ID")),
    request_body = UpdateBotRequest,
    responses(
        (status = 200, description = "Bot updated", body = BotInfo),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "bots"
)]
pub async fn update_bot(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(bot_id): Path<Uuid>,
    Json(body): Json<UpdateBotRequest>,
) -> Result<Json<BotInfo>, HandlerError> {
    let mut updated = None;

    if let Some(names) = &body.permissions {
        let permissions = parse_permissions(names)?;
        updated = Some(
            bots::update_permissions(&state.db, &principal, bot_id, permissions)
                .await
                .map_err(error_response)?,
        );
    }

    if let Some(is_active) = body.is_active {
        updated = Some(
            bots::set_active(&state.db, &principal, bot_id, is_active)
                .await
                .map_err(error_response)?,
        );
    }

    let bot = match updated {
        Some(bot) => bot,
        None => return Err(bad_request("nothing to update".to_string())),
    };
    Ok(Json(bot.into()))
}

/// Query parameters for removing a bot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBotQuery {
    /// Cascade-delete bot-owned content instead of transferring it
    #[serde(default)]
    pub delete_content: bool,
    /// Transfer target; defaults to the bot's owner
    pub transfer_to: Option<Uuid>,
}

/// Remove a bot, transferring or deleting its content
#[utoipa::path(
    delete,
    path = "/api/bots/{id}",
    params(
        ("id" = String, Path, description = "Bot ID"),
        ("deleteContent" = Option<bool>, Query, description = "Cascade-delete owned content"),
        ("transferTo" = Option<String>, Query, description = "Transfer target user id")
    ),
    responses(
        (status = 200, description = "Removal summary", body = BotRemovalResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "bots"
)]
pub async fn remove_bot(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(bot_id): Path<Uuid>,
    Query(query): Query<RemoveBotQuery>,
) -> Result<Json<BotRemovalResponse>, HandlerError> {
    let disposition = if query.delete_content {
        accounts::BotContentDisposition::Delete
    } else {
        accounts::BotContentDisposition::Transfer(query.transfer_to)
    };

    let summary = accounts::remove_bot(&state.db, Some(&principal), bot_id, disposition)
        .await
        .map_err(error_response)?;

    Ok(Json(BotRemovalResponse {
        removed_id: summary.removed_id.to_string(),
        transferred_to: summary.transferred_to.map(|id| id.to_string()),
        projects_reassigned: summary.projects_reassigned,
        tasks_reassigned: summary.tasks_reassigned,
        projects_deleted: summary.projects_deleted,
        tasks_deleted: summary.tasks_deleted,
        subtasks_deleted: summary.subtasks_deleted,
    }))
}

// ============================================================================
// Accounts
// ============================================================================

/// Query parameters for removing a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserQuery {
    /// Explicit transfer target for owned content
    pub transfer_to: Option<Uuid>,
}

/// Remove a user account, transferring everything it owns
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = String, Path, description = "User ID"),
        ("transferTo" = Option<String>, Query, description = "Transfer target user id")
    ),
    responses(
        (status = 200, description = "Removal summary", body = RemovalResponse),
        (status = 409, description = "No transfer target available", body = ErrorResponse)
    ),
    tag = "accounts"
)]
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<RemoveUserQuery>,
) -> Result<Json<RemovalResponse>, HandlerError> {
    let summary = accounts::remove_user(&state.db, Some(&principal), user_id, query.transfer_to)
        .await
        .map_err(error_response)?;

    Ok(Json(RemovalResponse {
        removed_id: summary.removed_id.to_string(),
        transferred_to: summary.transferred_to.map(|id| id.to_string()),
        projects_reassigned: summary.projects_reassigned,
        tasks_reassigned: summary.tasks_reassigned,
        task_assignments_updated: summary.task_assignments_updated,
        subtask_assignments_updated: summary.subtask_assignments_updated,
    }))
}

// ============================================================================
// Activity
// ============================================================================

/// Query parameters for the recent activity feed
#[derive(Debug, Deserialize)]
pub struct RecentActivityQuery {
    pub limit: Option<u64>,
}

/// The most recent activity entries, newest first
#[utoipa::path(
    get,
    path = "/api/activity",
    params(("limit" = Option<u64>, Query, description = "Max entries (default 50)")),
    responses(
        (status = 200, description = "Activity entries", body = Vec<ActivityEntry>)
    ),
    tag = "activity"
)]
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, HandlerError> {
    let entries = activity::recent(&state.db, query.limit.unwrap_or(50))
        .await
        .map_err(error_response)?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Query parameters for time-bounded activity feeds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinceQuery {
    /// RFC 3339 timestamp; defaults to the beginning of time
    pub since: Option<DateTime<Utc>>,
    /// Skip the requesting principal's own entries
    #[serde(default)]
    pub exclude_self: bool,
}

/// Everything that changed since a timestamp
#[utoipa::path(
    get,
    path = "/api/activity/updates",
    params(
        ("since" = Option<String>, Query, description = "RFC 3339 timestamp"),
        ("excludeSelf" = Option<bool>, Query, description = "Skip own entries")
    ),
    responses(
        (status = 200, description = "Activity entries", body = Vec<ActivityEntry>)
    ),
    tag = "activity"
)]
pub async fn activity_updates(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<ActivityEntry>>, HandlerError> {
    let since = query.since.unwrap_or(DateTime::UNIX_EPOCH);
    let exclude = query.exclude_self.then(|| principal.id());

    let entries = activity::all_since(&state.db, since, exclude)
        .await
        .map_err(error_response)?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Activity relevant to the current user's assignments
#[utoipa::path(
    get,
    path = "/api/activity/feed",
    params(("since" = Option<String>, Query, description = "RFC 3339 timestamp")),
    responses(
        (status = 200, description = "Activity entries", body = Vec<ActivityEntry>),
        (status = 403, description = "Humans only", body = ErrorResponse)
    ),
    tag = "activity"
)]
pub async fn assigned_activity(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<ActivityEntry>>, HandlerError> {
    if !principal.is_human() {
        return Err(error_response(CoreError::HumanRequired));
    }

    let since = query.since.unwrap_or(DateTime::UNIX_EPOCH);
    let entries = activity::assigned_to_user(&state.db, principal.id(), since)
        .await
        .map_err(error_response)?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
