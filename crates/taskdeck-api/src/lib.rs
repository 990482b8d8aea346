pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub allow_signup: bool,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskdeck API",
        version = "0.1.0",
        description = "REST API for the taskdeck multi-tenant task tracker",
        contact(
            name = "Taskdeck Team",
            email = "team@taskdeck.io"
        )
    ),
    paths(
        handlers::health_check,
        handlers::run_sweep,
        handlers::register,
        handlers::login,
        handlers::logout,
        handlers::get_current_principal,
        handlers::create_team,
        handlers::request_to_join,
        handlers::list_pending_requests,
        handlers::approve_request,
        handlers::reject_request,
        handlers::list_members,
        handlers::remove_member,
        handlers::list_projects,
        handlers::create_project,
        handlers::get_project,
        handlers::update_project,
        handlers::delete_project,
        handlers::list_tasks,
        handlers::create_task,
        handlers::get_task,
        handlers::update_task,
        handlers::delete_task,
        handlers::list_subtasks,
        handlers::create_subtask,
        handlers::answer_subtask,
        handlers::assign_subtask,
        handlers::delete_subtask,
        handlers::list_bots,
        handlers::create_bot,
        handlers::update_bot,
        handlers::remove_bot,
        handlers::remove_user,
        handlers::recent_activity,
        handlers::activity_updates,
        handlers::assigned_activity,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::HealthResponse,
            models::RegisterRequest,
            models::LoginRequest,
            models::LoginResponse,
            models::PrincipalInfo,
            models::UserInfo,
            models::CreateTeamRequest,
            models::TeamInfo,
            models::TeamRequestInfo,
            models::CreateProjectRequest,
            models::UpdateProjectRequest,
            models::ProjectInfo,
            models::ProjectDeletionResponse,
            models::CreateTaskRequest,
            models::UpdateTaskRequest,
            models::TaskInfo,
            models::TaskDeletionResponse,
            models::CreateSubtaskRequest,
            models::AnswerSubtaskRequest,
            models::AssignSubtaskRequest,
            models::SubtaskInfo,
            models::CreateBotRequest,
            models::CreateBotResponse,
            models::UpdateBotRequest,
            models::BotInfo,
            models::RemovalResponse,
            models::BotRemovalResponse,
            models::ActivityEntry,
            models::SweepResponse,
        )
    ),
    tags(
        (name = "auth", description = "Authentication and session endpoints"),
        (name = "teams", description = "Team and membership endpoints"),
        (name = "projects", description = "Project endpoints"),
        (name = "tasks", description = "Task endpoints"),
        (name = "subtasks", description = "Subtask endpoints"),
        (name = "bots", description = "Bot management endpoints"),
        (name = "accounts", description = "Account lifecycle endpoints"),
        (name = "activity", description = "Activity log endpoints"),
        (name = "system", description = "Health and maintenance endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("static addr"),
            enable_cors: true,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, db: DatabaseConnection, allow_signup: bool) -> Self {
        let state = Arc::new(AppState { db, allow_signup });
        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone(), self.config.enable_cors)
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// Build the full router for the given state. Exposed for tests.
pub fn build_router(state: Arc<AppState>, enable_cors: bool) -> Router {
    let api_doc = ApiDoc::openapi();

    // Public routes (no authentication required)
    let public_router = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .with_state(state.clone());

    // Protected routes (session or bot token required)
    let protected_router = Router::new()
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::get_current_principal))
        .route("/api/teams", post(handlers::create_team))
        .route(
            "/api/teams/{id}/requests",
            get(handlers::list_pending_requests).post(handlers::request_to_join),
        )
        .route(
            "/api/team-requests/{id}/approve",
            post(handlers::approve_request),
        )
        .route(
            "/api/team-requests/{id}/reject",
            post(handlers::reject_request),
        )
        .route("/api/teams/{id}/members", get(handlers::list_members))
        .route(
            "/api/teams/{id}/members/{user_id}",
            delete(handlers::remove_member),
        )
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(handlers::get_project)
                .patch(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route(
            "/api/tasks/{id}/subtasks",
            get(handlers::list_subtasks).post(handlers::create_subtask),
        )
        .route("/api/subtasks/{id}/answer", post(handlers::answer_subtask))
        .route("/api/subtasks/{id}/assign", post(handlers::assign_subtask))
        .route("/api/subtasks/{id}", delete(handlers::delete_subtask))
        .route(
            "/api/bots",
            get(handlers::list_bots).post(handlers::create_bot),
        )
        .route(
            "/api/bots/{id}",
            axum::routing::patch(handlers::update_bot).delete(handlers::remove_bot),
        )
        .route("/api/users/{id}", delete(handlers::remove_user))
        .route("/api/activity", get(handlers::recent_activity))
        .route("/api/activity/updates", get(handlers::activity_updates))
        .route("/api/activity/feed", get(handlers::assigned_activity))
        .route("/api/maintenance/sweep", post(handlers::run_sweep))
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    let api_router = public_router.merge(protected_router);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
        .merge(api_router);

    // For cookie-based auth we must allow credentials, which rules out a
    // wildcard origin; development origins are matched explicitly.
    let cors = enable_cors.then(|| {
        use tower_http::cors::AllowOrigin;

        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
                    || origin_str.starts_with("https://localhost:")
                    || origin_str.starts_with("https://127.0.0.1:")
            }))
    });

    let mut router = router.layer(TraceLayer::new_for_http());
    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router
}

/// Convenience function to create and start an API server
pub async fn run_api_server(
    bind_addr: SocketAddr,
    db: DatabaseConnection,
    allow_signup: bool,
) -> Result<(), anyhow::Error> {
    let config = ApiServerConfig {
        bind_addr,
        enable_cors: true,
    };

    let server = ApiServer::new(config, db, allow_signup);
    server.start().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_generates() {
        let _api_doc = ApiDoc::openapi();
    }
}
