//! Authentication middleware
//!
//! Extracts the credential from the `taskdeck_session` cookie or the
//! `Authorization: Bearer <credential>` header, resolves it through the
//! core authenticator and injects the Principal into request extensions.
//! Bot tokens and session ids share the header; the `bot_` prefix routes
//! between the two strategies inside the core.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::models::ErrorResponse;
use crate::AppState;

/// The raw session credential, kept for logout. Absent for bot requests.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

fn unauthorized(message: &str, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: Some(code.to_string()),
        }),
    )
}

/// Authentication middleware for protected routes.
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - Both cookie and Authorization header are missing
/// - The credential is malformed, expired or revoked
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // Cookie first (web clients), Authorization header second (bots and
    // API clients).
    let cookie_token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("taskdeck_session="))
        })
        .map(str::to_string);

    let credential = match cookie_token {
        Some(token) => token,
        None => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| {
                    unauthorized(
                        "Missing authentication credential (cookie or Authorization header)",
                        "MISSING_AUTH",
                    )
                })?;

            auth_header
                .strip_prefix("Bearer ")
                .ok_or_else(|| {
                    unauthorized(
                        "Invalid Authorization header format. Expected 'Bearer <credential>'",
                        "INVALID_AUTH_FORMAT",
                    )
                })?
                .to_string()
        }
    };

    let principal = taskdeck_core::authn::resolve(&state.db, &credential)
        .await
        .map_err(|err| {
            if err.is_unauthenticated() {
                unauthorized(&format!("Authentication failed: {err}"), "UNAUTHENTICATED")
            } else {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: err.to_string(),
                        code: Some("INTERNAL".to_string()),
                    }),
                )
            }
        })?;

    if principal.is_human() {
        request
            .extensions_mut()
            .insert(SessionToken(credential));
    }
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
