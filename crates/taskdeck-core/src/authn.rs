//! Dual-mode authentication: session ids for humans, `bot_<hex>` bearer
//! tokens for bots

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use taskdeck_auth::{new_session_id, verify_password, BOT_TOKEN_PREFIX};
use taskdeck_db::entities::{bot, prelude::*, session, user};
use tracing::debug;

use crate::error::{Error, Result};
use crate::principal::Principal;

/// Sessions issued at login live this long.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub session_id: String,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Resolve a raw credential into a Principal.
///
/// The `bot_` prefix routes to the token strategy; anything else is treated
/// as an opaque session id.
pub async fn resolve(db: &DatabaseConnection, credential: &str) -> Result<Principal> {
    if credential.starts_with(BOT_TOKEN_PREFIX) {
        resolve_bot_token(db, credential).await
    } else {
        resolve_session(db, credential).await
    }
}

/// Bot token path. Read-only: many bots authenticate concurrently with the
/// same token, so this path must not write (a per-call last-used update
/// caused write contention in production; any usage tracking has to be
/// batched outside the hot path).
async fn resolve_bot_token(db: &DatabaseConnection, token: &str) -> Result<Principal> {
    taskdeck_auth::validate_bot_token(token).map_err(|_| Error::InvalidTokenFormat)?;

    let bot = Bot::find()
        .filter(bot::Column::ApiToken.eq(token))
        .filter(bot::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or(Error::InvalidOrInactiveToken)?;

    // One hop to the owner for the bot's effective team.
    let owner = User::find_by_id(bot.owner_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or(Error::InvalidOrInactiveToken)?;

    Ok(Principal::from_bot(&bot, &owner))
}

/// Human path: a non-expired session joined to an active user.
async fn resolve_session(db: &DatabaseConnection, session_id: &str) -> Result<Principal> {
    let row = Session::find_by_id(session_id)
        .find_also_related(User)
        .one(db)
        .await?;

    let (session, user) = match row {
        Some((session, Some(user))) => (session, user),
        _ => return Err(Error::Unauthenticated),
    };

    if session.expires_at <= Utc::now() || !user.is_active {
        return Err(Error::Unauthenticated);
    }

    Ok(Principal::from_user(&user))
}

/// Verify a password and open a new session.
///
/// A failed lookup and a failed password check are indistinguishable to the
/// caller; both are "unauthenticated".
pub async fn login(db: &DatabaseConnection, username: &str, password: &str) -> Result<LoginOutcome> {
    let user = User::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or(Error::Unauthenticated)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(Error::Unauthenticated);
    }

    let now = Utc::now();
    let expires_at = now + Duration::days(SESSION_TTL_DAYS);
    let session_id = new_session_id();

    session::ActiveModel {
        id: Set(session_id.clone()),
        user_id: Set(user.id),
        expires_at: Set(expires_at),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    let mut active: user::ActiveModel = user.into();
    active.last_login = Set(Some(now));
    let user = active.update(db).await?;

    debug!(username, "login succeeded");

    Ok(LoginOutcome {
        principal: Principal::from_user(&user),
        session_id,
        expires_at,
    })
}

/// Resolve a known user id into a Principal (admin tooling; no
/// credential involved).
pub async fn resolve_user(db: &DatabaseConnection, user_id: uuid::Uuid) -> Result<Principal> {
    let user = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;
    Ok(Principal::from_user(&user))
}

/// Drop a session. Idempotent: logging out twice is not an error.
pub async fn logout(db: &DatabaseConnection, session_id: &str) -> Result<()> {
    Session::delete_by_id(session_id).exec(db).await?;
    Ok(())
}

/// Bulk-delete expired sessions. The only sanctioned bulk delete; activity
/// log entries are never cleaned up.
pub async fn purge_expired_sessions(db: &DatabaseConnection) -> Result<u64> {
    let result = Session::delete_many()
        .filter(session::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
