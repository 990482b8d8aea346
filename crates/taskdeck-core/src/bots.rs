//! Bot management
//!
//! Bots are created by a human owner, hold a capability set, and
//! authenticate with a `bot_<hex>` token that is generated once and shown
//! once. Removal (with transfer or cascade) lives in `accounts`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use taskdeck_auth::new_bot_token;
use taskdeck_db::entities::bot::PermissionSet;
use taskdeck_db::entities::{bot, prelude::*};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::activity;

/// Input for creating a bot
#[derive(Debug, Clone)]
pub struct NewBot {
    pub username: String,
    pub permissions: PermissionSet,
}

/// A freshly created bot plus its token — the only time the token is
/// available in the clear
#[derive(Debug, Clone)]
pub struct CreatedBot {
    pub bot: bot::Model,
    pub token: String,
}

fn require_human_id(principal: &Principal) -> Result<Uuid> {
    principal
        .as_human()
        .map(|h| h.id)
        .ok_or(Error::HumanRequired)
}

/// Fetch a bot owned by the acting human.
async fn owned_bot(
    db: &DatabaseConnection,
    owner_id: Uuid,
    bot_id: Uuid,
) -> Result<bot::Model> {
    Bot::find_by_id(bot_id)
        .filter(bot::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bot", bot_id))
}

/// Create a bot owned by the acting human.
pub async fn create_bot(
    db: &DatabaseConnection,
    owner: &Principal,
    input: NewBot,
) -> Result<CreatedBot> {
    let owner_id = require_human_id(owner)?;

    let username = input.username.trim();
    if username.is_empty() {
        return Err(Error::validation("bot name must not be empty"));
    }

    let taken = Bot::find()
        .filter(bot::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(Error::validation(format!(
            "bot name '{username}' is already taken"
        )));
    }

    let token = new_bot_token();
    let created = bot::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        api_token: Set(token.clone()),
        owner_id: Set(owner_id),
        permissions: Set(input.permissions),
        is_active: Set(true),
        last_used_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    activity::record(
        db,
        Some(owner),
        "bot_created",
        "bot",
        &created.id.to_string(),
        Some(&created.username),
        None,
    )
    .await?;

    Ok(CreatedBot { bot: created, token })
}

/// Bots owned by the acting human, oldest first.
pub async fn list_bots(db: &DatabaseConnection, owner: &Principal) -> Result<Vec<bot::Model>> {
    let owner_id = require_human_id(owner)?;

    let bots = Bot::find()
        .filter(bot::Column::OwnerId.eq(owner_id))
        .order_by_asc(bot::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(bots)
}

/// Replace a bot's permission set.
pub async fn update_permissions(
    db: &DatabaseConnection,
    owner: &Principal,
    bot_id: Uuid,
    permissions: PermissionSet,
) -> Result<bot::Model> {
    let owner_id = require_human_id(owner)?;
    let existing = owned_bot(db, owner_id, bot_id).await?;

    let username = existing.username.clone();
    let mut active: bot::ActiveModel = existing.into();
    active.permissions = Set(permissions.clone());
    let updated = active.update(db).await?;

    activity::record(
        db,
        Some(owner),
        "bot_permissions_updated",
        "bot",
        &updated.id.to_string(),
        Some(&username),
        Some(json!({
            "permissions": permissions.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        })),
    )
    .await?;

    Ok(updated)
}

/// Enable or disable a bot's token without deleting the bot.
pub async fn set_active(
    db: &DatabaseConnection,
    owner: &Principal,
    bot_id: Uuid,
    is_active: bool,
) -> Result<bot::Model> {
    let owner_id = require_human_id(owner)?;
    let existing = owned_bot(db, owner_id, bot_id).await?;

    let username = existing.username.clone();
    let mut active: bot::ActiveModel = existing.into();
    active.is_active = Set(is_active);
    let updated = active.update(db).await?;

    let action = if is_active {
        "bot_activated"
    } else {
        "bot_deactivated"
    };
    activity::record(
        db,
        Some(owner),
        action,
        "bot",
        &updated.id.to_string(),
        Some(&username),
        None,
    )
    .await?;

    Ok(updated)
}

/// Stamp a bot's `last_used_at`. Management-path only: the authentication
/// hot path never calls this (see `authn::resolve_bot_token`).
pub async fn touch_last_used(db: &DatabaseConnection, bot_id: Uuid) -> Result<()> {
    let bot = Bot::find_by_id(bot_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bot", bot_id))?;

    let mut active: bot::ActiveModel = bot.into();
    active.last_used_at = Set(Some(Utc::now()));
    active.update(db).await?;

    Ok(())
}
