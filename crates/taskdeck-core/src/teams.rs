//! Team and membership management
//!
//! Teams are the ownership scope. Joining requires an admin-approved
//! request; at most one pending request exists per (team, user) pair.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::json;
use taskdeck_db::entities::{prelude::*, team, team_request, user};
use tracing::info;
use uuid::Uuid;

use crate::activity;
use crate::error::{Error, Result};
use crate::principal::{HumanPrincipal, Principal};

fn require_human(principal: &Principal) -> Result<&HumanPrincipal> {
    principal.as_human().ok_or(Error::HumanRequired)
}

/// Create a team. The creator becomes its first member and admin.
pub async fn create_team(
    db: &DatabaseConnection,
    creator: &Principal,
    name: &str,
) -> Result<team::Model> {
    let human = require_human(creator)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("team name must not be empty"));
    }
    if human.team_id.is_some() {
        return Err(Error::validation(
            "user already belongs to a team; leave it before creating another",
        ));
    }

    let taken = Team::find()
        .filter(team::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(Error::DuplicateTeamName(name.to_string()));
    }

    let now = Utc::now();
    let txn = db.begin().await?;

    let created = async {
        let created = team::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_by: Set(human.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let membership = user::ActiveModel {
            id: Set(human.id),
            team_id: Set(Some(created.id)),
            is_team_admin: Set(true),
            updated_at: Set(now),
            ..Default::default()
        };
        membership.update(&txn).await?;

        activity::record(
            &txn,
            Some(creator),
            "team_created",
            "team",
            &created.id.to_string(),
            Some(&created.name),
            None,
        )
        .await?;

        Ok::<_, Error>(created)
    }
    .await;

    match created {
        Ok(created) => {
            txn.commit().await?;
            info!(team = %created.name, "team created");
            Ok(created)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}

/// File a join request. Fails if the user is already a member or already
/// has a pending request for the team.
pub async fn request_to_join(
    db: &DatabaseConnection,
    requester: &Principal,
    team_id: Uuid,
) -> Result<team_request::Model> {
    let human = require_human(requester)?;

    let team = Team::find_by_id(team_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("team", team_id))?;

    if human.team_id == Some(team.id) {
        return Err(Error::AlreadyRequestedOrMember);
    }

    let pending = TeamRequest::find()
        .filter(team_request::Column::TeamId.eq(team.id))
        .filter(team_request::Column::UserId.eq(human.id))
        .filter(team_request::Column::Status.eq(team_request::RequestStatus::Pending))
        .one(db)
        .await?;
    if pending.is_some() {
        return Err(Error::AlreadyRequestedOrMember);
    }

    let request = team_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(team.id),
        user_id: Set(human.id),
        status: Set(team_request::RequestStatus::Pending),
        created_at: Set(Utc::now()),
        resolved_at: Set(None),
    }
    .insert(db)
    .await?;

    activity::record(
        db,
        Some(requester),
        "team_request_created",
        "team_request",
        &request.id.to_string(),
        Some(&team.name),
        None,
    )
    .await?;

    Ok(request)
}

/// Check that `actor` administers the team a request points at.
async fn require_admin_of(
    db: &DatabaseConnection,
    actor: &Principal,
    team_id: Uuid,
) -> Result<()> {
    let human = require_human(actor)?;
    if human.team_id != Some(team_id) || !human.is_team_admin {
        return Err(Error::NotTeamAdmin);
    }
    // Re-check against the store: the principal may be stale.
    let current = User::find_by_id(human.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", human.id))?;
    if current.team_id != Some(team_id) || !current.is_team_admin {
        return Err(Error::NotTeamAdmin);
    }
    Ok(())
}

async fn pending_request(
    db: &DatabaseConnection,
    request_id: Uuid,
) -> Result<team_request::Model> {
    let request = TeamRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("team request", request_id))?;

    if request.status != team_request::RequestStatus::Pending {
        return Err(Error::validation("request has already been resolved"));
    }

    Ok(request)
}

/// Approve a pending request: the requester joins the team.
pub async fn approve_request(
    db: &DatabaseConnection,
    actor: &Principal,
    request_id: Uuid,
) -> Result<team_request::Model> {
    let request = pending_request(db, request_id).await?;
    require_admin_of(db, actor, request.team_id).await?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let outcome = async {
        let joining = user::ActiveModel {
            id: Set(request.user_id),
            team_id: Set(Some(request.team_id)),
            is_team_admin: Set(false),
            updated_at: Set(now),
            ..Default::default()
        };
        joining.update(&txn).await?;

        let mut resolved: team_request::ActiveModel = request.clone().into();
        resolved.status = Set(team_request::RequestStatus::Approved);
        resolved.resolved_at = Set(Some(now));
        let resolved = resolved.update(&txn).await?;

        activity::record(
            &txn,
            Some(actor),
            "team_request_approved",
            "team_request",
            &resolved.id.to_string(),
            None,
            Some(json!({ "user_id": resolved.user_id.to_string() })),
        )
        .await?;

        Ok::<_, Error>(resolved)
    }
    .await;

    match outcome {
        Ok(resolved) => {
            txn.commit().await?;
            Ok(resolved)
        }
        Err(err) => {
            txn.rollback().await?;
            Err(err)
        }
    }
}

/// Reject a pending request. Only the status changes; the user may file a
/// new request afterwards.
pub async fn reject_request(
    db: &DatabaseConnection,
    actor: &Principal,
    request_id: Uuid,
) -> Result<team_request::Model> {
    let request = pending_request(db, request_id).await?;
    require_admin_of(db, actor, request.team_id).await?;

    let mut resolved: team_request::ActiveModel = request.into();
    resolved.status = Set(team_request::RequestStatus::Rejected);
    resolved.resolved_at = Set(Some(Utc::now()));
    let resolved = resolved.update(db).await?;

    activity::record(
        db,
        Some(actor),
        "team_request_rejected",
        "team_request",
        &resolved.id.to_string(),
        None,
        Some(json!({ "user_id": resolved.user_id.to_string() })),
    )
    .await?;

    Ok(resolved)
}

/// Remove a member from the actor's team.
pub async fn remove_user_from_team(
    db: &DatabaseConnection,
    actor: &Principal,
    target_user_id: Uuid,
) -> Result<user::Model> {
    let target = User::find_by_id(target_user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", target_user_id))?;

    let team_id = target
        .team_id
        .ok_or_else(|| Error::validation("user does not belong to a team"))?;
    require_admin_of(db, actor, team_id).await?;

    let username = target.username.clone();
    let mut leaving: user::ActiveModel = target.into();
    leaving.team_id = Set(None);
    leaving.is_team_admin = Set(false);
    leaving.updated_at = Set(Utc::now());
    let updated = leaving.update(db).await?;

    activity::record(
        db,
        Some(actor),
        "team_member_removed",
        "user",
        &updated.id.to_string(),
        Some(&username),
        Some(json!({ "team_id": team_id.to_string() })),
    )
    .await?;

    Ok(updated)
}

/// Pending requests for a team, oldest first (admin review queue).
pub async fn pending_requests(
    db: &DatabaseConnection,
    actor: &Principal,
    team_id: Uuid,
) -> Result<Vec<team_request::Model>> {
    require_admin_of(db, actor, team_id).await?;

    let requests = TeamRequest::find()
        .filter(team_request::Column::TeamId.eq(team_id))
        .filter(team_request::Column::Status.eq(team_request::RequestStatus::Pending))
        .all(db)
        .await?;
    Ok(requests)
}

/// Members of a team.
pub async fn members(db: &DatabaseConnection, team_id: Uuid) -> Result<Vec<user::Model>> {
    let members = User::find()
        .filter(user::Column::TeamId.eq(team_id))
        .all(db)
        .await?;
    Ok(members)
}
