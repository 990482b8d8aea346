//! The resolved identity of a request: a human or a bot
//!
//! Modeled as a tagged sum type with a shared capability-query surface
//! instead of runtime type inspection.

use taskdeck_db::entities::activity_log::ActorKind;
use taskdeck_db::entities::bot::PermissionSet;
use taskdeck_db::entities::{bot, user};
use uuid::Uuid;

/// A human account resolved from a session
#[derive(Debug, Clone, PartialEq)]
pub struct HumanPrincipal {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub team_id: Option<Uuid>,
    pub is_team_admin: bool,
}

/// A bot resolved from an API token; `team_id` is the owner's team,
/// resolved one hop at authentication time
#[derive(Debug, Clone, PartialEq)]
pub struct BotPrincipal {
    pub id: Uuid,
    pub username: String,
    pub owner_id: Uuid,
    pub team_id: Option<Uuid>,
    pub permissions: PermissionSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Human(HumanPrincipal),
    Bot(BotPrincipal),
}

impl Principal {
    pub fn from_user(user: &user::Model) -> Self {
        Principal::Human(HumanPrincipal {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            team_id: user.team_id,
            is_team_admin: user.is_team_admin,
        })
    }

    pub fn from_bot(bot: &bot::Model, owner: &user::Model) -> Self {
        Principal::Bot(BotPrincipal {
            id: bot.id,
            username: bot.username.clone(),
            owner_id: bot.owner_id,
            team_id: owner.team_id,
            permissions: bot.permissions.clone(),
        })
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::Human(h) => h.id,
            Principal::Bot(b) => b.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Principal::Human(h) => &h.username,
            Principal::Bot(b) => &b.username,
        }
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            Principal::Human(_) => ActorKind::Human,
            Principal::Bot(_) => ActorKind::Bot,
        }
    }

    /// The team the principal acts within; for bots, the owner's team.
    pub fn effective_team_id(&self) -> Option<Uuid> {
        match self {
            Principal::Human(h) => h.team_id,
            Principal::Bot(b) => b.team_id,
        }
    }

    /// Humans hold every capability; bots hold exactly their stored set.
    pub fn effective_permissions(&self) -> PermissionSet {
        match self {
            Principal::Human(_) => PermissionSet::all(),
            Principal::Bot(b) => b.permissions.clone(),
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Principal::Human(_))
    }

    /// The human behind the principal, if it is one.
    pub fn as_human(&self) -> Option<&HumanPrincipal> {
        match self {
            Principal::Human(h) => Some(h),
            Principal::Bot(_) => None,
        }
    }
}
