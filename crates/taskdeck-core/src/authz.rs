//! Capability gate
//!
//! Pure functions with no side effects. Humans pass every check; bots pass
//! iff they hold `admin` or the requested capability. Team scoping is NOT
//! checked here — the services scope their queries to the principal's
//! effective team.

use taskdeck_db::entities::bot::Capability;

use crate::error::{Error, Result};
use crate::principal::Principal;

/// Whether the principal may exercise the capability.
pub fn authorize(principal: &Principal, capability: Capability) -> bool {
    match principal {
        Principal::Human(_) => true,
        Principal::Bot(bot) => bot.permissions.allows(capability),
    }
}

/// `authorize`, but a deny is a caller-visible `Forbidden`.
pub fn require(principal: &Principal, capability: Capability) -> Result<()> {
    if authorize(principal, capability) {
        Ok(())
    } else {
        Err(Error::Forbidden(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{BotPrincipal, HumanPrincipal};
    use taskdeck_db::entities::bot::PermissionSet;
    use uuid::Uuid;

    fn human() -> Principal {
        Principal::Human(HumanPrincipal {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            full_name: None,
            team_id: None,
            is_team_admin: false,
        })
    }

    fn bot(permissions: PermissionSet) -> Principal {
        Principal::Bot(BotPrincipal {
            id: Uuid::new_v4(),
            username: "ci-bot".to_string(),
            owner_id: Uuid::new_v4(),
            team_id: None,
            permissions,
        })
    }

    #[test]
    fn humans_are_always_authorized() {
        let principal = human();
        for cap in Capability::CONCRETE {
            assert!(authorize(&principal, cap));
        }
        assert!(authorize(&principal, Capability::Admin));
    }

    #[test]
    fn bot_needs_the_specific_capability() {
        let principal = bot([Capability::Read, Capability::CreateTasks].into_iter().collect());

        assert!(authorize(&principal, Capability::Read));
        assert!(authorize(&principal, Capability::CreateTasks));
        assert!(!authorize(&principal, Capability::UpdateTasks));
        assert!(!authorize(&principal, Capability::DeleteTasks));
    }

    #[test]
    fn admin_bot_is_authorized_for_everything() {
        let principal = bot([Capability::Admin].into_iter().collect());

        for cap in Capability::CONCRETE {
            assert!(authorize(&principal, cap));
        }
    }

    #[test]
    fn empty_permission_set_denies_all() {
        let principal = bot(PermissionSet::new());

        for cap in Capability::CONCRETE {
            assert!(!authorize(&principal, cap));
        }
    }

    #[test]
    fn require_maps_deny_to_forbidden() {
        let principal = bot(PermissionSet::new());

        match require(&principal, Capability::DeleteTasks) {
            Err(Error::Forbidden(cap)) => assert_eq!(cap, Capability::DeleteTasks),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
