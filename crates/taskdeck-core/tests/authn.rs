//! Authentication flows: bot tokens and human sessions

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use taskdeck_core::{authn, bots, Capability, Error, PermissionSet, Principal};
use taskdeck_db::entities::{prelude::*, session};

#[tokio::test]
async fn bot_token_resolves_to_principal_with_stored_permissions() {
    let db = common::test_db().await;
    let (_team, owner) = common::team_with_admin(&db, "Acme", "alice").await;

    let permissions: PermissionSet = [Capability::Read, Capability::CreateTasks]
        .into_iter()
        .collect();
    let created = bots::create_bot(
        &db,
        &owner,
        bots::NewBot {
            username: "ci-bot".to_string(),
            permissions: permissions.clone(),
        },
    )
    .await
    .expect("Failed to create bot");

    let principal = authn::resolve(&db, &created.token)
        .await
        .expect("Token should resolve");

    match &principal {
        Principal::Bot(bot) => {
            assert_eq!(bot.username, "ci-bot");
            assert_eq!(bot.permissions, permissions);
            assert_eq!(bot.owner_id, owner.id());
            // Effective team is the owner's team, resolved one hop.
            assert_eq!(bot.team_id, owner.effective_team_id());
        }
        Principal::Human(_) => panic!("expected a bot principal"),
    }
}

#[tokio::test]
async fn bot_authentication_performs_no_write() {
    let db = common::test_db().await;
    let (_team, owner) = common::team_with_admin(&db, "Acme", "alice").await;

    let created = bots::create_bot(
        &db,
        &owner,
        bots::NewBot {
            username: "busy-bot".to_string(),
            permissions: PermissionSet::all(),
        },
    )
    .await
    .expect("Failed to create bot");

    for _ in 0..5 {
        authn::resolve(&db, &created.token)
            .await
            .expect("Token should resolve");
    }

    let stored = Bot::find_by_id(created.bot.id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Bot not found");
    assert!(
        stored.last_used_at.is_none(),
        "the auth hot path must not stamp last_used_at"
    );
}

#[tokio::test]
async fn inactive_bot_token_is_rejected() {
    let db = common::test_db().await;
    let owner_user = common::register(&db, "bob").await;
    let owner = Principal::from_user(&owner_user);

    let created = bots::create_bot(
        &db,
        &owner,
        bots::NewBot {
            username: "retired-bot".to_string(),
            permissions: PermissionSet::all(),
        },
    )
    .await
    .expect("Failed to create bot");

    bots::set_active(&db, &owner, created.bot.id, false)
        .await
        .expect("Failed to deactivate");

    let err = authn::resolve(&db, &created.token).await.unwrap_err();
    assert!(matches!(err, Error::InvalidOrInactiveToken));
}

#[tokio::test]
async fn malformed_bot_token_is_invalid_format() {
    let db = common::test_db().await;

    let err = authn::resolve(&db, "bot_NOT-HEX").await.unwrap_err();
    assert!(matches!(err, Error::InvalidTokenFormat));

    let err = authn::resolve(&db, "bot_").await.unwrap_err();
    assert!(matches!(err, Error::InvalidTokenFormat));
}

#[tokio::test]
async fn unknown_but_well_formed_token_is_inactive() {
    let db = common::test_db().await;

    let err = authn::resolve(&db, "bot_deadbeef00").await.unwrap_err();
    assert!(matches!(err, Error::InvalidOrInactiveToken));
}

#[tokio::test]
async fn login_issues_a_week_long_session() {
    let db = common::test_db().await;
    let user = common::register(&db, "carol").await;

    let outcome = authn::login(&db, "carol", "correct-horse-battery")
        .await
        .expect("Login should succeed");

    assert!(outcome.expires_at > Utc::now() + Duration::days(6));
    assert_eq!(outcome.principal.username(), "carol");

    let resolved = authn::resolve(&db, &outcome.session_id)
        .await
        .expect("Session should resolve");
    assert_eq!(resolved.id(), user.id);

    // last_login was stamped by the login (and only by the login).
    let stored = User::find_by_id(user.id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("User not found");
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let db = common::test_db().await;
    common::register(&db, "dave").await;

    let err = authn::login(&db, "dave", "totally-wrong").await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
    assert!(err.is_unauthenticated());
}

#[tokio::test]
async fn expired_session_is_unauthenticated() {
    let db = common::test_db().await;
    let user = common::register(&db, "erin").await;

    session::ActiveModel {
        id: Set("expired-session-token".to_string()),
        user_id: Set(user.id),
        expires_at: Set(Utc::now() - Duration::hours(1)),
        created_at: Set(Utc::now() - Duration::days(8)),
    }
    .insert(&db)
    .await
    .expect("Failed to insert session");

    let err = authn::resolve(&db, "expired-session-token").await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let db = common::test_db().await;
    common::register(&db, "frank").await;

    let outcome = authn::login(&db, "frank", "correct-horse-battery")
        .await
        .expect("Login should succeed");

    authn::logout(&db, &outcome.session_id)
        .await
        .expect("Logout should succeed");

    let err = authn::resolve(&db, &outcome.session_id).await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
}

#[tokio::test]
async fn purge_deletes_only_expired_sessions() {
    let db = common::test_db().await;
    let user = common::register(&db, "grace").await;

    let live = authn::login(&db, "grace", "correct-horse-battery")
        .await
        .expect("Login should succeed");

    session::ActiveModel {
        id: Set("stale-1".to_string()),
        user_id: Set(user.id),
        expires_at: Set(Utc::now() - Duration::days(1)),
        created_at: Set(Utc::now() - Duration::days(8)),
    }
    .insert(&db)
    .await
    .expect("Failed to insert session");

    let purged = authn::purge_expired_sessions(&db)
        .await
        .expect("Purge should succeed");
    assert_eq!(purged, 1);

    assert!(authn::resolve(&db, &live.session_id).await.is_ok());
}

#[tokio::test]
async fn deactivated_bot_owner_invalidates_its_bots() {
    let db = common::test_db().await;
    let owner_user = common::register(&db, "heidi").await;
    let owner = Principal::from_user(&owner_user);

    let created = bots::create_bot(
        &db,
        &owner,
        bots::NewBot {
            username: "orphanable-bot".to_string(),
            permissions: PermissionSet::all(),
        },
    )
    .await
    .expect("Failed to create bot");

    let mut deactivate: taskdeck_db::entities::user::ActiveModel = owner_user.into();
    deactivate.is_active = Set(false);
    deactivate.update(&db).await.expect("Failed to update user");

    let err = authn::resolve(&db, &created.token).await.unwrap_err();
    assert!(matches!(err, Error::InvalidOrInactiveToken));
}
