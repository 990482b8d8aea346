//! Shared test harness: in-memory database plus a few fixture helpers

use sea_orm::{DatabaseConnection, EntityTrait};
use taskdeck_core::{accounts, teams, Principal};
use taskdeck_db::entities::{team, user};
use uuid::Uuid;

pub async fn test_db() -> DatabaseConnection {
    let db = taskdeck_db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    taskdeck_db::migrate(&db).await.expect("Failed to migrate");
    db
}

pub async fn register(db: &DatabaseConnection, username: &str) -> user::Model {
    accounts::register_user(
        db,
        accounts::NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "correct-horse-battery".to_string(),
            full_name: None,
        },
    )
    .await
    .expect("Failed to register user")
}

/// Re-resolve a principal from the store after membership changes.
pub async fn refresh_principal(db: &DatabaseConnection, user_id: Uuid) -> Principal {
    let user = taskdeck_db::entities::prelude::User::find_by_id(user_id)
        .one(db)
        .await
        .expect("Failed to query user")
        .expect("User not found");
    Principal::from_user(&user)
}

/// A team with one admin member; returns the team and the admin principal.
pub async fn team_with_admin(
    db: &DatabaseConnection,
    team_name: &str,
    admin_name: &str,
) -> (team::Model, Principal) {
    let admin = register(db, admin_name).await;
    let principal = Principal::from_user(&admin);
    let team = teams::create_team(db, &principal, team_name)
        .await
        .expect("Failed to create team");
    let principal = refresh_principal(db, admin.id).await;
    (team, principal)
}
