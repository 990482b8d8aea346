//! Team lifecycle: creation, join requests, membership

mod common;

use taskdeck_core::{teams, Error, Principal};
use taskdeck_db::entities::team_request::RequestStatus;

#[tokio::test]
async fn creator_becomes_team_admin() {
    let db = common::test_db().await;
    let user = common::register(&db, "alice").await;
    let principal = Principal::from_user(&user);

    let team = teams::create_team(&db, &principal, "Acme")
        .await
        .expect("Failed to create team");
    assert_eq!(team.name, "Acme");
    assert_eq!(team.created_by, user.id);

    let refreshed = common::refresh_principal(&db, user.id).await;
    let human = refreshed.as_human().expect("human principal");
    assert_eq!(human.team_id, Some(team.id));
    assert!(human.is_team_admin);
}

#[tokio::test]
async fn duplicate_team_name_is_rejected() {
    let db = common::test_db().await;
    let (_team, _admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let other = common::register(&db, "bob").await;
    let principal = Principal::from_user(&other);

    let err = teams::create_team(&db, &principal, "Acme").await.unwrap_err();
    assert!(matches!(err, Error::DuplicateTeamName(name) if name == "Acme"));
}

#[tokio::test]
async fn join_request_lifecycle_approval() {
    let db = common::test_db().await;
    let (team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let joiner = common::register(&db, "bob").await;
    let joiner_principal = Principal::from_user(&joiner);

    let request = teams::request_to_join(&db, &joiner_principal, team.id)
        .await
        .expect("Failed to file request");
    assert_eq!(request.status, RequestStatus::Pending);

    // A second pending request for the same pair is rejected.
    let err = teams::request_to_join(&db, &joiner_principal, team.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyRequestedOrMember));

    let approved = teams::approve_request(&db, &admin, request.id)
        .await
        .expect("Failed to approve");
    assert_eq!(approved.status, RequestStatus::Approved);
    assert!(approved.resolved_at.is_some());

    let joined = common::refresh_principal(&db, joiner.id).await;
    let human = joined.as_human().expect("human principal");
    assert_eq!(human.team_id, Some(team.id));
    assert!(!human.is_team_admin);
}

#[tokio::test]
async fn rejection_only_flips_status() {
    let db = common::test_db().await;
    let (team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let joiner = common::register(&db, "bob").await;
    let joiner_principal = Principal::from_user(&joiner);

    let request = teams::request_to_join(&db, &joiner_principal, team.id)
        .await
        .expect("Failed to file request");

    let rejected = teams::reject_request(&db, &admin, request.id)
        .await
        .expect("Failed to reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);

    let still_outside = common::refresh_principal(&db, joiner.id).await;
    assert_eq!(still_outside.effective_team_id(), None);

    // Rejection does not block a fresh request.
    assert!(teams::request_to_join(&db, &joiner_principal, team.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn non_admin_cannot_decide_requests() {
    let db = common::test_db().await;
    let (team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let member_user = common::register(&db, "bob").await;
    let member_request =
        teams::request_to_join(&db, &Principal::from_user(&member_user), team.id)
            .await
            .expect("Failed to file request");
    teams::approve_request(&db, &admin, member_request.id)
        .await
        .expect("Failed to approve");
    let member = common::refresh_principal(&db, member_user.id).await;

    let outsider = common::register(&db, "carol").await;
    let request = teams::request_to_join(&db, &Principal::from_user(&outsider), team.id)
        .await
        .expect("Failed to file request");

    // A plain member is not an admin.
    let err = teams::approve_request(&db, &member, request.id).await.unwrap_err();
    assert!(matches!(err, Error::NotTeamAdmin));

    // Neither is an admin of a different team.
    let (_other_team, other_admin) = common::team_with_admin(&db, "Globex", "dave").await;
    let err = teams::approve_request(&db, &other_admin, request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotTeamAdmin));
}

#[tokio::test]
async fn member_of_team_cannot_request_again() {
    let db = common::test_db().await;
    let (team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let err = teams::request_to_join(&db, &admin, team.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRequestedOrMember));
}

#[tokio::test]
async fn admin_removes_member_from_team() {
    let db = common::test_db().await;
    let (team, admin) = common::team_with_admin(&db, "Acme", "alice").await;

    let member_user = common::register(&db, "bob").await;
    let request = teams::request_to_join(&db, &Principal::from_user(&member_user), team.id)
        .await
        .expect("Failed to file request");
    teams::approve_request(&db, &admin, request.id)
        .await
        .expect("Failed to approve");

    let removed = teams::remove_user_from_team(&db, &admin, member_user.id)
        .await
        .expect("Failed to remove member");
    assert_eq!(removed.team_id, None);
    assert!(!removed.is_team_admin);
}

#[tokio::test]
async fn removing_outsider_fails() {
    let db = common::test_db().await;
    let (_team, admin) = common::team_with_admin(&db, "Acme", "alice").await;
    let outsider = common::register(&db, "bob").await;

    let err = teams::remove_user_from_team(&db, &admin, outsider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
