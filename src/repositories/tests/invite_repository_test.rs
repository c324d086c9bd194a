//! Invite repository tests

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::entities::{CreateInvite, InviteFilter, InviteStatus};
use crate::error::AppError;
use crate::repositories::tests::{generators, setup_test_db};
use crate::repositories::InviteRepository;

#[tokio::test]
async fn expiry_defaults_to_seven_days_out() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let created = repo.create(&generators::invite()).await.unwrap();
    assert_eq!(created.status, InviteStatus::Pending);

    let lifetime = created.expires_at - created.created_at;
    assert_eq!(lifetime.num_days(), 7);
}

#[tokio::test]
async fn token_resolves_and_is_unique_per_invite() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let a = repo.create(&generators::invite()).await.unwrap();
    let b = repo.create(&generators::invite()).await.unwrap();
    assert_ne!(a.token, b.token);

    let found = repo.get_by_token(&a.token).await.unwrap();
    assert_eq!(found.id, a.id);
}

#[tokio::test]
async fn accept_transitions_exactly_once() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let created = repo.create(&generators::invite()).await.unwrap();

    let accepted = repo.accept(&created.id, Utc::now()).await.unwrap();
    assert_eq!(accepted.status, InviteStatus::Accepted);
    assert!(accepted.accepted_at.is_some());

    // The loser of the race observes AlreadyProcessed, not a second win
    let err = repo.accept(&created.id, Utc::now()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::AlreadyProcessed { entity: "invite", .. }
    ));
}

#[tokio::test]
async fn expired_invite_cannot_be_accepted() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let created = repo
        .create(&CreateInvite {
            expires_at: Some(Utc::now() + Duration::seconds(30)),
            ..generators::invite()
        })
        .await
        .unwrap();

    // Evaluate the acceptance as if the deadline has long passed
    let err = repo
        .accept(&created.id, Utc::now() + Duration::days(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "invite", .. }));

    // The row is still pending; only acceptance is barred
    assert_eq!(
        repo.get_by_id(&created.id).await.unwrap().status,
        InviteStatus::Pending
    );
}

#[tokio::test]
async fn accept_of_unknown_invite_is_not_found() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let err = repo.accept(&Uuid::new_v4(), Utc::now()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn cancelled_invite_is_terminal() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let created = repo.create(&generators::invite()).await.unwrap();
    let cancelled = repo.cancel(&created.id).await.unwrap();
    assert_eq!(cancelled.status, InviteStatus::Cancelled);

    assert!(matches!(
        repo.accept(&created.id, Utc::now()).await.unwrap_err(),
        AppError::AlreadyProcessed { .. }
    ));
    assert!(matches!(
        repo.cancel(&created.id).await.unwrap_err(),
        AppError::AlreadyProcessed { .. }
    ));
}

#[tokio::test]
async fn listing_filters_by_status_and_email() {
    let pool = setup_test_db().await;
    let repo = InviteRepository::new(pool);

    let first = repo.create(&generators::invite()).await.unwrap();
    repo.create(&generators::invite()).await.unwrap();
    repo.accept(&first.id, Utc::now()).await.unwrap();

    let pending = repo
        .list(&InviteFilter {
            status: Some(InviteStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.total, 1);

    let by_email = repo
        .list(&InviteFilter {
            email: Some(first.email.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_email.total, 1);
    assert_eq!(by_email.items[0].id, first.id);
}
