// ==============================
// tests/integration/auth_flow_tests.rs
// ==============================
//! Login, lockout and session flows through the `SessionManager`
use gatekeeper_common::SessionMetadata;
use gatekeeper_lib::auth::AuthConfig;
use gatekeeper_lib::error::AuthError;
use std::time::Duration;

use crate::test_utils::{create_user, setup_manager, STRONG_PASSWORD};

const WRONG_PASSWORD: &str = "Wrong-Horse-00";

fn lockout_config() -> AuthConfig {
    AuthConfig {
        max_failed_attempts: 5,
        lockout_duration: Duration::from_secs(30 * 60),
        ..AuthConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_correct_password_rejected_while_locked() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;

    for _ in 0..5 {
        let err = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked));
}

#[tokio::test(start_paused = true)]
async fn test_lock_lapses_after_lockout_duration() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;

    for _ in 0..5 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }

    tokio::time::advance(Duration::from_secs(29 * 60)).await;
    assert!(matches!(
        manager
            .login("alice", STRONG_PASSWORD, SessionMetadata::default())
            .await,
        Err(AuthError::AccountLocked)
    ));

    tokio::time::advance(Duration::from_secs(60 + 1)).await;
    let (session, _) = manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .unwrap();
    assert!(session.fresh);
    assert_eq!(manager.lockout().failed_attempts("alice"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_attempts_while_locked_do_not_extend_the_lock() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;

    for _ in 0..5 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }

    // Keep hammering while locked
    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(150)).await;
        assert!(matches!(
            manager
                .login("alice", WRONG_PASSWORD, SessionMetadata::default())
                .await,
            Err(AuthError::AccountLocked)
        ));
    }

    // 25 minutes in; the lock still ends 30 minutes after the fifth failure
    tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
    assert!(manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;

    for _ in 0..4 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }
    assert_eq!(manager.lockout().failed_attempts("alice"), 4);

    manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .unwrap();
    assert_eq!(manager.lockout().failed_attempts("alice"), 0);

    // Four more failures are not enough to lock
    for _ in 0..4 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }
    assert!(manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_lapsed_lock_locks_again() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;

    for _ in 0..5 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }
    tokio::time::advance(Duration::from_secs(31 * 60)).await;

    let err = manager
        .login("alice", WRONG_PASSWORD, SessionMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    assert!(matches!(
        manager
            .login("alice", STRONG_PASSWORD, SessionMetadata::default())
            .await,
        Err(AuthError::AccountLocked)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_lockout_is_per_identifier() {
    let (manager, _, _) = setup_manager(lockout_config());
    create_user(&manager, "alice").await;
    create_user(&manager, "bob").await;

    for _ in 0..5 {
        let _ = manager
            .login("alice", WRONG_PASSWORD, SessionMetadata::default())
            .await;
    }

    assert!(manager
        .login("bob", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (manager, _, _) = setup_manager(AuthConfig::default());
    create_user(&manager, "alice").await;

    let (session, _) = manager
        .login("alice", STRONG_PASSWORD, SessionMetadata::default())
        .await
        .unwrap();

    let (validated, user) = manager.validate_session(&session.id).await.unwrap();
    assert_eq!(validated.id, session.id);
    assert_eq!(user.identifier, "alice");

    manager.logout(&session.id).await.unwrap();
    assert!(matches!(
        manager.validate_session(&session.id).await,
        Err(AuthError::SessionNotFound)
    ));
}
