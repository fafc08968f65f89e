// ============================
// crates/backend-lib/src/storage/mod.rs
// ============================
//! Storage abstraction for users and sessions.
//!
//! The session manager never talks to a database directly. Any backend that
//! implements these two traits can be plugged in; [`memory`] provides
//! `DashMap`-backed implementations.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatekeeper_common::{CreateUserInput, Session, SessionMetadata, UpdateProfileInput, UserRecord};

use crate::error::AuthError;

pub mod memory;

pub use memory::{MemorySessionStore, MemoryUserStore};

/// Trait for user backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by login identifier (username or email).
    /// Fails with [`AuthError::UserNotFound`] when absent.
    async fn find_by_identifier(&self, identifier: &str) -> Result<UserRecord, AuthError>;

    /// Look up a user by id. Fails with [`AuthError::UserNotFound`] when absent.
    async fn find_by_id(&self, id: &str) -> Result<UserRecord, AuthError>;

    /// Compare `secret` against the stored salted hash.
    /// Unknown identifiers and wrong secrets both fail with
    /// [`AuthError::InvalidCredentials`].
    async fn validate_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<UserRecord, AuthError>;

    /// Create a user. Fails with [`AuthError::IdentifierTaken`] on duplicates.
    async fn create(&self, input: CreateUserInput) -> Result<UserRecord, AuthError>;

    /// Replace the stored secret
    async fn update_password(&self, user_id: &str, new_secret: &str) -> Result<(), AuthError>;

    /// Apply the present fields of `update`. A new email that is already a
    /// login of another user fails with [`AuthError::IdentifierTaken`].
    async fn update_profile(
        &self,
        user_id: &str,
        update: &UpdateProfileInput,
    ) -> Result<UserRecord, AuthError>;
}

/// Trait for session backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session with a fresh random id
    async fn create(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        metadata: &SessionMetadata,
    ) -> Result<Session, AuthError>;

    /// Fetch a session. Fails with [`AuthError::SessionNotFound`] when absent.
    async fn get(&self, session_id: &str) -> Result<Session, AuthError>;

    /// Move the absolute expiry of a session
    async fn update_expiry(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Delete a session. Deleting an absent session is not an error.
    async fn delete(&self, session_id: &str) -> Result<(), AuthError>;

    /// Delete every session owned by a user
    async fn delete_all_for_user(&self, user_id: &str) -> Result<(), AuthError>;

    /// Delete every expired session, returning how many were removed
    async fn delete_expired(&self) -> Result<u64, AuthError>;

    /// All sessions of a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, AuthError>;
}
