// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle: login, validation with sliding refresh, logout.
use chrono::{DateTime, Utc};
use gatekeeper_common::{CreateUserInput, Session, SessionMetadata, UpdateProfileInput, UserRecord};
use metrics::counter;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::lockout::{LockoutTracker, DEFAULT_LOCKOUT_DURATION, DEFAULT_MAX_FAILED_ATTEMPTS};
use crate::error::AuthError;
use crate::metrics::{
    LOCKOUT_TRIGGERED, LOGIN_FAILURE, LOGIN_SUCCESS, SESSION_CREATED, SESSION_EXPIRED,
    SESSION_REFRESHED, SESSION_REVOKED,
};
use crate::storage::{SessionStore, UserStore};

/// Default session validity window (30 days)
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Remaining lifetime below which a session is extended (15 days)
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(60 * 60 * 24 * 15);

/// Session manager configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Validity window from issuance or refresh
    pub session_duration: Duration,
    /// Sessions with less than this remaining are extended on validation
    pub refresh_threshold: Duration,
    /// Failed attempts before an identifier is locked
    pub max_failed_attempts: u32,
    /// How long a lock lasts
    pub lockout_duration: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_duration: DEFAULT_SESSION_DURATION,
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_duration: DEFAULT_LOCKOUT_DURATION,
        }
    }
}

/// `now + ttl`, saturating at the largest representable instant
fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Coordinates the user store, the session store and the lockout tracker.
///
/// Each call is independent; nothing here is transactional with respect to
/// the stores. Session refresh is read-then-write and last writer wins.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    config: AuthConfig,
    lockout: LockoutTracker,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Self {
        let lockout = LockoutTracker::new(config.max_failed_attempts, config.lockout_duration);
        Self {
            users,
            sessions,
            config,
            lockout,
        }
    }

    /// Authenticate `identifier` and open a new session.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        metadata: SessionMetadata,
    ) -> Result<(Session, UserRecord), AuthError> {
        if self.lockout.is_locked(identifier) {
            counter!(LOGIN_FAILURE).increment(1);
            debug!(identifier, "login rejected, identifier locked");
            return Err(AuthError::AccountLocked);
        }

        let user = match self.users.validate_credentials(identifier, secret).await {
            Ok(user) => user,
            Err(AuthError::InvalidCredentials) => {
                counter!(LOGIN_FAILURE).increment(1);
                if self.lockout.record_failure(identifier) {
                    counter!(LOCKOUT_TRIGGERED).increment(1);
                }
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(err),
        };

        // Inactive accounts neither clear nor add to the failure count
        if !user.active {
            counter!(LOGIN_FAILURE).increment(1);
            return Err(AuthError::UserNotActive);
        }

        self.lockout.clear(identifier);

        let expires_at = expiry_from(Utc::now(), self.config.session_duration);
        let mut session = self.sessions.create(&user.id, expires_at, &metadata).await?;
        session.fresh = true;

        counter!(LOGIN_SUCCESS).increment(1);
        counter!(SESSION_CREATED).increment(1);
        info!(user_id = %user.id, identifier, ip = ?metadata.ip, "login succeeded");

        Ok((session, user))
    }

    /// Resolve a session id to its session and user, extending the session
    /// when it is inside the refresh window.
    pub async fn validate_session(
        &self,
        session_id: &str,
    ) -> Result<(Session, UserRecord), AuthError> {
        let mut session = self.sessions.get(session_id).await?;

        let now = Utc::now();
        if session.is_expired_at(now) {
            if let Err(err) = self.sessions.delete(session_id).await {
                debug!(error = %err, "failed to delete expired session");
            }
            counter!(SESSION_EXPIRED).increment(1);
            return Err(AuthError::SessionExpired);
        }

        let user = self.users.find_by_id(&session.user_id).await?;
        if !user.active {
            return Err(AuthError::UserNotActive);
        }

        session.fresh = false;
        let remaining = (session.expires_at - now).to_std().unwrap_or_default();
        if remaining < self.config.refresh_threshold {
            let new_expires_at = expiry_from(now, self.config.session_duration);
            match self.sessions.update_expiry(session_id, new_expires_at).await {
                Ok(()) => {
                    session.expires_at = new_expires_at;
                    session.fresh = true;
                    counter!(SESSION_REFRESHED).increment(1);
                    debug!(user_id = %user.id, "session refreshed");
                }
                Err(err) => debug!(error = %err, "session refresh failed"),
            }
        }

        Ok((session, user))
    }

    /// Delete a session. Unknown ids are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        match self.sessions.delete(session_id).await {
            Ok(()) | Err(AuthError::SessionNotFound) => {
                counter!(SESSION_REVOKED).increment(1);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Delete every session of a user
    pub async fn logout_all(&self, user_id: &str) -> Result<(), AuthError> {
        self.sessions.delete_all_for_user(user_id).await?;
        counter!(SESSION_REVOKED).increment(1);
        info!(user_id, "all sessions revoked");
        Ok(())
    }

    /// Register a new user. Duplicate identifiers or emails are rejected.
    pub async fn register(&self, input: CreateUserInput) -> Result<UserRecord, AuthError> {
        match self.users.find_by_identifier(&input.identifier).await {
            Ok(_) => return Err(AuthError::IdentifierTaken),
            Err(AuthError::UserNotFound) => {}
            Err(err) => return Err(err),
        }
        if !input.email.is_empty() {
            match self.users.find_by_identifier(&input.email).await {
                Ok(_) => return Err(AuthError::IdentifierTaken),
                Err(AuthError::UserNotFound) => {}
                Err(err) => return Err(err),
            }
        }

        let user = self.users.create(input).await?;
        info!(user_id = %user.id, identifier = %user.identifier, "user registered");
        Ok(user)
    }

    /// Replace a user's secret after checking the current one, then revoke
    /// all of the user's sessions.
    ///
    /// The current secret check goes through the lockout tracker like a
    /// login attempt on the user's identifier.
    pub async fn change_password(
        &self,
        user: &UserRecord,
        current_secret: &str,
        new_secret: &str,
    ) -> Result<(), AuthError> {
        if self.lockout.is_locked(&user.identifier) {
            debug!(user_id = %user.id, "password change rejected, identifier locked");
            return Err(AuthError::AccountLocked);
        }

        match self
            .users
            .validate_credentials(&user.identifier, current_secret)
            .await
        {
            Ok(_) => self.lockout.clear(&user.identifier),
            Err(AuthError::InvalidCredentials) => {
                if self.lockout.record_failure(&user.identifier) {
                    counter!(LOCKOUT_TRIGGERED).increment(1);
                }
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(err),
        }
        self.users.update_password(&user.id, new_secret).await?;
        self.logout_all(&user.id).await
    }

    /// Revoke one session of `user_id`.
    ///
    /// Ids that are unknown or belong to another user fail with
    /// [`AuthError::Forbidden`] alike.
    pub async fn revoke_session(&self, user_id: &str, session_id: &str) -> Result<(), AuthError> {
        let session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(AuthError::SessionNotFound) => return Err(AuthError::Forbidden),
            Err(err) => return Err(err),
        };

        if session.user_id != user_id {
            warn!(user_id, "refused to revoke a session of another user");
            return Err(AuthError::Forbidden);
        }

        self.logout(session_id).await?;
        info!(user_id, "session revoked");
        Ok(())
    }

    /// Change the display name and/or email of a user. A new email must not
    /// be in use as another user's identifier or email.
    pub async fn update_profile(
        &self,
        user: &UserRecord,
        update: UpdateProfileInput,
    ) -> Result<UserRecord, AuthError> {
        let new_email = update
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty() && *email != user.email);
        if let Some(email) = new_email {
            match self.users.find_by_identifier(email).await {
                Ok(other) if other.id != user.id => return Err(AuthError::IdentifierTaken),
                Ok(_) | Err(AuthError::UserNotFound) => {}
                Err(err) => return Err(err),
            }
        }

        let updated = self.users.update_profile(&user.id, &update).await?;
        info!(user_id = %updated.id, "profile updated");
        Ok(updated)
    }

    /// Sessions of a user, newest first
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, AuthError> {
        self.sessions.list_for_user(user_id).await
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        Arc::clone(&self.users)
    }

    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.sessions)
    }
}
