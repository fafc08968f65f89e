// ============================
// crates/backend-lib/src/storage/memory.rs
// ============================
//! In-memory user and session stores.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use gatekeeper_common::{
    CreateUserInput, Session, SessionMetadata, UpdateProfileInput, UserRecord, DEFAULT_ROLE,
};
use scrypt::Params;
use uuid::Uuid;

use super::{SessionStore, UserStore};
use crate::auth::password::{hash_password_secure, verify_password};
use crate::auth::token_generator::generate_session_id;
use crate::error::AuthError;

/// `DashMap`-backed user store with scrypt-hashed secrets.
///
/// Identifiers and emails share one login namespace, so either can be used
/// to log in and neither can be registered twice.
#[derive(Debug)]
pub struct MemoryUserStore {
    users: DashMap<String, UserRecord>,
    /// identifier or email -> user id
    logins: DashMap<String, String>,
    params: Params,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_params(Params::recommended())
    }

    /// Create a store hashing with explicit scrypt cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            users: DashMap::new(),
            logins: DashMap::new(),
            params,
        }
    }

    /// Activate or deactivate a user
    pub fn set_active(&self, user_id: &str, active: bool) -> Result<(), AuthError> {
        let mut user = self.users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        user.active = active;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn lookup(&self, identifier: &str) -> Option<UserRecord> {
        let id = self.logins.get(identifier)?.value().clone();
        self.users.get(&id).map(|user| user.value().clone())
    }

    async fn hash(&self, secret: String) -> Result<String, AuthError> {
        let params = self.params;
        let mut secret = secret;
        tokio::task::spawn_blocking(move || hash_password_secure(&mut secret, params))
            .await?
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<UserRecord, AuthError> {
        self.lookup(identifier).ok_or(AuthError::UserNotFound)
    }

    async fn find_by_id(&self, id: &str) -> Result<UserRecord, AuthError> {
        self.users
            .get(id)
            .map(|user| user.value().clone())
            .ok_or(AuthError::UserNotFound)
    }

    async fn validate_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<UserRecord, AuthError> {
        let user = self.lookup(identifier).ok_or(AuthError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let secret = secret.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &secret)).await?;

        if valid {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn create(&self, input: CreateUserInput) -> Result<UserRecord, AuthError> {
        let CreateUserInput {
            identifier,
            email,
            password,
            display_name,
            role,
            attributes,
        } = input;

        if identifier.trim().is_empty() {
            return Err(AuthError::InvalidInput("identifier must not be empty".to_string()));
        }
        if self.logins.contains_key(&identifier)
            || (!email.is_empty() && self.logins.contains_key(&email))
        {
            return Err(AuthError::IdentifierTaken);
        }

        let password_hash = self.hash(password).await?;
        let id = Uuid::new_v4().to_string();

        // Reserve the identifier, then the email; undo on a lost race
        let identifier_taken = match self.logins.entry(identifier.clone()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
                false
            }
        };
        if identifier_taken {
            return Err(AuthError::IdentifierTaken);
        }

        if !email.is_empty() {
            let email_taken = match self.logins.entry(email.clone()) {
                Entry::Occupied(_) => true,
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                    false
                }
            };
            if email_taken {
                self.logins.remove(&identifier);
                return Err(AuthError::IdentifierTaken);
            }
        }

        let user = UserRecord {
            id: id.clone(),
            identifier,
            email,
            display_name,
            password_hash,
            role: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            active: true,
            attributes,
        };
        self.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update_password(&self, user_id: &str, new_secret: &str) -> Result<(), AuthError> {
        if !self.users.contains_key(user_id) {
            return Err(AuthError::UserNotFound);
        }

        let password_hash = self.hash(new_secret.to_owned()).await?;
        let mut user = self.users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &UpdateProfileInput,
    ) -> Result<UserRecord, AuthError> {
        let current = self.find_by_id(user_id).await?;

        let new_email = update
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| *email != current.email);
        if let Some(email) = new_email {
            if email.is_empty() {
                return Err(AuthError::InvalidInput("email must not be empty".to_string()));
            }
            let taken = match self.logins.entry(email.to_string()) {
                Entry::Occupied(owner) => owner.get() != user_id,
                Entry::Vacant(slot) => {
                    slot.insert(user_id.to_string());
                    false
                }
            };
            if taken {
                return Err(AuthError::IdentifierTaken);
            }
            // The old email stops being a login unless it is also the identifier
            if !current.email.is_empty() && current.email != current.identifier {
                self.logins.remove(&current.email);
            }
        }

        let mut user = self.users.get_mut(user_id).ok_or(AuthError::UserNotFound)?;
        if let Some(display_name) = &update.display_name {
            user.display_name = display_name.trim().to_string();
        }
        if let Some(email) = new_email {
            user.email = email.to_string();
        }
        Ok(user.value().clone())
    }
}

/// `DashMap`-backed session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session as-is, replacing any session with the same id
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        metadata: &SessionMetadata,
    ) -> Result<Session, AuthError> {
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.to_owned(),
            created_at: Utc::now(),
            expires_at,
            user_agent: metadata.user_agent.clone(),
            ip: metadata.ip.clone(),
            fresh: false,
        };
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Session, AuthError> {
        self.sessions
            .get(session_id)
            .map(|session| session.value().clone())
            .ok_or(AuthError::SessionNotFound)
    }

    async fn update_expiry(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or(AuthError::SessionNotFound)?;
        session.expires_at = expires_at;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.sessions.retain(|_, session| session.user_id != user_id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, AuthError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}
