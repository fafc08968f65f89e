// ================
// crates/common/src/lib.rs
// ================
//! Common types shared between the `gatekeeper` server and its clients.
//! This module defines the user and session records exchanged with storage
//! adapters, and the JSON bodies of the HTTP authentication endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role assigned to users created through self-registration
pub const DEFAULT_ROLE: &str = "user";

/// Role allowed through the admin routes
pub const ADMIN_ROLE: &str = "admin";

/// A user as seen by the authentication core.
///
/// Owned and persisted by a user store; the core only reads it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Opaque user id
    pub id: String,
    /// Login identifier (username); also the lockout key
    pub identifier: String,
    /// Email address, usable as an alternative login identifier
    #[serde(default)]
    pub email: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
    /// Salted password hash. Never serialized outward.
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    /// Role used for simple role matching (`user`, `admin`, ...)
    pub role: String,
    /// Inactive users can neither log in nor use existing sessions
    pub active: bool,
    /// Extra adapter-specific fields
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl UserRecord {
    /// Whether the user holds the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// An authentication session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    /// Opaque, URL-safe random id
    pub id: String,
    /// Owning user id
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Absolute expiry; moved forward by sliding refresh
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// True when the session was created or refreshed by the current call,
    /// i.e. the session handle should be re-issued to the client.
    #[serde(default)]
    pub fresh: bool,
}

impl Session {
    /// Whether the session has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Client metadata recorded on session creation
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

/// Input for creating a user through a user store
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CreateUserInput {
    pub identifier: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Defaults to [`DEFAULT_ROLE`] when absent
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Successful login response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserRecord,
}

/// Body of `POST /auth/register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub identifier: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

/// Body of `POST /api/password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body of `PATCH /api/me`; absent fields are left unchanged
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProfileInput {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Error payload returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
