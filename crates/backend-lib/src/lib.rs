// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core functionality of the `gatekeeper` authentication service:
//! session lifecycle, brute-force lockout and per-client rate limiting,
//! plus the HTTP plumbing that exposes them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use crate::auth::{AuthConfig, SessionManager};
use crate::config::Settings;
use crate::rate_limit::RateLimiter;
use crate::storage::{MemorySessionStore, MemoryUserStore, SessionStore, UserStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle manager
    pub sessions: Arc<SessionManager>,
    /// Limiter for login and registration
    pub auth_limiter: Arc<RateLimiter>,
    /// Limiter for authenticated API routes
    pub api_limiter: Arc<RateLimiter>,
    /// Settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state on top of the given stores
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        settings: Settings,
    ) -> Self {
        let manager = SessionManager::new(users, sessions, AuthConfig::from(&settings.auth));

        Self {
            sessions: Arc::new(manager),
            auth_limiter: Arc::new(settings.rate_limit.auth.build()),
            api_limiter: Arc::new(settings.rate_limit.api.build()),
            settings: Arc::new(settings),
        }
    }

    /// Create a new application state backed by in-memory stores
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
            settings,
        )
    }
}
