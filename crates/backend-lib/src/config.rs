// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::auth::{AuthConfig, PasswordRequirements};
use crate::rate_limit::RateLimiter;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gatekeeper.toml";

/// Prefix of environment overrides, e.g. `GATEKEEPER_AUTH__MAX_FAILED_ATTEMPTS`
pub const ENV_PREFIX: &str = "GATEKEEPER_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    pub password_requirements: PasswordRequirements,
    pub bootstrap: BootstrapSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Session and lockout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Session validity window in seconds
    pub session_ttl_secs: u64,
    /// Refresh sessions with less than this many seconds left
    pub refresh_threshold_secs: u64,
    pub max_failed_attempts: u32,
    pub lockout_duration_secs: u64,
    /// Interval of the expired-session sweep; 0 disables it
    pub session_sweep_secs: u64,
    /// Interval of the stale-lockout sweep; 0 disables it
    pub lockout_sweep_secs: u64,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
    /// Accept session ids from `Authorization`/`X-Session-ID` headers
    pub allow_header_auth: bool,
    /// Accept session ids from the `session_id` cookie
    pub allow_cookie_auth: bool,
}

/// Rate limits for the two route groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Login and registration routes
    pub auth: LimiterSettings,
    /// Authenticated API routes
    pub api: LimiterSettings,
}

/// Token bucket parameters of one limiter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub requests_per_sec: f64,
    pub burst: u32,
    /// Lifetime of a per-client entry in seconds
    pub idle_expiry_secs: u64,
}

/// Optional admin account seeded at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    pub admin_identifier: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            log_level: "info".to_string(),
            auth: AuthSettings::default(),
            rate_limit: RateLimitSettings::default(),
            password_requirements: PasswordRequirements::default(),
            bootstrap: BootstrapSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl_secs: 60 * 60 * 24 * 30,      // 30 days
            refresh_threshold_secs: 60 * 60 * 24 * 15, // 15 days
            max_failed_attempts: 5,
            lockout_duration_secs: 30 * 60,
            session_sweep_secs: 60 * 60,
            lockout_sweep_secs: 0,
            cookie_secure: false,
            allow_header_auth: true,
            allow_cookie_auth: true,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            auth: LimiterSettings {
                requests_per_sec: 1.0,
                burst: 3,
                idle_expiry_secs: 60 * 60,
            },
            api: LimiterSettings {
                requests_per_sec: 10.0,
                burst: 20,
                idle_expiry_secs: 60 * 60,
            },
        }
    }
}

impl Settings {
    /// Load settings from `gatekeeper.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings: defaults, then the TOML file at `path` (if present),
    /// then `GATEKEEPER_` environment variables (`__` separates sections).
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }

        let auth = &self.auth;
        if auth.session_ttl_secs == 0 {
            bail!("auth.session_ttl_secs must be positive");
        }
        if auth.refresh_threshold_secs >= auth.session_ttl_secs {
            bail!("auth.refresh_threshold_secs must be below auth.session_ttl_secs");
        }
        if auth.max_failed_attempts == 0 {
            bail!("auth.max_failed_attempts must be positive");
        }
        if auth.lockout_duration_secs == 0 {
            bail!("auth.lockout_duration_secs must be positive");
        }

        for (name, limiter) in [("auth", &self.rate_limit.auth), ("api", &self.rate_limit.api)] {
            if !limiter.requests_per_sec.is_finite() || limiter.requests_per_sec <= 0.0 {
                bail!("rate_limit.{name}.requests_per_sec must be a positive number");
            }
            if limiter.burst == 0 {
                bail!("rate_limit.{name}.burst must be positive");
            }
            if limiter.idle_expiry_secs == 0 {
                bail!("rate_limit.{name}.idle_expiry_secs must be positive");
            }
        }

        if self.password_requirements.min_length < 8 {
            bail!("password_requirements.min_length must be at least 8");
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

impl AuthSettings {
    pub fn session_sweep_interval(&self) -> Option<Duration> {
        (self.session_sweep_secs > 0).then(|| Duration::from_secs(self.session_sweep_secs))
    }

    pub fn lockout_sweep_interval(&self) -> Option<Duration> {
        (self.lockout_sweep_secs > 0).then(|| Duration::from_secs(self.lockout_sweep_secs))
    }
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            session_duration: Duration::from_secs(settings.session_ttl_secs),
            refresh_threshold: Duration::from_secs(settings.refresh_threshold_secs),
            max_failed_attempts: settings.max_failed_attempts,
            lockout_duration: Duration::from_secs(settings.lockout_duration_secs),
        }
    }
}

impl LimiterSettings {
    /// Build the limiter described by these settings
    pub fn build(&self) -> RateLimiter {
        RateLimiter::new(
            self.requests_per_sec,
            self.burst,
            Duration::from_secs(self.idle_expiry_secs),
        )
    }
}
