// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod lockout;
pub mod password;
pub mod session;
pub mod token_generator;

pub use lockout::{LockoutTracker, DEFAULT_LOCKOUT_DURATION, DEFAULT_MAX_FAILED_ATTEMPTS};
pub use password::{
    hash_password_with, validate_password_strength, verify_password, PasswordRequirements,
    MIN_PASSWORD_LENGTH,
};
pub use session::{
    AuthConfig, SessionManager, DEFAULT_REFRESH_THRESHOLD, DEFAULT_SESSION_DURATION,
};
pub use token_generator::{generate_session_id, SESSION_ID_BYTES};
