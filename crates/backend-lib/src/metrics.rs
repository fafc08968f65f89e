// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const LOCKOUT_TRIGGERED: &str = "auth.lockout.triggered";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_REFRESHED: &str = "session.refreshed";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const SESSION_SWEPT: &str = "session.swept";
pub const RATE_LIMIT_REJECTED: &str = "ratelimit.rejected";
pub const RATE_LIMIT_CLIENTS: &str = "ratelimit.clients";
