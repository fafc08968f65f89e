// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `gatekeeper` HTTP surface.

pub mod rate_limit;
pub mod session;

pub use rate_limit::{client_ip, rate_limit, ClientIp};
pub use session::{
    clear_session_cookie, extract_session_id, require_admin, require_session, session_cookie,
    AuthContext, SESSION_COOKIE, SESSION_HEADER,
};
