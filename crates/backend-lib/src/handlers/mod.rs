// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;

pub use auth::{
    admin_dashboard, change_password, health, list_sessions, login, logout, logout_all, me,
    register, revoke_session, update_profile,
};
