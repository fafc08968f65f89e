// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{rate_limit, require_admin, require_session};
use crate::AppState;

/// Create the application router
///
/// `/auth` routes sit behind the auth limiter. `/api` routes sit behind the
/// api limiter and require a session; `/api/admin` additionally requires
/// the admin role.
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .layer(from_fn_with_state(
            Arc::clone(&state.auth_limiter),
            rate_limit,
        ));

    let admin_routes = Router::new()
        .route("/dashboard", get(handlers::admin_dashboard))
        .route_layer(from_fn(require_admin));

    let api_routes = Router::new()
        .route("/me", get(handlers::me).patch(handlers::update_profile))
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/{id}", delete(handlers::revoke_session))
        .route("/logout", post(handlers::logout))
        .route("/logout-all", post(handlers::logout_all))
        .route("/password", post(handlers::change_password))
        .nest("/admin", admin_routes)
        .route_layer(from_fn_with_state(Arc::clone(&state), require_session))
        .layer(from_fn_with_state(
            Arc::clone(&state.api_limiter),
            rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
