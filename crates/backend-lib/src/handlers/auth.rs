// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Authentication and session handlers.
use axum::{
    extract::{Path, State},
    http::{
        header::{SET_COOKIE, USER_AGENT},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use gatekeeper_common::{
    ChangePasswordRequest, CreateUserInput, LoginRequest, LoginResponse, RegisterRequest,
    SessionMetadata, UpdateProfileInput, UserRecord,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::validate_password_strength;
use crate::error::AuthError;
use crate::middleware::{clear_session_cookie, session_cookie, AuthContext, ClientIp};
use crate::AppState;

/// Liveness check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let identifier = request.identifier.trim();
    if identifier.is_empty() || request.password.is_empty() {
        return Err(AuthError::InvalidInput(
            "identifier and password are required".to_string(),
        ));
    }

    let metadata = SessionMetadata {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip: client_ip.map(|Extension(ClientIp(ip))| ip),
    };

    let (session, user) = state
        .sessions
        .login(identifier, &request.password, metadata)
        .await?;

    let cookie = session_cookie(&session, state.settings.auth.cookie_secure)?;
    let body = LoginResponse {
        session_id: session.id,
        expires_at: session.expires_at,
        user,
    };

    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRecord>), AuthError> {
    let identifier = request.identifier.trim().to_string();
    let email = request.email.trim().to_string();
    if identifier.is_empty() || email.is_empty() {
        return Err(AuthError::InvalidInput(
            "identifier and email are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AuthError::InvalidInput("invalid email address".to_string()));
    }
    if !validate_password_strength(&request.password, &state.settings.password_requirements) {
        return Err(AuthError::InvalidInput(
            "password does not meet the strength requirements".to_string(),
        ));
    }

    let display_name = if request.display_name.trim().is_empty() {
        identifier.clone()
    } else {
        request.display_name.trim().to_string()
    };

    let user = state
        .sessions
        .register(CreateUserInput {
            identifier,
            email,
            password: request.password,
            display_name,
            ..CreateUserInput::default()
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/me`
pub async fn me(Extension(ctx): Extension<AuthContext>) -> Json<Value> {
    Json(json!({
        "user": ctx.user,
        "session": {
            "id": ctx.session.id,
            "expires_at": ctx.session.expires_at,
            "refreshed": ctx.session.fresh,
        },
    }))
}

/// `PATCH /api/me`
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(mut request): Json<UpdateProfileInput>,
) -> Result<Json<UserRecord>, AuthError> {
    if let Some(display_name) = request.display_name.as_mut() {
        *display_name = display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AuthError::InvalidInput("display name must not be empty".to_string()));
        }
    }
    if let Some(email) = request.email.as_mut() {
        *email = email.trim().to_string();
        if !email.contains('@') {
            return Err(AuthError::InvalidInput("invalid email address".to_string()));
        }
    }

    let user = state.sessions.update_profile(&ctx.user, request).await?;
    Ok(Json(user))
}

/// `GET /api/sessions`
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>, AuthError> {
    let sessions = state.sessions.list_sessions(&ctx.user.id).await?;
    Ok(Json(json!({
        "current": ctx.session.id,
        "sessions": sessions,
    })))
}

/// `DELETE /api/sessions/{id}`
///
/// Revoking the current session also clears the cookie.
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(session_id): Path<String>,
) -> Result<Response, AuthError> {
    state
        .sessions
        .revoke_session(&ctx.user.id, &session_id)
        .await?;

    if session_id == ctx.session.id {
        let cookie = clear_session_cookie(state.settings.auth.cookie_secure);
        return Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response());
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `POST /api/logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Response, AuthError> {
    state.sessions.logout(&ctx.session.id).await?;
    let cookie = clear_session_cookie(state.settings.auth.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// `POST /api/logout-all`
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Response, AuthError> {
    state.sessions.logout_all(&ctx.user.id).await?;
    let cookie = clear_session_cookie(state.settings.auth.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// `POST /api/password`
///
/// Every session of the user is revoked on success, including the
/// current one.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Response, AuthError> {
    if !validate_password_strength(&request.new_password, &state.settings.password_requirements)
    {
        return Err(AuthError::InvalidInput(
            "password does not meet the strength requirements".to_string(),
        ));
    }

    state
        .sessions
        .change_password(&ctx.user, &request.current_password, &request.new_password)
        .await?;

    let cookie = clear_session_cookie(state.settings.auth.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// `GET /api/admin/dashboard`
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Json<Value> {
    let lockout = state.sessions.lockout();
    Json(json!({
        "admin": ctx.user.identifier,
        "tracked_identifiers": lockout.len(),
        "rate_limited_clients": {
            "auth": state.auth_limiter.len(),
            "api": state.api_limiter.len(),
        },
    }))
}
