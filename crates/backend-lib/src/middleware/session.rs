// crates/backend-lib/src/middleware/session.rs

//! Session authentication and role middleware.
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use gatekeeper_common::{Session, UserRecord, ADMIN_ROLE};
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Header carrying the session id for API clients
pub const SESSION_HEADER: &str = "x-session-id";

/// The validated session and its user, stored as a request extension
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    pub user: UserRecord,
}

/// Find the session id of a request.
///
/// Priority: `Authorization: Bearer`, then `X-Session-ID`, then the
/// `session_id` cookie. Sources can be disabled in [`AuthSettings`].
pub fn extract_session_id(headers: &HeaderMap, settings: &AuthSettings) -> Option<String> {
    if settings.allow_header_auth {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split_once(' '))
            .filter(|(scheme, _)| *scheme == "Bearer")
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty());
        if let Some(token) = bearer {
            return Some(token.to_string());
        }

        if let Some(id) = headers
            .get(SESSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(id.to_string());
        }
    }

    if settings.allow_cookie_auth {
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let found = value
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, id)| *name == SESSION_COOKIE && !id.is_empty());
            if let Some((_, id)) = found {
                return Some(id.to_string());
            }
        }
    }

    None
}

/// `Set-Cookie` value carrying the session id until the session expires
pub fn session_cookie(session: &Session, secure: bool) -> Result<HeaderValue, AuthError> {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
        session.id
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AuthError::Internal(format!("invalid session cookie: {e}")))
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("session_id=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("session_id=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

/// Require a valid session. Re-issues the cookie when the session was
/// refreshed, unless the handler already set one.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let settings = &state.settings.auth;
    let session_id =
        extract_session_id(request.headers(), settings).ok_or(AuthError::Unauthenticated)?;

    let (session, user) = state.sessions.validate_session(&session_id).await?;

    let refreshed_cookie = if session.fresh && request.method() != Method::OPTIONS {
        Some(session_cookie(&session, settings.cookie_secure)?)
    } else {
        None
    };

    request.extensions_mut().insert(AuthContext { session, user });
    let mut response = next.run(request).await;

    if let Some(cookie) = refreshed_cookie {
        if !response.headers().contains_key(SET_COOKIE) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }

    Ok(response)
}

/// Require the `admin` role. Must run inside [`require_session`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let is_admin = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.user.has_role(ADMIN_ROLE))
        .ok_or(AuthError::Unauthenticated)?;

    if !is_admin {
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(request).await)
}
