// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatekeeper_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Authentication outcomes and failures.
///
/// The first five variants are the terminal business decisions of the
/// session manager. They are never retried internally.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not active")]
    UserNotActive,

    #[error("account temporarily locked")]
    AccountLocked,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("identifier already registered")]
    IdentifierTaken,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("authentication required")]
    Unauthenticated,

    #[error("access denied")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Opaque failure from a storage collaborator, passed through untouched
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::UserNotActive | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::AccountLocked | AuthError::RateLimitExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::IdentifierTaken => StatusCode::CONFLICT,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) | AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "AUTH_001",
            AuthError::UserNotActive => "AUTH_002",
            AuthError::AccountLocked => "AUTH_003",
            AuthError::Unauthenticated => "AUTH_004",
            AuthError::Forbidden => "AUTH_005",
            AuthError::SessionNotFound => "SESS_001",
            AuthError::SessionExpired => "SESS_002",
            AuthError::UserNotFound => "USER_001",
            AuthError::IdentifierTaken => "USER_002",
            AuthError::RateLimitExceeded => "RATE_001",
            AuthError::InvalidInput(_) => "VAL_001",
            AuthError::Internal(_) => "INT_001",
            AuthError::Storage(_) => "STORE_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials".to_string(),
            AuthError::UserNotActive => "Account is not active".to_string(),
            AuthError::AccountLocked => {
                "Account temporarily locked, please try again later".to_string()
            }
            AuthError::SessionNotFound | AuthError::Unauthenticated => {
                "Authentication required".to_string()
            }
            AuthError::SessionExpired => "Session expired".to_string(),
            AuthError::Forbidden => "Access denied".to_string(),
            AuthError::UserNotFound => "Resource not found".to_string(),
            AuthError::IdentifierTaken => "Identifier already registered".to_string(),
            AuthError::RateLimitExceeded => {
                "Rate limit exceeded, please try again later".to_string()
            }
            AuthError::InvalidInput(_) => "Invalid input provided".to_string(),
            AuthError::Internal(_) | AuthError::Storage(_) => {
                "An internal server error occurred".to_string()
            }
        }
    }

    /// Whether this is one of the terminal session-manager outcomes
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::UserNotActive
                | AuthError::AccountLocked
                | AuthError::SessionNotFound
                | AuthError::SessionExpired
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if self.is_terminal() {
            tracing::debug!(error = %self, "request denied");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("background task failed: {err}"))
    }
}
