//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that maps every domain failure to a
//! stable JSON body (`{"message": ...}`) and captures server errors to
//! Sentry before responding. All route handlers return `Result<T, ApiError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::account::AccountError;
use crate::services::confirmation::CodeError;
use crate::services::csrf::CsrfError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown user or wrong password - deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No live session on a session-gated endpoint.
    #[error("authentication required")]
    Unauthenticated,

    /// CSRF token missing, expired, or mismatched.
    #[error("csrf error: {0}")]
    Csrf(#[from] CsrfError),

    /// Confirmation code not found, expired, or mismatched.
    #[error("confirmation code error: {0}")]
    ConfirmationCode(#[from] CodeError),

    /// Wrong role or non-owner.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate email or username.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence or transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ConfirmationCode(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated | Self::Csrf(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client.
    ///
    /// Internal errors are collapsed to a generic message; the detail is
    /// logged and captured server-side only. Confirmation-code messages
    /// distinguish not-found/expired/mismatch for user feedback but never
    /// whether the email has an account.
    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_string(),
            Self::InvalidCredentials => "invalid credentials".to_string(),
            Self::Unauthenticated => "authentication required".to_string(),
            Self::Csrf(_) => "CSRF token missing, invalid or expired".to_string(),
            Self::Validation(msg) | Self::Forbidden(msg) | Self::Conflict(msg) => msg.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::ConfirmationCode(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            message: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Database(e) => Self::Internal(format!("database error: {e}")),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => Self::InvalidCredentials,
            AccountError::Code(e) => Self::ConfirmationCode(e),
            AccountError::Validation(msg) => Self::Validation(msg),
            AccountError::RoleNotAllowed => {
                Self::Validation("role must be buyer or seller".to_string())
            }
            AccountError::Repository(e) => e.into(),
            AccountError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            status_of(ApiError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Csrf(CsrfError::Missing)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::ConfirmationCode(CodeError::Expired)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Forbidden("nope".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::NotFound("product".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Conflict("email already exists".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_sent_to_clients() {
        let err = ApiError::Internal("connection refused to db.internal:5432".into());
        assert_eq!(err.client_message(), "an internal error occurred");
    }

    #[test]
    fn unknown_user_and_wrong_password_share_one_message() {
        // Both failure causes collapse to the same variant before they reach
        // the boundary, so status and body are identical by construction.
        let absent = ApiError::from(AccountError::InvalidCredentials);
        let mismatch = ApiError::from(AccountError::InvalidCredentials);
        assert_eq!(absent.client_message(), mismatch.client_message());
        assert_eq!(absent.status(), mismatch.status());
    }

    #[test]
    fn repository_conflict_keeps_its_message() {
        let err = ApiError::from(RepositoryError::Conflict(
            "email address is not available".into(),
        ));
        assert_eq!(err.client_message(), "email address is not available");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
