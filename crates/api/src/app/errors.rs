//! Error type returned by every handler and middleware.
//!
//! Handlers only decide the status and message. The final body (JSON or HTML,
//! with or without details) is rendered by
//! [`crate::middleware::render_errors`] from the [`ErrorReport`] attached here.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use tourbook_auth::{AuthzError, PasswordError, TokenError};
use tourbook_core::DomainError;
use tourbook_infra::{MailError, PaymentError, RepositoryError, StoreError};
use tourbook_query::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Expected failure with a message that is safe to show.
    #[error("{message}")]
    Operational { status: StatusCode, message: String },

    /// Anything else. Logged, and hidden from clients in production.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Operational { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `"fail"` for client errors, `"error"` for everything else.
pub fn status_word(status: StatusCode) -> &'static str {
    if status.is_client_error() { "fail" } else { "error" }
}

/// What went wrong, attached to error responses for the renderer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub operational: bool,
    /// Debug rendering of the error chain.
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let report = ErrorReport {
            status,
            message: self.to_string(),
            operational: matches!(self, Self::Operational { .. }),
            detail: format!("{self:?}"),
        };
        let mut response = (
            status,
            Json(json!({ "status": status_word(status), "message": report.message })),
        )
            .into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Duplicate { .. } | DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) | DomainError::InvalidId(_) | DomainError::Malformed(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Domain(e) => e.into(),
            RepositoryError::Query(e) => e.into(),
            RepositoryError::Store(e @ StoreError::Duplicate { .. }) => {
                Self::new(StatusCode::CONFLICT, e.to_string())
            }
            RepositoryError::Store(e) => Self::Internal(e.into()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::Expired => Self::unauthorized(err.to_string()),
            TokenError::Signing(_) => Self::Internal(err.into()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        Self::forbidden(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::Internal(err.into())
    }
}
