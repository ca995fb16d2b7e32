//! Error responses for the session endpoints.
//!
//! Handlers return [`ApiError`], which renders as a JSON payload of the form
//! `{"error": <message>, "code": <code>}`. Messages are user-safe; details
//! are logged where the error is produced.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hearthside_core::SessionError;
use rootcause::Report;
use serde::Serialize;
use std::fmt;

/// A failed API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The session issuer refused or failed the operation.
    Session(SessionError),
    /// The request body could not be parsed.
    BadRequest { reason: String },
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(SessionError::InvalidCredential { .. })
            | Self::Session(SessionError::InvalidSession { .. }) => StatusCode::UNAUTHORIZED,
            Self::Session(SessionError::TransportFailure { .. }) => StatusCode::BAD_GATEWAY,
            Self::Session(SessionError::ConfigurationMissing { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Session(err) => err.kind(),
            Self::BadRequest { .. } => "bad_request",
        }
    }

    /// Returns the message shown to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Session(SessionError::ConfigurationMissing { .. }) => {
                "session service is not configured".to_string()
            }
            Self::Session(SessionError::TransportFailure { .. }) => {
                "identity platform is unavailable".to_string()
            }
            Self::Session(err) => err.to_string(),
            Self::BadRequest { reason } => format!("malformed request: {reason}"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(err) => write!(f, "{err}"),
            Self::BadRequest { reason } => write!(f, "malformed request: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<&Report<SessionError>> for ApiError {
    fn from(report: &Report<SessionError>) -> Self {
        Self::Session(report.current_context().clone())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}
