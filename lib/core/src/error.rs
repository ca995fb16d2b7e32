//! Error handling foundation for hearthside.
//!
//! This module provides the `Result` type alias using rootcause and the
//! session error taxonomy shared by the client bridge and the server. Each
//! crate adds its own context via `.context()` as errors propagate.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors from creating, verifying, or revoking session artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The identity token was missing, expired, malformed, or badly signed.
    InvalidCredential { reason: String },
    /// The session artifact was missing, expired, revoked, or malformed.
    InvalidSession { reason: String },
    /// Required service configuration is absent. Fatal, never retried.
    ConfigurationMissing { key: String, reason: String },
    /// Network or IO failure talking to the identity platform.
    TransportFailure { details: String },
}

impl SessionError {
    /// Creates an invalid-credential error.
    #[must_use]
    pub fn invalid_credential(reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-session error.
    #[must_use]
    pub fn invalid_session(reason: impl Into<String>) -> Self {
        Self::InvalidSession {
            reason: reason.into(),
        }
    }

    /// Creates a configuration-missing error.
    #[must_use]
    pub fn configuration_missing(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport-failure error.
    #[must_use]
    pub fn transport(details: impl Into<String>) -> Self {
        Self::TransportFailure {
            details: details.into(),
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential { .. } => "invalid_credential",
            Self::InvalidSession { .. } => "invalid_session",
            Self::ConfigurationMissing { .. } => "configuration_missing",
            Self::TransportFailure { .. } => "transport_failure",
        }
    }

    /// Returns true if this error indicates a deployment problem rather than a bad request.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationMissing { .. })
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { reason } => {
                write!(f, "invalid identity credential: {reason}")
            }
            Self::InvalidSession { reason } => {
                write!(f, "invalid session: {reason}")
            }
            Self::ConfigurationMissing { key, reason } => {
                write!(f, "missing service configuration '{key}': {reason}")
            }
            Self::TransportFailure { details } => {
                write!(f, "identity platform transport failure: {details}")
            }
        }
    }
}

impl std::error::Error for SessionError {}
