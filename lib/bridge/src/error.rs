//! Error types for the session bridge.
//!
//! None of these ever reach the user. The bridge returns them from `sync`
//! and its subscription loop logs and discards them.

use std::fmt;

/// Failures while synchronizing the server session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The credential source could not produce a fresh identity token.
    Credential { reason: String },
    /// The session issuer refused the request.
    Rejected { status: u16, code: Option<String> },
    /// The issuer could not be reached or answered unexpectedly.
    Transport { details: String },
}

impl BridgeError {
    #[must_use]
    pub fn credential(reason: impl Into<String>) -> Self {
        Self::Credential {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transport(details: impl Into<String>) -> Self {
        Self::Transport {
            details: details.into(),
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Credential { .. } => "credential_unavailable",
            Self::Rejected { .. } => "session_rejected",
            Self::Transport { .. } => "transport_failure",
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential { reason } => {
                write!(f, "could not obtain identity token: {reason}")
            }
            Self::Rejected { status, code } => match code {
                Some(code) => write!(f, "session issuer rejected request ({status}, {code})"),
                None => write!(f, "session issuer rejected request ({status})"),
            },
            Self::Transport { details } => {
                write!(f, "session issuer unreachable: {details}")
            }
        }
    }
}

impl std::error::Error for BridgeError {}
