//! Credentials exchanged between the client, the server, and the identity provider.
//!
//! Both the identity token and the session artifact are bearer secrets. They are
//! held in [`SecretString`] so they never show up in `Debug` output or logs.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::id::{SessionId, Uid};

/// A short-lived, provider-signed proof of the principal's identity.
///
/// Obtained on demand from the credential source, sent once as a bearer
/// credential to the create-session endpoint, and never persisted.
#[derive(Debug, Clone)]
pub struct IdentityToken(SecretString);

impl IdentityToken {
    /// Wraps a raw identity token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw token for transmission.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Returns true if the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }
}

/// A long-lived, server-signed session credential.
///
/// The value is opaque to every party except the issuer that signed it. It is
/// delivered to the client as the `__session` cookie.
#[derive(Debug, Clone)]
pub struct SessionArtifact {
    value: SecretString,
    session_id: SessionId,
    uid: Uid,
    expires_at: DateTime<Utc>,
}

impl SessionArtifact {
    /// Creates an artifact from its signed value and metadata.
    #[must_use]
    pub fn new(value: String, session_id: SessionId, uid: Uid, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: SecretString::from(value),
            session_id,
            uid,
            expires_at,
        }
    }

    /// Returns the signed value to be placed in the cookie.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Returns the identifier of this session.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the principal this session was issued to.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Returns when the artifact expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the remaining lifetime, clamped at zero.
    #[must_use]
    pub fn max_age(&self) -> chrono::Duration {
        (self.expires_at - Utc::now()).max(chrono::Duration::zero())
    }
}
