//! Session artifact minting and verification.
//!
//! Session artifacts are HS256 JWTs signed with a key derived from the
//! service-account private key. Only the process holding that credential can
//! mint or verify them.

use crate::identity::{IdentityClaims, describe};
use crate::settings::ServiceAccount;
use chrono::{DateTime, Duration, Utc};
use hearthside_core::{SessionArtifact, SessionError, SessionId, Uid};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rootcause::Report;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

const KEY_DERIVATION_LABEL: &[u8] = b"hearthside/session-signing/v1";

/// Claims carried by a session artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Session identifier; a ULID carrying the issuance instant.
    pub jti: String,
}

/// Mints and verifies session artifacts for one project.
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    key_id: String,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Derives the signing key from the service account.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the key cannot be derived.
    pub fn from_account(account: &ServiceAccount, ttl: Duration) -> Result<Self, SessionError> {
        let mut mac = HmacSha256::new_from_slice(account.private_key().expose_secret().as_bytes())
            .map_err(|e| {
                SessionError::configuration_missing(
                    crate::settings::SERVICE_ACCOUNT_KEY,
                    format!("unusable private key: {e}"),
                )
            })?;
        mac.update(KEY_DERIVATION_LABEL);
        mac.update(account.private_key_id().as_bytes());
        let secret = mac.finalize().into_bytes();

        Ok(Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            key_id: account.private_key_id().to_string(),
            issuer: format!("hearthside-session/{}", account.project_id()),
            audience: account.project_id().to_string(),
            ttl,
        })
    }

    /// Returns the lifetime of minted artifacts.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mints a session artifact for a verified identity.
    ///
    /// The artifact is issued no earlier than `not_before`, if given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` if the artifact cannot be signed.
    #[instrument(skip(self, identity), fields(uid = %uid))]
    pub fn issue(
        &self,
        uid: &Uid,
        identity: &IdentityClaims,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<SessionArtifact, Report<SessionError>> {
        let now = Utc::now();
        let issued_at = not_before.map_or(now, |floor| now.max(floor));
        let session_id = SessionId::minted_at(issued_at);
        let expires_at = issued_at + self.ttl;

        let claims = SessionClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: uid.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            auth_time: identity.auth_time.or(Some(identity.iat)),
            admin: identity.admin,
            email: identity.email.clone(),
            jti: session_id.to_string(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        let value = encode(&header, &claims, &self.encoding).map_err(|e| {
            SessionError::invalid_credential(format!("failed to sign session: {e}"))
        })?;

        debug!(session_id = %session_id, "session artifact minted");
        Ok(SessionArtifact::new(value, session_id, uid.clone(), expires_at))
    }

    /// Checks an artifact's signature, issuer, audience and expiry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSession` on any failure.
    pub fn verify(&self, artifact: &str) -> Result<SessionClaims, Report<SessionError>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(artifact, &self.decoding, &validation)
            .map_err(|e| SessionError::invalid_session(describe(e.kind())))?
            .claims;
        Ok(claims)
    }
}
