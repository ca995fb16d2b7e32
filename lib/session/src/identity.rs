//! Identity token verification.

use crate::keys::KeySource;
use chrono::Utc;
use hearthside_core::SessionError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Claims read from a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Principal identifier.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// When the principal last authenticated interactively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
    /// Elevated-role claim.
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verifies identity tokens against the provider's signing keys.
pub struct IdentityVerifier {
    keys: Arc<dyn KeySource>,
    issuer: String,
    audience: String,
    leeway_seconds: u64,
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

impl IdentityVerifier {
    /// Creates a verifier expecting the given issuer and audience.
    #[must_use]
    pub fn new(
        keys: Arc<dyn KeySource>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds,
        }
    }

    /// Verifies an identity token's signature and claims.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` if the token is malformed, expired, badly
    /// signed, or issued for another project. Returns `TransportFailure` if
    /// the signing keys could not be fetched.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, Report<SessionError>> {
        if token.trim().is_empty() {
            return Err(SessionError::invalid_credential("identity token is empty").into());
        }

        let header = decode_header(token)
            .map_err(|e| SessionError::invalid_credential(describe(e.kind())))?;
        let key = self.keys.key_for(header.kid.as_deref()).await?;

        if header.alg != key.algorithm() {
            return Err(SessionError::invalid_credential(format!(
                "token algorithm {:?} does not match signing key",
                header.alg
            ))
            .into());
        }

        let mut validation = Validation::new(key.algorithm());
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation.leeway = self.leeway_seconds;

        let claims = decode::<IdentityClaims>(token, key.key(), &validation)
            .map_err(|e| SessionError::invalid_credential(describe(e.kind())))?
            .claims;

        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if claims.iat > Utc::now().timestamp().saturating_add(leeway) {
            return Err(SessionError::invalid_credential("token issued in the future").into());
        }
        if claims.sub.trim().is_empty() {
            return Err(SessionError::invalid_credential("token subject is empty").into());
        }

        debug!(sub = %claims.sub, admin = claims.admin, "identity token verified");
        Ok(claims)
    }
}

/// Renders a JWT failure as a user-safe reason.
pub(crate) fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "token has expired".to_string(),
        ErrorKind::InvalidSignature => "signature is invalid".to_string(),
        ErrorKind::InvalidAudience => "token audience mismatch".to_string(),
        ErrorKind::InvalidIssuer => "token issuer mismatch".to_string(),
        ErrorKind::InvalidAlgorithm => "token algorithm not allowed".to_string(),
        ErrorKind::ImmatureSignature => "token is not yet valid".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("token is missing claim '{claim}'"),
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => "token is malformed".to_string(),
        other => format!("token rejected: {other:?}"),
    }
}
