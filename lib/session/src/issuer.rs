//! The session issuer boundary.

use async_trait::async_trait;
use hearthside_core::{IdentityToken, Principal, SessionArtifact, SessionError, Uid};
use rootcause::Report;

/// Exchanges identity tokens for session artifacts and back.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Verifies an identity token and mints a session artifact for its subject.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` if the token is missing, expired, malformed or
    /// badly signed. `ConfigurationMissing` if the platform is not configured.
    async fn create_session(
        &self,
        token: &IdentityToken,
    ) -> Result<SessionArtifact, Report<SessionError>>;

    /// Verifies a session artifact and returns the principal it was issued to.
    ///
    /// With `check_revoked`, an artifact issued at or before the principal's
    /// latest revocation is rejected.
    ///
    /// # Errors
    ///
    /// `InvalidSession` if the artifact is missing, malformed, expired or revoked.
    async fn verify_session(
        &self,
        artifact: &str,
        check_revoked: bool,
    ) -> Result<Principal, Report<SessionError>>;

    /// Invalidates every outstanding session artifact of `uid`.
    ///
    /// Succeeds when the principal has no sessions.
    ///
    /// # Errors
    ///
    /// `TransportFailure` if the revocation could not be recorded.
    async fn revoke_session(&self, uid: &Uid) -> Result<(), Report<SessionError>>;
}
