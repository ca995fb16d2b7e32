//! [`SessionIssuer`] backed by the identity platform.

use crate::issuer::SessionIssuer;
use crate::keys::KeySource;
use crate::once::InitOnce;
use crate::revocation::RevocationStore;
use crate::services::Services;
use crate::settings::ServiceSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearthside_core::{IdentityToken, Principal, SessionArtifact, SessionError, SessionId, Uid};
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Session issuer that lazily initializes the platform services on first use.
///
/// The services handle is built at most once per issuer. Applications create
/// one issuer at startup and share it.
pub struct PlatformIssuer {
    settings: ServiceSettings,
    revocations: Arc<dyn RevocationStore>,
    key_source: Option<Arc<dyn KeySource>>,
    services: InitOnce<Services>,
}

impl PlatformIssuer {
    /// Creates an issuer. Nothing is validated until first use.
    #[must_use]
    pub fn new(settings: ServiceSettings, revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            settings,
            revocations,
            key_source: None,
            services: InitOnce::new(),
        }
    }

    /// Uses `key_source` instead of the configured JWKS endpoint.
    #[must_use]
    pub fn with_key_source(mut self, key_source: Arc<dyn KeySource>) -> Self {
        self.key_source = Some(key_source);
        self
    }

    /// Returns the shared services handle, initializing it on first call.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the platform is not configured. The
    /// failure is latched; later calls return it without retrying.
    pub fn services(&self) -> Result<Arc<Services>, Report<SessionError>> {
        self.services.get_or_init(|| {
            Services::initialize(
                &self.settings,
                Arc::clone(&self.revocations),
                self.key_source.clone(),
            )
        })
    }

    /// Drops the cached services handle so the next call re-initializes.
    pub fn reset(&self) {
        self.services.reset();
    }
}

#[async_trait]
impl SessionIssuer for PlatformIssuer {
    #[instrument(skip_all)]
    async fn create_session(
        &self,
        token: &IdentityToken,
    ) -> Result<SessionArtifact, Report<SessionError>> {
        let services = self.services()?;
        if token.is_empty() {
            return Err(SessionError::invalid_credential("identity token is missing").into());
        }

        let claims = services.identity().verify(token.expose()).await?;
        let uid = Uid::new(claims.sub.clone())
            .map_err(|e| SessionError::invalid_credential(e.to_string()))?;
        let not_before = services
            .revocations()
            .valid_after(&uid)
            .await?
            .map(after_millisecond);
        let artifact = services.signer().issue(&uid, &claims, not_before)?;

        info!(uid = %uid, session_id = %artifact.session_id(), "session created");
        Ok(artifact)
    }

    #[instrument(skip_all, fields(check_revoked = check_revoked))]
    async fn verify_session(
        &self,
        artifact: &str,
        check_revoked: bool,
    ) -> Result<Principal, Report<SessionError>> {
        let services = self.services()?;
        if artifact.trim().is_empty() {
            return Err(SessionError::invalid_session("session artifact is missing").into());
        }

        let claims = services.signer().verify(artifact)?;
        let uid = Uid::new(claims.sub)
            .map_err(|e| SessionError::invalid_session(e.to_string()))?;
        let session_id: SessionId = claims
            .jti
            .parse()
            .map_err(|e: hearthside_core::ParseIdError| {
                SessionError::invalid_session(e.to_string())
            })?;

        if check_revoked {
            let valid_after = services.revocations().valid_after(&uid).await?;
            if valid_after.is_some_and(|at| session_id.issued_at() <= at) {
                debug!(uid = %uid, session_id = %session_id, "session was revoked");
                return Err(SessionError::invalid_session("session has been revoked").into());
            }
        }

        Ok(Principal::new(uid)
            .with_admin(claims.admin)
            .with_email(claims.email))
    }

    #[instrument(skip_all, fields(uid = %uid))]
    async fn revoke_session(&self, uid: &Uid) -> Result<(), Report<SessionError>> {
        let services = self.services()?;
        let now = Utc::now();
        let at = services
            .revocations()
            .valid_after(uid)
            .await?
            .map_or(now, |previous| now.max(after_millisecond(previous)));
        services.revocations().revoke(uid, at).await?;
        info!(uid = %uid, "sessions revoked");
        Ok(())
    }
}

/// Returns the start of the millisecond following `at`.
///
/// Session identifiers only carry millisecond timestamps. Sessions minted
/// after a revocation start here, and a later revocation reaches at least
/// this far, so each revocation covers exactly the sessions minted before it.
fn after_millisecond(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
        + chrono::Duration::milliseconds(1)
}
