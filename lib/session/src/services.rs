//! The process-wide platform services handle.

use crate::identity::IdentityVerifier;
use crate::keys::{JwksKeySource, KeySource};
use crate::revocation::RevocationStore;
use crate::session::SessionSigner;
use crate::settings::{ServiceAccount, ServiceSettings};
use hearthside_core::SessionError;
use std::sync::Arc;
use tracing::info;

/// Handles to the identity platform's credential, storage and revocation services.
///
/// Constructed once per process by [`crate::PlatformIssuer`].
pub struct Services {
    account: ServiceAccount,
    storage_bucket: String,
    signer: SessionSigner,
    identity: IdentityVerifier,
    revocations: Arc<dyn RevocationStore>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("project_id", &self.account.project_id())
            .field("storage_bucket", &self.storage_bucket)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Builds the handle from settings.
    ///
    /// `key_source` overrides the JWKS endpoint named in the identity settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the service account or storage bucket
    /// is absent or invalid, or the session lifetime is out of range.
    pub fn initialize(
        settings: &ServiceSettings,
        revocations: Arc<dyn RevocationStore>,
        key_source: Option<Arc<dyn KeySource>>,
    ) -> Result<Self, SessionError> {
        let account = settings.require_service_account()?;
        let storage_bucket = settings.require_storage_bucket()?.to_string();
        let ttl = settings.require_session_ttl()?;

        let keys = match key_source {
            Some(keys) => keys,
            None => Arc::new(JwksKeySource::new(settings.identity.jwks_url())?),
        };
        let identity = IdentityVerifier::new(
            keys,
            settings.identity.issuer_for(account.project_id()),
            settings.identity.audience_for(account.project_id()),
            settings.identity.leeway_seconds(),
        );
        let signer = SessionSigner::from_account(&account, ttl)?;

        info!(
            project_id = %account.project_id(),
            client_email = %account.client_email(),
            storage_bucket = %storage_bucket,
            "platform services initialized"
        );

        Ok(Self {
            account,
            storage_bucket,
            signer,
            identity,
            revocations,
        })
    }

    #[must_use]
    pub fn account(&self) -> &ServiceAccount {
        &self.account
    }

    #[must_use]
    pub fn storage_bucket(&self) -> &str {
        &self.storage_bucket
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityVerifier {
        &self.identity
    }

    #[must_use]
    pub fn revocations(&self) -> &dyn RevocationStore {
        self.revocations.as_ref()
    }
}
