//! The client-side credential source.

use crate::error::BridgeError;
use async_trait::async_trait;
use hearthside_core::{IdentityToken, Principal};
use rootcause::Report;

/// Issues identity tokens for the principal signed in on this device.
///
/// Implemented by the identity provider's client SDK binding.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Mints a fresh identity token for the current principal.
    ///
    /// # Errors
    ///
    /// Returns `Credential` if no principal is signed in or the provider
    /// refuses to mint a token.
    async fn fresh_token(&self, principal: &Principal)
    -> Result<IdentityToken, Report<BridgeError>>;
}
