//! Test fixtures: a local identity provider that mints HS256 identity tokens.
//!
//! Lets downstream crates exercise the real [`PlatformIssuer`] without
//! network access or provider credentials.

use crate::keys::{KeySource, StaticKeySource, VerificationKey};
use crate::platform::PlatformIssuer;
use crate::revocation::{MemoryRevocationStore, RevocationStore};
use crate::settings::{IdentitySettings, ServiceSettings};
use chrono::Utc;
use hearthside_core::IdentityToken;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

/// Key ID stamped on every token the test provider mints.
pub const TEST_KEY_ID: &str = "test-key";

/// A stand-in identity provider for one project.
#[derive(Debug, Clone)]
pub struct TestIdentityProvider {
    project_id: String,
    secret: Vec<u8>,
}

impl TestIdentityProvider {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let secret = format!("identity-secret-{project_id}").into_bytes();
        Self { project_id, secret }
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Expected token issuer.
    #[must_use]
    pub fn issuer_url(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Mints a valid ten-minute identity token.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn mint(&self, uid: &str, admin: bool) -> IdentityToken {
        let now = Utc::now().timestamp();
        self.mint_with(&json!({
            "iss": self.issuer_url(),
            "aud": self.project_id,
            "sub": uid,
            "iat": now,
            "exp": now + 600,
            "auth_time": now,
            "admin": admin,
        }))
    }

    /// Mints a token whose expiry is an hour in the past.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn expired(&self, uid: &str) -> IdentityToken {
        let now = Utc::now().timestamp();
        self.mint_with(&json!({
            "iss": self.issuer_url(),
            "aud": self.project_id,
            "sub": uid,
            "iat": now - 7200,
            "exp": now - 3600,
        }))
    }

    /// Signs arbitrary claims.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn mint_with(&self, claims: &JsonValue) -> IdentityToken {
        let mut header = Header::default();
        header.kid = Some(TEST_KEY_ID.to_string());
        let token = encode(&header, claims, &EncodingKey::from_secret(&self.secret))
            .expect("test identity token should sign");
        IdentityToken::new(token)
    }

    /// Key source that verifies this provider's tokens.
    #[must_use]
    pub fn key_source(&self) -> Arc<dyn KeySource> {
        Arc::new(
            StaticKeySource::default()
                .with_key(TEST_KEY_ID, VerificationKey::hs256(&self.secret)),
        )
    }

    /// Service settings for this provider's project.
    #[must_use]
    pub fn settings(&self) -> ServiceSettings {
        let account = json!({
            "type": "service_account",
            "project_id": self.project_id,
            "client_email": format!("sessions@{}.example", self.project_id),
            "private_key_id": "test-private-key-id",
            "private_key": format!("test-private-key-{}", self.project_id),
        });
        ServiceSettings::new(
            Some(SecretString::from(account.to_string())),
            Some(format!("{}.appspot.com", self.project_id)),
        )
        .with_identity(IdentitySettings::default().with_jwks_url("http://127.0.0.1:9/unused"))
    }

    /// Issuer wired to this provider with in-memory revocations.
    #[must_use]
    pub fn issuer(&self) -> PlatformIssuer {
        self.issuer_with_revocations(Arc::new(MemoryRevocationStore::new()))
    }

    /// Issuer wired to this provider and the given revocation store.
    #[must_use]
    pub fn issuer_with_revocations(&self, revocations: Arc<dyn RevocationStore>) -> PlatformIssuer {
        PlatformIssuer::new(self.settings(), revocations).with_key_source(self.key_source())
    }
}
