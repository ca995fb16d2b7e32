//! Verification keys for identity tokens.
//!
//! Identity tokens are signed by the identity provider. The issuer resolves
//! the token's `kid` header to a public key through a [`KeySource`].

use async_trait::async_trait;
use hearthside_core::SessionError;
use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use rootcause::Report;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// A key that can verify identity token signatures, pinned to one algorithm.
#[derive(Clone)]
pub struct VerificationKey {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl VerificationKey {
    /// Creates a verification key.
    #[must_use]
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        Self { key, algorithm }
    }

    /// Creates a shared-secret HS256 key.
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// Returns the decoding key.
    #[must_use]
    pub fn key(&self) -> &DecodingKey {
        &self.key
    }

    /// Returns the only algorithm this key accepts.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Resolves identity token key IDs to verification keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Returns the key for the given `kid` header value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` if no key matches, or `TransportFailure`
    /// if the key set could not be fetched.
    async fn key_for(&self, key_id: Option<&str>) -> Result<VerificationKey, Report<SessionError>>;
}

/// A fixed set of keys.
///
/// Used for emulators and tests where the provider's keys are known upfront.
#[derive(Debug, Default, Clone)]
pub struct StaticKeySource {
    keys: HashMap<String, VerificationKey>,
    fallback: Option<VerificationKey>,
}

impl StaticKeySource {
    /// Creates a source that answers every lookup with the same key.
    #[must_use]
    pub fn single(key: VerificationKey) -> Self {
        Self {
            keys: HashMap::new(),
            fallback: Some(key),
        }
    }

    /// Adds a key under a specific key ID.
    #[must_use]
    pub fn with_key(mut self, key_id: impl Into<String>, key: VerificationKey) -> Self {
        self.keys.insert(key_id.into(), key);
        self
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn key_for(&self, key_id: Option<&str>) -> Result<VerificationKey, Report<SessionError>> {
        key_id
            .and_then(|kid| self.keys.get(kid))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                SessionError::invalid_credential(format!(
                    "no verification key for key id {key_id:?}"
                ))
                .into()
            })
    }
}

/// Minimum time between JWKS refetches triggered by unknown key IDs.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

struct CachedKeys {
    keys: HashMap<String, VerificationKey>,
    fetched_at: Option<Instant>,
}

/// Keys fetched from the identity provider's JSON Web Key Set endpoint.
///
/// Keys are cached by `kid`. An unknown `kid` triggers one refetch, at most
/// once per [`MIN_REFRESH_INTERVAL`], so forged headers cannot hammer the
/// provider.
pub struct JwksKeySource {
    url: String,
    client: reqwest::Client,
    cache: RwLock<CachedKeys>,
}

impl JwksKeySource {
    /// Creates a key source for the given JWKS URL.
    ///
    /// # Errors
    ///
    /// Returns `TransportFailure` if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SessionError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
            cache: RwLock::new(CachedKeys {
                keys: HashMap::new(),
                fetched_at: None,
            }),
        })
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<HashMap<String, VerificationKey>, Report<SessionError>> {
        let set: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SessionError::transport(format!("failed to fetch key set: {e}")))?
            .json()
            .await
            .map_err(|e| SessionError::transport(format!("failed to parse key set: {e}")))?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                debug!("skipping key without kid");
                continue;
            };
            let algorithm = match jwk.common.key_algorithm {
                Some(alg) => match algorithm_for(alg) {
                    Some(algorithm) => algorithm,
                    None => {
                        debug!(kid = %kid, "skipping key with unsupported algorithm");
                        continue;
                    }
                },
                None => Algorithm::RS256,
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, VerificationKey::new(key, algorithm));
                }
                Err(e) => warn!(kid = %kid, error = %e, "skipping unusable key"),
            }
        }

        debug!(count = keys.len(), "fetched identity provider keys");
        Ok(keys)
    }
}

#[async_trait]
impl KeySource for JwksKeySource {
    async fn key_for(&self, key_id: Option<&str>) -> Result<VerificationKey, Report<SessionError>> {
        let kid = key_id
            .ok_or_else(|| SessionError::invalid_credential("token header has no key id"))?;

        {
            let cache = self.cache.read().await;
            if let Some(key) = cache.keys.get(kid) {
                return Ok(key.clone());
            }
            if cache
                .fetched_at
                .is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL)
            {
                return Err(unknown_key(kid));
            }
        }

        let mut cache = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(key) = cache.keys.get(kid) {
            return Ok(key.clone());
        }
        if cache
            .fetched_at
            .is_none_or(|at| at.elapsed() >= MIN_REFRESH_INTERVAL)
        {
            cache.keys = self.fetch().await?;
            cache.fetched_at = Some(Instant::now());
        }

        cache.keys.get(kid).cloned().ok_or_else(|| unknown_key(kid))
    }
}

fn unknown_key(kid: &str) -> Report<SessionError> {
    SessionError::invalid_credential(format!("unknown signing key '{kid}'")).into()
}

fn algorithm_for(alg: KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}
