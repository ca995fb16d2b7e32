//! Session issuer for hearthside.
//!
//! Exchanges identity-provider tokens for long-lived, server-signed session
//! artifacts, verifies those artifacts back into a [`Principal`], and revokes
//! them per principal. The platform services handle behind the issuer is
//! constructed at most once per process.
//!
//! [`Principal`]: hearthside_core::Principal

pub mod identity;
pub mod issuer;
pub mod keys;
pub mod once;
pub mod platform;
pub mod revocation;
pub mod services;
pub mod session;
pub mod settings;
pub mod testing;

pub use identity::{IdentityClaims, IdentityVerifier};
pub use issuer::SessionIssuer;
pub use keys::{JwksKeySource, KeySource, StaticKeySource, VerificationKey};
pub use once::InitOnce;
pub use platform::PlatformIssuer;
pub use revocation::{MemoryRevocationStore, RevocationStore};
pub use services::Services;
pub use session::{SessionClaims, SessionSigner};
pub use settings::{IdentitySettings, ServiceAccount, ServiceSettings};
