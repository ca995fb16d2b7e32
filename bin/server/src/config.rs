//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`IdentitySettings`] for identity token verification settings.

use chrono::Duration;
use hearthside_session::{IdentitySettings, ServiceSettings};
use secrecy::SecretString;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Deployment environment name, stamped on every log record.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// PostgreSQL URL for the revocation registry. In-memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Service-account credential blob (JSON).
    #[serde(default)]
    pub service_account: Option<SecretString>,

    /// Object storage bucket identifier.
    #[serde(default)]
    pub storage_bucket: Option<String>,

    /// Identity token verification.
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Route guard configuration.
    #[serde(default)]
    pub gate: GateConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Upper bound on a single session verification, in milliseconds.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
}

fn default_session_duration_minutes() -> i64 {
    5 * 24 * 60
}

fn default_secure_cookies() -> bool {
    true
}

fn default_verify_timeout_ms() -> u64 {
    5_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            secure_cookies: default_secure_cookies(),
            verify_timeout_ms: default_verify_timeout_ms(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.verify_timeout_ms)
    }
}

/// Which paths the authorization gate protects.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Path prefixes that require a verified session.
    #[serde(default = "default_privileged_prefixes")]
    pub privileged_prefixes: Vec<String>,

    /// Path prefixes that additionally require the administrator claim.
    #[serde(default = "default_admin_prefixes")]
    pub admin_prefixes: Vec<String>,

    /// Where unauthenticated visitors are sent.
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

fn default_privileged_prefixes() -> Vec<String> {
    vec!["/dashboard".to_string(), "/admin".to_string()]
}

fn default_admin_prefixes() -> Vec<String> {
    vec!["/admin".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            privileged_prefixes: default_privileged_prefixes(),
            admin_prefixes: default_admin_prefixes(),
            login_path: default_login_path(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("gate.privileged_prefixes")
                    .with_list_parse_key("gate.admin_prefixes"),
            )
            .build()?
            .try_deserialize()
    }

    /// Settings for the platform session issuer.
    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings::new(self.service_account.clone(), self.storage_bucket.clone())
            .with_identity(self.identity.clone())
            .with_session_ttl(Duration::minutes(self.session.duration_minutes))
    }
}
