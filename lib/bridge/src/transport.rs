//! Calls from the client to the server's session endpoints.

use crate::error::BridgeError;
use async_trait::async_trait;
use hearthside_core::IdentityToken;
use reqwest::{Response, StatusCode};
use rootcause::Report;
use std::time::Duration;
use tracing::{debug, instrument};

/// Path of the session endpoints, relative to the application origin.
pub const SESSION_PATH: &str = "/api/session";

/// The server's create and revoke session operations, as seen from the client.
///
/// Cookie placement and removal are the server's responsibility; the
/// transport only needs to carry the cookie jar.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Exchanges an identity token for a session cookie.
    async fn create_session(&self, token: &IdentityToken) -> Result<(), Report<BridgeError>>;

    /// Asks the server to revoke and clear the session cookie.
    async fn revoke_session(&self) -> Result<(), Report<BridgeError>>;
}

/// [`SessionTransport`] over HTTP with a persistent cookie store.
#[derive(Debug, Clone)]
pub struct HttpSessionTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSessionTransport {
    /// Creates a transport for the application at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, Report<BridgeError>> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BridgeError::transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Uses an existing client. The client should have a cookie store enabled.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{SESSION_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Returns the session endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn create_session(&self, token: &IdentityToken) -> Result<(), Report<BridgeError>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("create session request failed: {e}")))?;
        check(response).await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn revoke_session(&self) -> Result<(), Report<BridgeError>> {
        let response = self
            .client
            .delete(&self.endpoint)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("revoke session request failed: {e}")))?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<(), Report<BridgeError>> {
    let status = response.status();
    if status.is_success() {
        debug!(status = status.as_u16(), "session endpoint succeeded");
        return Ok(());
    }
    Err(classify(status, response.text().await.ok().as_deref()).into())
}

/// Maps a failed response to a bridge error.
fn classify(status: StatusCode, body: Option<&str>) -> BridgeError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => BridgeError::Rejected {
            status: status.as_u16(),
            code: body
                .and_then(|body| serde_json::from_str::<serde_json::Value>(body).ok())
                .and_then(|json| json.get("code")?.as_str().map(str::to_string)),
        },
        _ => BridgeError::transport(format!("session endpoint returned {status}")),
    }
}
