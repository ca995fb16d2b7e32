//! Keeps the server-side session in step with the client-side principal.

use crate::credential::CredentialSource;
use crate::error::BridgeError;
use crate::state::SyncState;
use crate::transport::SessionTransport;
use hearthside_core::{EventLogger, Principal, Uid};
use parking_lot::Mutex;
use rootcause::Report;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// What a single synchronization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A session was created for the principal.
    Created(Uid),
    /// The principal already had a session; nothing was sent.
    Unchanged,
    /// The server was asked to drop the session.
    Revoked,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(_) => f.write_str("created"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Revoked => f.write_str("revoked"),
        }
    }
}

/// Session bridge for one device or browser context.
pub struct SessionBridge {
    credential: Arc<dyn CredentialSource>,
    transport: Arc<dyn SessionTransport>,
    state: Mutex<SyncState>,
    logger: EventLogger,
}

impl SessionBridge {
    #[must_use]
    pub fn new(
        credential: Arc<dyn CredentialSource>,
        transport: Arc<dyn SessionTransport>,
        logger: EventLogger,
    ) -> Self {
        Self {
            credential,
            transport,
            state: Mutex::new(SyncState::new()),
            logger,
        }
    }

    /// Returns a snapshot of the synchronization state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.lock().clone()
    }

    /// Reconciles the server session with `principal`.
    ///
    /// A principal whose uid was already synced sends nothing. A different
    /// principal gets a fresh identity token exchanged for a session. No
    /// principal always sends a revoke, since a stale cookie may exist that
    /// this bridge never saw.
    ///
    /// Makes at most one call to the session endpoints.
    ///
    /// # Errors
    ///
    /// Returns the credential or transport failure. A failed create leaves the
    /// state untouched; the state is cleared whether or not a revoke succeeds.
    /// Callers log the error and carry on.
    pub async fn sync(
        &self,
        principal: Option<&Principal>,
    ) -> Result<SyncOutcome, Report<BridgeError>> {
        match principal {
            Some(principal) => {
                let uid = principal.uid();
                if self.state.lock().is_synced(uid) {
                    debug!(uid = %uid, "session already synced");
                    return Ok(SyncOutcome::Unchanged);
                }

                let token = self.credential.fresh_token(principal).await?;
                self.transport.create_session(&token).await?;
                self.state.lock().record(uid.clone());
                Ok(SyncOutcome::Created(uid.clone()))
            }
            None => {
                let result = self.transport.revoke_session().await;
                self.state.lock().clear();
                result.map(|()| SyncOutcome::Revoked)
            }
        }
    }

    /// Syncs and logs, never failing.
    async fn reconcile(&self, principal: Option<&Principal>) {
        let uid = principal.map(|p| p.uid().to_string());
        match self.sync(principal).await {
            Ok(outcome) => {
                self.logger.debug(
                    "session_synced",
                    json!({ "uid": uid, "outcome": outcome.to_string() }),
                );
            }
            Err(report) => {
                let payload = json!({
                    "uid": uid,
                    "code": report.current_context().kind(),
                });
                match report.current_context() {
                    BridgeError::Transport { .. } => {
                        self.logger.error("session_sync_failed", &report, payload);
                    }
                    BridgeError::Credential { .. } | BridgeError::Rejected { .. } => {
                        self.logger.warning("session_sync_failed", payload);
                    }
                }
            }
        }
    }

    /// Follows principal changes until the returned handle is unsubscribed.
    ///
    /// The current value is handled at once, as on initial mount. Changes are
    /// handled one at a time in order; values replaced before the bridge gets
    /// to them are skipped. Failures are logged and dropped.
    #[must_use]
    pub fn subscribe(
        self: &Arc<Self>,
        mut principals: watch::Receiver<Option<Principal>>,
    ) -> BridgeHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let bridge = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                let principal = principals.borrow_and_update().clone();
                bridge.reconcile(principal.as_ref()).await;

                tokio::select! {
                    _ = &mut stop_rx => break,
                    changed = principals.changed() => {
                        if changed.is_err() {
                            debug!("principal source closed");
                            break;
                        }
                    }
                }
            }
        });

        BridgeHandle {
            bridge: Arc::clone(self),
            stop: Some(stop_tx),
            task,
        }
    }
}

/// A running subscription. Dropping it also stops the task, without waiting
/// for a sync in flight.
pub struct BridgeHandle {
    bridge: Arc<SessionBridge>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stops following principal changes and returns the final state.
    ///
    /// A sync already in flight finishes first.
    pub async fn unsubscribe(mut self) -> SyncState {
        if let Some(stop) = self.stop.take() {
            // The task may already have exited on its own.
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            debug!(error = %e, "bridge task ended abnormally");
        }
        self.bridge.state()
    }
}
