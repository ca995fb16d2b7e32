//! Session endpoints and the authorization gate for the hearthside server.
//!
//! This module provides:
//! - The create, verify and delete session endpoints behind `/api/session`
//! - The authorization gate that guards privileged pages
//! - A Postgres-backed revocation registry
//!
//! # Authorization Model
//!
//! The session artifact in the `__session` cookie is the only credential the
//! server trusts. Every privileged request re-verifies it against the issuer
//! with revocation checking; nothing the client says about its own identity
//! is consulted. Admin-scoped routes additionally require the administrator
//! claim embedded in the artifact at issuance.

pub mod db;
pub mod gate;
pub mod routes;

pub use gate::{AuthorizationDecision, AuthorizationGate, CurrentPrincipal, RouteScope, authorize};
pub use routes::{create_session, delete_session, verify_session};

use crate::config::{GateConfig, SessionConfig};
use crate::error::ApiError;
use hearthside_core::{EventLogger, SessionError};
use hearthside_session::SessionIssuer;
use rootcause::Report;
use serde_json::json;
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "__session";

/// Shared application state.
pub struct AppState {
    /// Session issuer shared by every request.
    pub issuer: Arc<dyn SessionIssuer>,
    /// Guard for privileged routes.
    pub gate: AuthorizationGate,
    /// Session configuration.
    pub session_config: SessionConfig,
    /// Structured event logger.
    pub logger: EventLogger,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        issuer: Arc<dyn SessionIssuer>,
        session_config: SessionConfig,
        gate_config: GateConfig,
        logger: EventLogger,
    ) -> Self {
        let gate = AuthorizationGate::new(
            Arc::clone(&issuer),
            gate_config,
            session_config.verify_timeout(),
            logger.clone(),
        );
        Self {
            issuer,
            gate,
            session_config,
            logger,
        }
    }

    /// Logs a failed session operation and converts it to a response.
    pub(crate) fn reject(&self, operation: &str, report: &Report<SessionError>) -> ApiError {
        let err = ApiError::from(report);
        let payload = json!({ "operation": operation, "code": err.code() });
        match report.current_context() {
            SessionError::ConfigurationMissing { .. } => {
                self.logger.critical("session_service_unavailable", report, payload);
            }
            SessionError::TransportFailure { .. } => {
                self.logger.error("session_operation_failed", report, payload);
            }
            SessionError::InvalidCredential { .. } | SessionError::InvalidSession { .. } => {
                self.logger.info("session_rejected", payload);
            }
        }
        err
    }
}
