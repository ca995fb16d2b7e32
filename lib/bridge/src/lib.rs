//! Client-resident session bridge for hearthside.
//!
//! Observes the principal signed in on the client and keeps the server-side
//! session cookie consistent with it:
//! - a newly seen principal gets a session created from a fresh identity token
//! - a principal that is already synced sends nothing
//! - no principal always sends a revoke
//!
//! Failures are logged and never surfaced; the server re-verifies every
//! privileged request independently.

pub mod bridge;
pub mod credential;
pub mod error;
pub mod state;
pub mod transport;

pub use bridge::{BridgeHandle, SessionBridge, SyncOutcome};
pub use credential::CredentialSource;
pub use error::BridgeError;
pub use state::SyncState;
pub use transport::{HttpSessionTransport, SESSION_PATH, SessionTransport};
