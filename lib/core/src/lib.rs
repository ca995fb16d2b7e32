//! Core identity types and utilities for hearthside.
//!
//! This crate provides the types shared by the client-resident session bridge
//! and the server-resident session issuer and authorization gate:
//! - Principal and session identifiers (`Uid`, `SessionId`)
//! - The authenticated `Principal` and its elevated-role claim
//! - Bearer credentials (`IdentityToken`, `SessionArtifact`)
//! - The `SessionError` taxonomy and `Result` alias
//! - The structured event logger

pub mod credential;
pub mod error;
pub mod id;
pub mod log;
pub mod principal;

pub use credential::{IdentityToken, SessionArtifact};
pub use error::{Result, SessionError};
pub use id::{ParseIdError, SessionId, Uid};
pub use log::{EventLogger, LogRecord, LogSink, MemorySink, Severity, TracingSink};
pub use principal::Principal;
