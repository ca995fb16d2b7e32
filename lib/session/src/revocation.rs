//! Per-principal revocation registry.
//!
//! Revoking a principal records an instant. Every session artifact issued at
//! or before that instant is treated as revoked when verified with
//! `check_revoked`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearthside_core::{SessionError, Uid};
use parking_lot::RwLock;
use rootcause::Report;
use std::collections::HashMap;

/// Storage for revocation instants.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Records that every session of `uid` issued at or before `at` is revoked.
    ///
    /// Revoking a principal without sessions is a successful write.
    async fn revoke(&self, uid: &Uid, at: DateTime<Utc>) -> Result<(), Report<SessionError>>;

    /// Returns the latest revocation instant for `uid`, if any.
    async fn valid_after(&self, uid: &Uid) -> Result<Option<DateTime<Utc>>, Report<SessionError>>;
}

/// Process-local revocation registry.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<Uid, DateTime<Utc>>>,
}

impl MemoryRevocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, uid: &Uid, at: DateTime<Utc>) -> Result<(), Report<SessionError>> {
        let mut entries = self.entries.write();
        let entry = entries.entry(uid.clone()).or_insert(at);
        // Revocation instants only move forward.
        if at > *entry {
            *entry = at;
        }
        Ok(())
    }

    async fn valid_after(&self, uid: &Uid) -> Result<Option<DateTime<Utc>>, Report<SessionError>> {
        Ok(self.entries.read().get(uid).copied())
    }
}
