//! In-memory synchronization state.

use hearthside_core::Uid;

/// Remembers the principal most recently reconciled into a server session.
///
/// Matching `last_uid` only means the bridge believes the session is current.
/// The server re-verifies on every privileged request regardless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    last_uid: Option<Uid>,
}

impl SyncState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_uid(&self) -> Option<&Uid> {
        self.last_uid.as_ref()
    }

    /// Returns true if a session for `uid` is believed to exist.
    #[must_use]
    pub fn is_synced(&self, uid: &Uid) -> bool {
        self.last_uid.as_ref() == Some(uid)
    }

    pub(crate) fn record(&mut self, uid: Uid) {
        self.last_uid = Some(uid);
    }

    pub(crate) fn clear(&mut self) {
        self.last_uid = None;
    }
}
