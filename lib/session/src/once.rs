//! Initialize-once guard for process-wide service handles.

use hearthside_core::SessionError;
use parking_lot::Mutex;
use rootcause::Report;
use std::sync::Arc;

enum Slot<T> {
    Empty,
    Ready(Arc<T>),
    Failed(SessionError),
}

/// Lazily constructs a shared value at most once.
///
/// Concurrent first callers serialize on the guard, so every caller observes
/// the same instance. A fatal (configuration) failure is latched: later calls
/// return the same error without running the initializer again. Non-fatal
/// failures leave the guard empty. Only [`InitOnce::reset`] clears the slot.
pub struct InitOnce<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> InitOnce<T> {
    /// Creates an empty guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Returns the shared value, constructing it on first call.
    ///
    /// # Errors
    ///
    /// Returns the initializer's error, or the latched fatal error from an
    /// earlier attempt.
    pub fn get_or_init<F>(&self, init: F) -> Result<Arc<T>, Report<SessionError>>
    where
        F: FnOnce() -> Result<T, SessionError>,
    {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Ready(value) => return Ok(Arc::clone(value)),
            Slot::Failed(err) => return Err(err.clone().into()),
            Slot::Empty => {}
        }

        match init() {
            Ok(value) => {
                let value = Arc::new(value);
                *slot = Slot::Ready(Arc::clone(&value));
                Ok(value)
            }
            Err(err) => {
                if err.is_fatal() {
                    *slot = Slot::Failed(err.clone());
                }
                Err(err.into())
            }
        }
    }

    /// Returns the value if it has been constructed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.slot.lock() {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Returns true if the value has been constructed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Ready(_))
    }

    /// Drops the cached value or latched failure.
    ///
    /// Intended for tests; callers holding an `Arc` keep their instance.
    pub fn reset(&self) {
        *self.slot.lock() = Slot::Empty;
    }
}

impl<T> Default for InitOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
