//! Cooperative cancellation shared between the signal handler and the migration worker.
//!
//! Notes:
//! - `request()` is idempotent and wakes every thread parked in `wait_timeout`.
//! - Only the sync idle wait observes the token; once files are being touched a
//!   run always proceeds to a terminal state.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    requested: Mutex<bool>,
    cv: Condvar,
}

/// Cloneable cancellation flag with a wakeable wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all waiters.
    pub fn request(&self) {
        let mut flag = match self.inner.requested.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *flag = true;
        self.inner.cv.notify_all();
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        match self.inner.requested.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Sleep for up to `timeout`, returning early when cancellation is requested.
    /// Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = match self.inner.requested.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard {
            return true;
        }
        let res = self
            .inner
            .cv
            .wait_timeout_while(guard, timeout, |requested| !*requested);
        match res {
            Ok((g, _)) => *g,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}
