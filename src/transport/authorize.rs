//! Authorize timer: a one-shot deadline that force-closes an unbound
//! connection, cancelled the moment `Bind` succeeds. Ported from
//! `checkAuthorize`/`uncheckAuthorize`'s atomic-swap-of-a-timer idiom —
//! here a `parking_lot::Mutex<Option<JoinHandle>>` plays the role of Go's
//! `atomic.Value` holding a `*time.Timer`.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct AuthorizeTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuthorizeTimer {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Arm the timer: after `timeout`, run `on_timeout` unless
    /// [`Self::cancel`] was called first. Replacing an already-armed timer
    /// aborts the previous one, matching the Go swap-then-stop sequence.
    pub fn arm<F>(&self, timeout: Duration, on_timeout: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if timeout.is_zero() {
            return;
        }
        let new_handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_timeout.await;
        });
        let previous = self.handle.lock().replace(new_handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Disarm the timer without running its callback, matching
    /// `uncheckAuthorize`.
    pub fn cancel(&self) {
        if let Some(previous) = self.handle.lock().take() {
            previous.abort();
        }
    }
}

impl Default for AuthorizeTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle so the timeout callback can re-check "is this connection
/// still unbound" without capturing the whole connection.
pub type SharedUid = Arc<std::sync::atomic::AtomicI64>;
