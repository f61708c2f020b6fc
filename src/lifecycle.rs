//! Cooperative shutdown shared between the signal listener and the session.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Idempotent shutdown request.
///
/// The first request wins; later requests are no-ops, so a repeated signal
/// cannot trigger a second disconnect sequence.
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Request shutdown. Returns true only for the first call.
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_one();
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Wait until shutdown has been requested.
    pub async fn notified(&self) {
        let notified = self.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_is_a_noop() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());
        assert!(shutdown.request());
        assert!(!shutdown.request());
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_notified_resolves_after_request() {
        let shutdown = Shutdown::new();
        shutdown.request();
        // Must not hang even though the request happened before the wait.
        shutdown.notified().await;
    }
}
