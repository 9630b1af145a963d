//! Cooperative stop signal shared between workers.
//!
//! A [`StopHandle`] is a cloneable token. Blocking workers poll
//! [`StopHandle::is_stopped`] between units of work; async tasks can await
//! [`StopHandle::stopped`]. Once stopped, a handle stays stopped.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable, one-way stop signal.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Create a new handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal every holder of this handle to stop.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the stop signal is sent. Returns immediately if it already was.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on stop.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
