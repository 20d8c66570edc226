//! Cooperative cancellation of an aggregation.

use std::sync::Arc;

use tokio::sync::watch;

/// A signal that asks an in-progress aggregation to stop.
///
/// Clones share state: cancelling any clone cancels them all. Once
/// cancelled, a signal stays cancelled.
///
/// ```
/// use carebridge_tenancy::aggregate::CancellationSignal;
///
/// let signal = CancellationSignal::new();
/// let remote = signal.clone();
/// assert!(!signal.is_cancelled());
///
/// remote.cancel();
/// assert!(signal.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    /// Creates a signal that has not been triggered.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Triggers the signal.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Returns `true` once the signal has been triggered.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes when the signal is triggered.
    pub async fn cancelled(&self) {
        let mut watcher = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = watcher.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
