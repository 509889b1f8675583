//! Process-wide shutdown signal.
//!
//! The same signal stops the HTTP listener and cancels commands that have
//! not reached the event store yet.

use std::sync::Arc;

use games_core::cancellation::CancellationSignal;
use tokio::sync::watch;

/// A cloneable flag that flips once when the process starts shutting down.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Fires the signal. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Resolves once the signal has fired.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of the signal.
        let _ = receiver.wait_for(|fired| *fired).await;
    }

    /// Fires the signal when the process receives Ctrl-C.
    pub async fn trigger_on_ctrl_c(self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("shutdown requested");
        self.trigger();
    }
}

impl CancellationSignal for ShutdownSignal {
    fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}
