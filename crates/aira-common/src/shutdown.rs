//! Shutdown signalling shared by long-running coordination loops
//!
//! A `ShutdownSignal` is cloned into every component that owns a background
//! loop. Raw receivers from [`ShutdownSignal::subscribe`] only see shutdowns
//! triggered after they were created; [`ShutdownSignal::cancelled`] also
//! resolves for a shutdown that already happened.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::warn;

/// Shutdown signal sender and receiver
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal with a broadcast channel
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a receiver for shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.sender.send(());
    }

    /// Check if shutdown has been triggered
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been triggered, including before this call
    pub async fn cancelled(&self) {
        // Subscribe before reading the flag: `shutdown` sets the flag before
        // sending, so one of the two always observes it.
        let mut rx = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a future with graceful shutdown support
///
/// The future will be cancelled when a shutdown signal is received. It is
/// never polled if the signal already fired.
pub async fn run_with_shutdown<F, T>(future: F, shutdown: &ShutdownSignal) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            warn!("Shutdown signal received, cancelling operation");
            None
        }
        result = future => Some(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();

        assert!(!signal.is_shutdown());

        let signal_clone = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.shutdown();
        });

        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_ok());
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_before_wait_is_observed() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();
        signal.shutdown();

        // The receiver existed when the signal fired, so the message is buffered.
        assert!(rx.recv().await.is_ok());
        assert!(signal.clone().is_shutdown());
    }

    #[tokio::test]
    async fn test_run_with_shutdown() {
        let signal = ShutdownSignal::new();

        let task = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            42
        };

        let signal_clone = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.shutdown();
        });

        let result = run_with_shutdown(task, &signal).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_run_with_shutdown_completes() {
        let signal = ShutdownSignal::new();
        let result = run_with_shutdown(async { 7 }, &signal).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn test_cancelled_after_shutdown_already_fired() {
        let signal = ShutdownSignal::new();
        signal.shutdown();

        let result = tokio::time::timeout(Duration::from_millis(100), signal.cancelled()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_with_shutdown_already_fired() {
        let signal = ShutdownSignal::new();
        signal.shutdown();

        let result = run_with_shutdown(std::future::pending::<()>(), &signal).await;
        assert!(result.is_none());
    }
}
