//! Graceful shutdown handling for the Aira node

use std::future::Future;
use std::time::Duration;

use aira_common::ShutdownSignal;
use tracing::{error, info, warn};

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
///
/// Returns immediately with a signal that fires once the process is asked
/// to stop.
pub fn wait_for_shutdown_signal() -> ShutdownSignal {
    let shutdown = ShutdownSignal::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        shutdown_clone.shutdown();
    });

    shutdown
}

/// Run a cleanup future, giving up after `timeout`
///
/// Returns `false` when the cleanup did not finish in time.
pub async fn graceful_stop<F>(cleanup: F, timeout: Duration) -> bool
where
    F: Future<Output = ()>,
{
    info!("Shutdown initiated, waiting up to {:?} for components to stop...", timeout);

    match tokio::time::timeout(timeout, cleanup).await {
        Ok(()) => {
            info!("Shutdown complete");
            true
        }
        Err(_) => {
            warn!("Shutdown timed out after {:?}", timeout);
            false
        }
    }
}
