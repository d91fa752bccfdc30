//! Main entry point for the Aira coordination node.
//!
//! Connects the coordination store, competes for cluster leadership and
//! announces the elected leader on the cluster channel.

use aira_common::AppError;
use aira_server::{model::Configuration, startup};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config)?;

    aira_server::metrics::init_metrics();

    info!("Starting Aira node in {} mode", configuration.startup_mode());

    let coordinator = match startup::bootstrap(&configuration).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            let err = AppError::from(e);
            match err.kind() {
                Some(kind) if kind.is_transient() => {
                    error!("Startup aborted, {}", kind)
                }
                _ => error!("Failed to bootstrap node: {}", err),
            }
            return Err(err.into_inner());
        }
    };

    let channel = configuration.cluster_channel();
    let subscription = coordinator.subscribe(&channel).await?;
    let listener = startup::spawn_announcement_listener(subscription);

    startup::register_leader_announcement(&coordinator, &channel)?;
    coordinator.start_election();

    let shutdown = startup::wait_for_shutdown_signal();
    shutdown.cancelled().await;

    startup::graceful_stop(coordinator.shutdown(), configuration.shutdown_timeout()).await;
    listener.abort();

    Ok(())
}
