//! Wires the coordination store, the coordinator and the election together.

use std::sync::Arc;

use aira_consistency::{
    CoordinationStore, Coordinator, MemoryStore, RedisStore, Subscription,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::model::Configuration;

/// Prefix of the message the elected leader publishes on the cluster channel
pub const LEADER_ANNOUNCEMENT_PREFIX: &str = "leader:";

/// Connect the store selected by the deployment mode
///
/// Standalone nodes use an in-process store. Cluster nodes fail here when
/// redis cannot be reached.
pub async fn build_store(configuration: &Configuration) -> anyhow::Result<Arc<dyn CoordinationStore>> {
    if configuration.is_standalone() {
        info!("Standalone mode, using in-process coordination store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let redis_config = configuration.redis_config();
    let store = RedisStore::connect(&redis_config).await?;
    Ok(Arc::new(store))
}

/// Build the coordinator without starting the election
pub async fn bootstrap(configuration: &Configuration) -> anyhow::Result<Coordinator> {
    let store = build_store(configuration).await?;
    let election_config = configuration.election_config();

    let coordinator = Coordinator::new(store, election_config)?;
    info!(
        mode = %configuration.startup_mode(),
        identity = %coordinator.election().identity(),
        key = %coordinator.election().config().key,
        "Coordinator ready"
    );

    Ok(coordinator)
}

/// Register a callback that announces the new leader on `channel`
pub fn register_leader_announcement(
    coordinator: &Coordinator,
    channel: &str,
) -> anyhow::Result<()> {
    let store = coordinator.store();
    let channel = channel.to_string();
    let message = format!(
        "{}{}",
        LEADER_ANNOUNCEMENT_PREFIX,
        coordinator.election().identity()
    );
    let runtime = tokio::runtime::Handle::current();

    coordinator.add_init_func(move || {
        runtime.spawn(async move {
            if let Err(e) = store.publish(&channel, &message).await {
                warn!(channel = %channel, "Failed to announce leadership: {}", e);
            }
        });
    })
}

/// Log every announcement received on the cluster channel
pub fn spawn_announcement_listener(mut subscription: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            match message.payload.strip_prefix(LEADER_ANNOUNCEMENT_PREFIX) {
                Some(identity) => info!(channel = %message.channel, "Cluster leader is {}", identity),
                None => info!(channel = %message.channel, payload = %message.payload, "Cluster message"),
            }
        }
    })
}
