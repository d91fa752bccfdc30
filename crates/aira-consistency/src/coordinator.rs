//! Cluster coordination entry point
//!
//! A `Coordinator` is built once by application bootstrap and passed to the
//! components that need to gate singleton work or take named locks.

use std::sync::Arc;
use std::time::Duration;

use crate::election::{ElectionConfig, ElectionService, RunIdentity};
use crate::lock::DistributedMutex;
use crate::store::{CoordinationStore, Subscription};

pub struct Coordinator {
    store: Arc<dyn CoordinationStore>,
    election: ElectionService,
}

impl Coordinator {
    pub fn new(store: Arc<dyn CoordinationStore>, config: ElectionConfig) -> anyhow::Result<Self> {
        let election = ElectionService::new(store.clone(), config)?;
        Ok(Self { store, election })
    }

    pub fn with_identity(
        store: Arc<dyn CoordinationStore>,
        config: ElectionConfig,
        identity: RunIdentity,
    ) -> anyhow::Result<Self> {
        let election = ElectionService::with_identity(store.clone(), config, identity)?;
        Ok(Self { store, election })
    }

    pub fn store(&self) -> Arc<dyn CoordinationStore> {
        self.store.clone()
    }

    pub fn election(&self) -> &ElectionService {
        &self.election
    }

    /// Start competing for leadership
    pub fn start_election(&self) {
        self.election.start();
    }

    /// Register work that must run on exactly one process of the cluster
    pub fn add_init_func<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.election.add_init_func(f)
    }

    pub fn is_leader(&self) -> bool {
        self.election.is_leader()
    }

    /// Named mutex on the shared store
    pub fn mutex(&self, key: impl Into<String>) -> DistributedMutex {
        DistributedMutex::new(self.store.clone(), key)
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.store.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.store.set(key, value, ttl).await
    }

    pub async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize> {
        self.store.publish(channel, message).await
    }

    pub async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        self.store.subscribe(channel).await
    }

    /// Stop the election loop
    pub async fn shutdown(&self) {
        self.election.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn coordinator() -> Coordinator {
        Coordinator::with_identity(
            Arc::new(MemoryStore::new()),
            ElectionConfig::default(),
            RunIdentity::new("node-a"),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutexes_share_the_store() {
        let coordinator = coordinator();
        let mut first = coordinator.mutex("lock:report");
        let mut second = coordinator.mutex("lock:report");

        assert!(first.try_lock(Duration::from_secs(5)).await.unwrap());
        assert!(!second.try_lock(Duration::from_secs(5)).await.unwrap());
        assert!(coordinator.get("lock:report").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_subscribe_passthrough() {
        let coordinator = coordinator();
        let mut subscription = coordinator.subscribe("aira:cluster").await.unwrap();

        assert_eq!(coordinator.publish("aira:cluster", "hi").await.unwrap(), 1);
        assert_eq!(subscription.recv().await.unwrap().payload, "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() {
        let coordinator = coordinator();
        coordinator.add_init_func(|| {}).unwrap();
        coordinator.start_election();

        let mut states = coordinator.election().subscribe();
        states
            .wait_for(|state| *state == crate::election::ElectionState::Leader)
            .await
            .unwrap();
        assert!(coordinator.is_leader());

        coordinator.shutdown().await;
        assert!(!coordinator.is_leader());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_get_passthrough() {
        let coordinator = coordinator();
        coordinator.set("k", "v", None).await.unwrap();
        assert_eq!(coordinator.get("k").await.unwrap(), Some("v".to_string()));
    }
}
