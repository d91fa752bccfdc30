//! Shared helpers for the coordination tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aira_consistency::{
    CoordinationStore, ElectionConfig, ElectionService, ElectionState, MemoryStore, RunIdentity,
    Subscription,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Store wrapper that records when the lease operations were issued
pub struct RecordingStore {
    pub inner: Arc<MemoryStore>,
    conditional_sets: Mutex<Vec<Instant>>,
    refreshes: Mutex<Vec<Instant>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            conditional_sets: Mutex::new(Vec::new()),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    pub fn conditional_sets(&self) -> Vec<Instant> {
        self.conditional_sets.lock().clone()
    }

    pub fn refreshes(&self) -> Vec<Instant> {
        self.refreshes.lock().clone()
    }
}

#[async_trait]
impl CoordinationStore for RecordingStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        self.conditional_sets.lock().push(Instant::now());
        self.inner.conditional_set(key, value, ttl).await
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        self.refreshes.lock().push(Instant::now());
        self.inner.refresh(key, ttl).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        self.inner.delete(key).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        self.inner.compare_and_delete(key, expected).await
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        self.inner.subscribe(channel).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.inner.ping().await
    }
}

/// Store wrapper whose conditional set answers only after `delay`
pub struct SlowStore {
    pub inner: Arc<MemoryStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<MemoryStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CoordinationStore for SlowStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.conditional_set(key, value, ttl).await
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        self.inner.refresh(key, ttl).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        self.inner.delete(key).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        self.inner.compare_and_delete(key, expected).await
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        self.inner.subscribe(channel).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.inner.ping().await
    }
}

/// One simulated process taking part in the election
pub struct Node {
    pub election: ElectionService,
    pub init_runs: Arc<AtomicUsize>,
}

impl Node {
    pub fn new(store: Arc<dyn CoordinationStore>, config: ElectionConfig, name: &str) -> Self {
        let election =
            ElectionService::with_identity(store, config, RunIdentity::new(name)).unwrap();
        let init_runs = Arc::new(AtomicUsize::new(0));
        let counter = init_runs.clone();
        election
            .add_init_func(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        Self {
            election,
            init_runs,
        }
    }

    pub fn runs(&self) -> usize {
        self.init_runs.load(Ordering::SeqCst)
    }

    pub fn is_leader(&self) -> bool {
        self.election.state() == ElectionState::Leader
    }

    pub async fn wait_for_leader(&self) {
        let mut states = self.election.subscribe();
        states
            .wait_for(|state| *state == ElectionState::Leader)
            .await
            .unwrap();
    }
}

pub fn leaders(nodes: &[Node]) -> usize {
    nodes.iter().filter(|node| node.is_leader()).count()
}

/// Lock time 30s with 10s grace, giving a 40s lease
pub fn default_config() -> ElectionConfig {
    ElectionConfig::default()
}

pub fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
