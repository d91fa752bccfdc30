//! In-process coordination store
//!
//! Expiry follows `tokio::time`, so tests running on a paused clock observe
//! TTLs lapsing exactly as virtual time advances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use aira_common::{AiraError, SUBSCRIPTION_BUFFER};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{CoordinationStore, StoreMessage, Subscription};

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: &str, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }
}

/// Coordination store kept in process memory
///
/// Single-shard atomicity of `DashMap` entries gives the same guarantees the
/// Redis backend gets from command atomicity. The store can be switched into
/// an unavailable state to exercise outage handling.
pub struct MemoryStore {
    entries: DashMap<String, MemoryEntry>,
    channels: DashMap<String, Vec<mpsc::Sender<StoreMessage>>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            channels: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store becoming reachable or unreachable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Remaining lifetime of a key, `None` if absent or without expiry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|expires_at| expires_at.saturating_duration_since(now))
    }

    fn ensure_available(&self) -> anyhow::Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AiraError::StoreUnavailable("memory store marked unavailable".to_string()).into())
        }
    }

    fn purge_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        self.ensure_available()?;
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(MemoryEntry::new(value, Some(ttl), now));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry::new(value, Some(ttl), now));
                Ok(true)
            }
        }
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        self.ensure_available()?;
        let now = Instant::now();
        self.purge_expired(key, now);

        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        self.ensure_available()?;
        let now = Instant::now();

        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        self.ensure_available()?;
        let now = Instant::now();
        self.purge_expired(key, now);

        Ok(self
            .entries
            .remove_if(key, |_, entry| entry.value == expected)
            .is_some())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.ensure_available()?;
        let now = Instant::now();
        self.purge_expired(key, now);

        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.ensure_available()?;
        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, ttl, Instant::now()));
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize> {
        self.ensure_available()?;

        let Some(mut subscribers) = self.channels.get_mut(channel) else {
            return Ok(0);
        };
        subscribers.retain(|tx| !tx.is_closed());

        let message = StoreMessage {
            channel: channel.to_string(),
            payload: message.to_string(),
        };
        let delivered = subscribers
            .iter()
            .filter(|tx| tx.try_send(message.clone()).is_ok())
            .count();
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        self.ensure_available()?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.channels.entry(channel.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test(start_paused = true)]
    async fn test_conditional_set_only_once() {
        let store = MemoryStore::new();

        assert!(
            store
                .conditional_set("k", "a", Duration::from_secs(10))
                .await
                .unwrap()
        );
        assert!(
            !store
                .conditional_set("k", "b", Duration::from_secs(10))
                .await
                .unwrap()
        );
        assert_eq!(store.get("k").await.unwrap(), Some("a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .conditional_set("k", "a", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("a".to_string()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(
            store
                .conditional_set("k", "b", Duration::from_secs(10))
                .await
                .unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_extends_ttl() {
        let store = MemoryStore::new();
        store
            .conditional_set("k", "a", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(8)).await;
        assert!(store.refresh("k", Duration::from_secs(10)).await.unwrap());
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_missing_or_expired_key() {
        let store = MemoryStore::new();
        assert!(!store.refresh("k", Duration::from_secs(10)).await.unwrap());

        store
            .conditional_set("k", "a", Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!store.refresh("k", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_delete() {
        let store = MemoryStore::new();
        store
            .conditional_set("k", "token-a", Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!store.compare_and_delete("k", "token-b").await.unwrap());
        assert!(store.get("k").await.unwrap().is_some());

        assert!(store.compare_and_delete("k", "token-a").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let store = MemoryStore::new();
        store.set("k", "anything", None).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_available(false);

        let err = store
            .conditional_set("k", "a", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AiraError>(),
            Some(AiraError::StoreUnavailable(_))
        ));
        assert!(store.refresh("k", Duration::from_secs(1)).await.is_err());
        assert!(store.ping().await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let store = MemoryStore::new();
        assert_eq!(store.publish("news", "nobody listens").await.unwrap(), 0);

        let mut first = store.subscribe("news").await.unwrap();
        let mut second = store.subscribe("news").await.unwrap();

        assert_eq!(store.publish("news", "hello").await.unwrap(), 2);
        assert_eq!(first.recv().await.unwrap().payload, "hello");
        let message = second.recv().await.unwrap();
        assert_eq!(message.channel, "news");

        drop(first);
        assert_eq!(store.publish("news", "again").await.unwrap(), 1);
    }

    proptest! {
        #[test]
        fn prop_exactly_one_contender_wins(contenders in prop::collection::vec("[a-z]{1,8}", 1..16)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            runtime.block_on(async {
                let store = MemoryStore::new();
                let mut winners = Vec::new();
                for contender in &contenders {
                    if store
                        .conditional_set("lease", contender, Duration::from_secs(30))
                        .await
                        .unwrap()
                    {
                        winners.push(contender.clone());
                    }
                }

                prop_assert_eq!(winners.len(), 1);
                prop_assert_eq!(&winners[0], &contenders[0]);
                prop_assert_eq!(store.get("lease").await.unwrap(), Some(contenders[0].clone()));
                Ok(())
            })?;
        }
    }
}
