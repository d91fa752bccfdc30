//! Coordination Store
//!
//! The election and the distributed mutex only require an atomic,
//! TTL-capable key-value store. This module defines that contract and ships
//! two backends:
//! - `RedisStore`: production backend speaking RESP through the `redis` crate
//! - `MemoryStore`: in-process backend for standalone mode and tests

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::{RedisConfig, RedisStore};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A message delivered on a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMessage {
    pub channel: String,
    pub payload: String,
}

/// Receiving side of a channel subscription
pub type Subscription = mpsc::Receiver<StoreMessage>;

/// Coordination store contract
///
/// Every operation either completes against the store or fails with
/// `AiraError::StoreUnavailable`.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Atomically set `key` to `value` with `ttl` if the key is absent
    ///
    /// Returns `true` when this call created the key.
    async fn conditional_set(&self, key: &str, value: &str, ttl: Duration)
    -> anyhow::Result<bool>;

    /// Reset the TTL of an existing key, regardless of its value
    ///
    /// Returns `false` when the key does not exist.
    async fn refresh(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Delete a key unconditionally
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;

    /// Delete a key only if it still holds `expected`, atomically
    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool>;

    /// Read a key
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Write a key, optionally with a TTL
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Publish a message, returning the number of receivers it reached
    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize>;

    /// Subscribe to a channel
    async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription>;

    /// Connectivity check
    async fn ping(&self) -> anyhow::Result<()>;
}
