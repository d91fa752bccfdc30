//! Aira Consistency - single-writer coordination on a shared store
//!
//! This crate provides:
//! - The coordination store contract with Redis and in-memory backends
//! - Leader election by lease with heartbeat renewal
//! - Distributed mutex on named keys
//! - The `Coordinator` bootstrap handle tying them together

pub mod coordinator;
pub mod election;
pub mod lock;
pub mod store;

pub use coordinator::Coordinator;

// Re-export election types
pub use election::{ElectionConfig, ElectionService, ElectionState, InitFunc, RunIdentity};

// Re-export lock types
pub use lock::{DistributedMutex, MutexHandle};

// Re-export store types
pub use store::{
    CoordinationStore, MemoryStore, RedisConfig, RedisStore, StoreMessage, Subscription,
};
