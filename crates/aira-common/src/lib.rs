//! Aira Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Aira components:
//! - Error types
//! - Shutdown signalling
//! - Process identity helpers
//! - Common constants

pub mod error;
pub mod shutdown;
pub mod utils;

// Re-exports for convenience
pub use error::{AiraError, AppError};
pub use shutdown::{ShutdownSignal, run_with_shutdown};
pub use utils::{machine_name, run_identity};

/// Cluster-wide key holding the leader lease
pub const DEFAULT_CLUSTER_KEY: &str = "cluster_master";

/// Default heartbeat / poll interval of the election, in seconds
pub const DEFAULT_LOCK_TIME_SECS: u64 = 30;

/// Default extra lifetime added on top of the lock time when writing the lease
pub const DEFAULT_GRACE_SECS: u64 = 10;

/// Fixed retry interval of distributed mutex acquisition
pub const MUTEX_RETRY_INTERVAL_MS: u64 = 100;

/// Capacity of a store subscription channel
pub const SUBSCRIPTION_BUFFER: usize = 100;

/// Timeout of the store connectivity check performed at startup
pub const STORE_CONNECT_TIMEOUT_MS: u64 = 1000;
