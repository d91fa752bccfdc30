//! Distributed Mutex
//!
//! This module provides:
//! - Mutex handle data model
//! - Store-backed mutex with fixed-interval acquisition and token-checked release

mod model;
mod mutex;

pub use model::MutexHandle;
pub use mutex::DistributedMutex;
