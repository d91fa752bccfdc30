//! Leader Election
//!
//! This module provides:
//! - Election data model (state, identity, lease timing)
//! - Election service with follower polling and leader heartbeat
//! - One-time init functions gated on winning the election

mod model;
mod service;

pub use model::*;
pub use service::*;
