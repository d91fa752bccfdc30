//! Aira node library: configuration and startup of a coordination node.

pub mod metrics;
pub mod model;
pub mod startup;
