//! Server configuration model

pub mod config;
pub mod constants;

pub use config::{Cli, Configuration};
