//! Node startup: logging, store bootstrap and shutdown handling.

pub mod bootstrap;
mod logging;
mod shutdown;

pub use bootstrap::{
    bootstrap, build_store, register_leader_announcement, spawn_announcement_listener,
};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{graceful_stop, wait_for_shutdown_signal};
