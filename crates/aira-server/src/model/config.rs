//! Configuration management for the Aira node
//!
//! Settings are layered as: `conf/application.yml` (optional), then
//! `AIRA_`-prefixed environment variables (`AIRA_REDIS__ADDR` maps to
//! `redis.addr`), then command line overrides.

use std::time::Duration;

use aira_common::{AiraError, DEFAULT_CLUSTER_KEY, DEFAULT_GRACE_SECS, DEFAULT_LOCK_TIME_SECS};
use aira_consistency::{ElectionConfig, RedisConfig};
use clap::Parser;
use config::{Config, Environment};

use super::constants::{
    CLUSTER_CHANNEL_PROPERTY, CLUSTER_GRACE_PROPERTY, CLUSTER_KEY_PROPERTY,
    CLUSTER_LOCK_TIME_PROPERTY, DEFAULT_CLUSTER_CHANNEL, DEFAULT_CONFIG_FILE, DEFAULT_REDIS_ADDR,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS, LOGS_CONSOLE_PROPERTY, LOGS_FILE_PROPERTY, LOGS_LEVEL_PROPERTY,
    LOGS_PATH_PROPERTY, REDIS_ADDR_PROPERTY, REDIS_DB_PROPERTY, REDIS_PASSWORD_PROPERTY,
    SHUTDOWN_TIMEOUT_PROPERTY, STANDALONE_MODE_PROPERTY_NAME,
};
use crate::startup::LoggingConfig;

/// Command line arguments for the node
#[derive(Debug, Parser)]
#[command(name = "aira-server", about = "Aira cluster coordination node")]
pub struct Cli {
    /// `standalone` uses an in-process store, `cluster` uses redis
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    #[arg(long = "redis-addr")]
    pub redis_addr: Option<String>,
    /// Election poll and heartbeat interval in seconds
    #[arg(long = "lock-time")]
    pub lock_time_secs: Option<u64>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process arguments
    pub fn new() -> anyhow::Result<Self> {
        Self::load(Cli::parse())
    }

    pub fn load(cli: Cli) -> anyhow::Result<Self> {
        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&cli.config_file).required(false))
            .add_source(
                Environment::with_prefix("aira")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = cli.mode {
            config_builder =
                config_builder.set_override(STANDALONE_MODE_PROPERTY_NAME, v == "standalone")?;
        }
        if let Some(v) = cli.redis_addr {
            config_builder = config_builder.set_override(REDIS_ADDR_PROPERTY, v)?;
        }
        if let Some(v) = cli.lock_time_secs {
            let v = i64::try_from(v)
                .map_err(|_| AiraError::ConfigError(format!("lock time {} out of range", v)))?;
            config_builder = config_builder.set_override(CLUSTER_LOCK_TIME_PROPERTY, v)?;
        }

        let app_config = config_builder.build().map_err(|e| {
            AiraError::ConfigError(format!("failed to build configuration: {}", e))
        })?;

        Ok(Configuration { config: app_config })
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }

    // ========================================================================
    // Deployment Configuration
    // ========================================================================

    pub fn is_standalone(&self) -> bool {
        self.config
            .get_bool(STANDALONE_MODE_PROPERTY_NAME)
            .unwrap_or(false)
    }

    pub fn startup_mode(&self) -> String {
        if self.is_standalone() {
            "standalone".to_string()
        } else {
            "cluster".to_string()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64(SHUTDOWN_TIMEOUT_PROPERTY, DEFAULT_SHUTDOWN_TIMEOUT_SECS))
    }

    // ========================================================================
    // Coordination Store Configuration
    // ========================================================================

    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            addr: self
                .config
                .get_string(REDIS_ADDR_PROPERTY)
                .unwrap_or(DEFAULT_REDIS_ADDR.to_string()),
            password: self
                .config
                .get_string(REDIS_PASSWORD_PROPERTY)
                .unwrap_or_default(),
            db: self.config.get_int(REDIS_DB_PROPERTY).unwrap_or(0),
        }
    }

    // ========================================================================
    // Cluster Election Configuration
    // ========================================================================

    pub fn election_config(&self) -> ElectionConfig {
        ElectionConfig {
            key: self
                .config
                .get_string(CLUSTER_KEY_PROPERTY)
                .unwrap_or(DEFAULT_CLUSTER_KEY.to_string()),
            lock_time: Duration::from_secs(
                self.get_u64(CLUSTER_LOCK_TIME_PROPERTY, DEFAULT_LOCK_TIME_SECS),
            ),
            grace: Duration::from_secs(self.get_u64(CLUSTER_GRACE_PROPERTY, DEFAULT_GRACE_SECS)),
        }
    }

    pub fn cluster_channel(&self) -> String {
        self.config
            .get_string(CLUSTER_CHANNEL_PROPERTY)
            .unwrap_or(DEFAULT_CLUSTER_CHANNEL.to_string())
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH_PROPERTY).ok(),
            self.config.get_bool(LOGS_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOGS_FILE_PROPERTY).unwrap_or(false),
            self.config
                .get_string(LOGS_LEVEL_PROPERTY)
                .unwrap_or("info".to_string()),
        )
    }
}
