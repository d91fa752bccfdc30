//! Redis-backed coordination store

use std::time::Duration;

use aira_common::{AiraError, STORE_CONNECT_TIMEOUT_MS, SUBSCRIPTION_BUFFER};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo, RedisError, Script};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CoordinationStore, StoreMessage, Subscription};

/// Deletes the key only while it still holds the caller's token.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Connection settings of the Redis backend
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port`
    pub addr: String,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:6379".to_string(),
            password: String::new(),
            db: 0,
        }
    }
}

impl RedisConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// Build connection info without embedding the password in a URL
    pub fn connection_info(&self) -> anyhow::Result<ConnectionInfo> {
        let mut info = format!("redis://{}/{}", self.addr, self.db)
            .into_connection_info()
            .map_err(|e| AiraError::ConfigError(format!("invalid redis address: {}", e)))?;
        if !self.password.is_empty() {
            info.redis.password = Some(self.password.clone());
        }
        info.redis.db = self.db;
        Ok(info)
    }
}

fn unavailable(e: RedisError) -> anyhow::Error {
    AiraError::StoreUnavailable(e.to_string()).into()
}

fn millis(ttl: Duration) -> u64 {
    // PX rejects zero
    (ttl.as_millis() as u64).max(1)
}

/// Coordination store on a Redis server
pub struct RedisStore {
    client: Client,
    manager: ConnectionManager,
    compare_and_delete: Script,
}

impl RedisStore {
    /// Connect and ping the server
    ///
    /// Fails when the server does not answer `PING` within one second.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let client = Client::open(config.connection_info()?)
            .map_err(|e| AiraError::ConfigError(e.to_string()))?;
        let timeout = Duration::from_millis(STORE_CONNECT_TIMEOUT_MS);

        let manager = tokio::time::timeout(timeout, ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| {
                AiraError::StoreUnavailable(format!(
                    "timed out connecting to redis at {}",
                    config.addr
                ))
            })?
            .map_err(unavailable)?;

        let store = Self {
            client,
            manager,
            compare_and_delete: Script::new(COMPARE_AND_DELETE_SCRIPT),
        };

        tokio::time::timeout(timeout, store.ping())
            .await
            .map_err(|_| {
                AiraError::StoreUnavailable(format!("redis at {} did not answer PING", config.addr))
            })??;

        info!(addr = %config.addr, db = config.db, "Connected to redis");
        Ok(store)
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(reply.is_some())
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut conn = self.manager.clone();
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(updated == 1)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<usize> {
        let mut conn = self.manager.clone();
        let receivers: usize = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(unavailable)?;
        pubsub.subscribe(channel).await.map_err(unavailable)?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let channel = channel.to_string();

        tokio::spawn(async move {
            let mut messages = Box::pin(pubsub.into_on_message());
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "Dropping undecodable message");
                        continue;
                    }
                };
                let message = StoreMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            debug!(channel = %channel, "Subscription closed");
        });

        Ok(rx)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
