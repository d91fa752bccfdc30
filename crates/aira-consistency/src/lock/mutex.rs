//! Distributed Mutex Implementation
//!
//! Provides:
//! - Blocking acquisition with a fixed 100 ms retry interval and no timeout
//! - Shutdown-aware acquisition for callers that need to give up
//! - Token-checked release, plus an unconditional release for admin use

use std::sync::Arc;
use std::time::Duration;

use aira_common::{AiraError, MUTEX_RETRY_INTERVAL_MS, ShutdownSignal, run_with_shutdown};
use tracing::{debug, warn};

use super::model::{MutexHandle, new_token};
use crate::store::CoordinationStore;

/// Short-lived mutual exclusion on a named store key
pub struct DistributedMutex {
    store: Arc<dyn CoordinationStore>,
    handle: MutexHandle,
}

impl DistributedMutex {
    pub fn new(store: Arc<dyn CoordinationStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            handle: MutexHandle::new(key),
        }
    }

    pub fn key(&self) -> &str {
        &self.handle.key
    }

    pub fn handle(&self) -> &MutexHandle {
        &self.handle
    }

    pub fn is_acquired(&self) -> bool {
        self.handle.acquired()
    }

    /// Single acquisition attempt
    pub async fn try_lock(&mut self, ttl: Duration) -> anyhow::Result<bool> {
        if self.handle.acquired() {
            return Err(AiraError::IllegalArgument(format!(
                "mutex '{}' is already held by this handle",
                self.handle.key
            ))
            .into());
        }

        let token = new_token();
        if self
            .store
            .conditional_set(&self.handle.key, &token, ttl)
            .await?
        {
            self.handle.mark_acquired(token);
            metrics::counter!("aira_mutex_acquired_total").increment(1);
            debug!(key = %self.handle.key, ?ttl, "Mutex acquired");
            return Ok(true);
        }
        Ok(false)
    }

    /// Block until the lock is held
    ///
    /// Retries every 100 ms for as long as the key is held elsewhere. A store
    /// error ends the wait and is returned.
    pub async fn lock(&mut self, ttl: Duration) -> anyhow::Result<()> {
        let retry = Duration::from_millis(MUTEX_RETRY_INTERVAL_MS);
        loop {
            if self.try_lock(ttl).await? {
                return Ok(());
            }
            tokio::time::sleep(retry).await;
        }
    }

    /// Like [`lock`](Self::lock), giving up when `shutdown` fires
    ///
    /// Returns `Cancelled` without touching the store if the signal had
    /// already fired.
    pub async fn lock_with_shutdown(
        &mut self,
        ttl: Duration,
        shutdown: &ShutdownSignal,
    ) -> anyhow::Result<()> {
        let key = self.handle.key.clone();
        match run_with_shutdown(self.lock(ttl), shutdown).await {
            Some(result) => result,
            None => Err(AiraError::Cancelled(key).into()),
        }
    }

    /// Release the lock if this acquisition still owns it
    ///
    /// Returns `false` when the handle holds nothing, or when the key expired
    /// and possibly went to another owner; that owner's lock is left alone.
    pub async fn unlock(&mut self) -> anyhow::Result<bool> {
        let Some(token) = self.handle.token.as_deref() else {
            return Ok(false);
        };

        let released = self
            .store
            .compare_and_delete(&self.handle.key, token)
            .await?;
        if !released {
            warn!(key = %self.handle.key, "Mutex expired before unlock, not released");
        }
        self.handle.clear();
        Ok(released)
    }

    /// Delete the key without checking ownership
    ///
    /// If the TTL already lapsed and another caller acquired the key, this
    /// deletes that caller's lock.
    pub async fn force_unlock(&mut self) -> anyhow::Result<bool> {
        let deleted = self.store.delete(&self.handle.key).await?;
        self.handle.clear();
        Ok(deleted)
    }
}
