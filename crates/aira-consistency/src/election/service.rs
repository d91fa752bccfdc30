//! Election Service Implementation
//!
//! Every process starts as a follower and retries a conditional set of the
//! lease key every `lock_time`. The process whose set succeeds becomes leader,
//! runs the registered init functions once, and refreshes the lease TTL every
//! `lock_time` until it is stopped. Leadership is never given up voluntarily;
//! a dead leader is replaced once its lease expires in the store.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aira_common::{AiraError, ShutdownSignal, machine_name};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info, warn};

use super::model::{ElectionConfig, ElectionState, RunIdentity};
use crate::store::CoordinationStore;

/// One-time initialization callback run by the elected leader
pub type InitFunc = Box<dyn FnOnce() + Send + 'static>;

/// Leader election over a single lease key
///
/// Cloning yields another handle to the same election.
#[derive(Clone)]
pub struct ElectionService {
    inner: Arc<ElectionInner>,
}

struct ElectionInner {
    store: Arc<dyn CoordinationStore>,
    config: ElectionConfig,
    identity: RunIdentity,
    init_funcs: Mutex<Vec<InitFunc>>,
    started: AtomicBool,
    state: watch::Sender<ElectionState>,
    shutdown: ShutdownSignal,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ElectionService {
    /// Create an election for this process
    pub fn new(store: Arc<dyn CoordinationStore>, config: ElectionConfig) -> anyhow::Result<Self> {
        Self::with_identity(store, config, RunIdentity::current())
    }

    /// Create an election with an explicit identity
    pub fn with_identity(
        store: Arc<dyn CoordinationStore>,
        config: ElectionConfig,
        identity: RunIdentity,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let (state, _) = watch::channel(ElectionState::Follower);

        Ok(Self {
            inner: Arc::new(ElectionInner {
                store,
                config,
                identity,
                init_funcs: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                state,
                shutdown: ShutdownSignal::new(),
                handle: Mutex::new(None),
            }),
        })
    }

    /// Register a callback to run once if this process becomes leader
    ///
    /// Callbacks run in registration order. Registration is closed once
    /// [`start`](Self::start) has been called.
    ///
    /// They run synchronously on the election task before heartbeating
    /// begins. A callback that blocks longer than the lease TTL lets the
    /// lease expire; one that blocks longer than the lock time is followed
    /// by an immediate refresh. Spawn long-running work instead.
    pub fn add_init_func<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut funcs = self.inner.init_funcs.lock();
        if self.inner.started.load(Ordering::SeqCst) {
            return Err(AiraError::RegistrationClosed.into());
        }
        funcs.push(Box::new(f));
        Ok(())
    }

    /// Spawn the election loop
    ///
    /// Calling it again has no effect. Must be called within a Tokio runtime.
    pub fn start(&self) {
        {
            // Closes registration atomically with respect to add_init_func.
            let _funcs = self.inner.init_funcs.lock();
            if self.inner.started.swap(true, Ordering::SeqCst) {
                return;
            }
        }

        let shutdown_rx = self.inner.shutdown.subscribe();
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run(shutdown_rx).await });
        *self.inner.handle.lock() = Some(handle);

        info!(
            key = %self.inner.config.key,
            run_id = %self.inner.identity,
            lock_time = ?self.inner.config.lock_time,
            "Cluster election started"
        );
    }

    /// Stop the election loop and wait for it to exit
    ///
    /// A leader stops heartbeating but leaves the lease in place; another
    /// process takes over once it expires.
    pub async fn stop(&self) {
        self.inner.shutdown.shutdown();
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Election loop terminated abnormally");
            }
        }
        self.inner.set_state(ElectionState::Stopped);
    }

    pub fn state(&self) -> ElectionState {
        *self.inner.state.borrow()
    }

    pub fn is_leader(&self) -> bool {
        self.state() == ElectionState::Leader
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Watch role transitions of this process
    pub fn subscribe(&self) -> watch::Receiver<ElectionState> {
        self.inner.state.subscribe()
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.inner.identity
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.inner.config
    }
}

impl ElectionInner {
    async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        // Follower: constant-interval polling, no backoff and no jitter
        loop {
            if self.shutdown.is_shutdown() {
                self.set_state(ElectionState::Stopped);
                return;
            }
            if self.try_acquire().await {
                if self.shutdown.is_shutdown() {
                    // Won while stopping: hand the lease back instead of leading.
                    self.release_lease().await;
                    self.set_state(ElectionState::Stopped);
                    return;
                }
                break;
            }
            tokio::select! {
                _ = sleep(self.config.lock_time) => {}
                _ = shutdown_rx.recv() => {
                    debug!(run_id = %self.identity, "Election stopped while following");
                    self.set_state(ElectionState::Stopped);
                    return;
                }
            }
        }

        let acquired_at = Instant::now();
        self.set_state(ElectionState::Leader);
        metrics::gauge!("aira_election_leader").set(1.0);
        info!(
            machine = %machine_name(),
            run_id = %self.identity,
            "Cluster master elected"
        );

        self.run_init_funcs();

        // Leader: the first refresh is due one lock time after acquisition,
        // immediately if the init functions took longer than that.
        let mut heartbeat = interval_at(acquired_at + self.config.lock_time, self.config.lock_time);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = heartbeat.tick() => self.heartbeat().await,
                _ = shutdown_rx.recv() => break,
            }
        }

        metrics::gauge!("aira_election_leader").set(0.0);
        info!(run_id = %self.identity, "Election stopped, lease left to expire");
        self.set_state(ElectionState::Stopped);
    }

    /// A store failure counts as a lost race
    async fn try_acquire(&self) -> bool {
        metrics::counter!("aira_election_attempts_total").increment(1);

        match self
            .store
            .conditional_set(
                &self.config.key,
                self.identity.as_str(),
                self.config.lease_ttl(),
            )
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                debug!(key = %self.config.key, "Lease held by another process");
                false
            }
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Lease acquisition failed, retrying next tick");
                false
            }
        }
    }

    /// Delete the lease if it still holds this process's identity
    async fn release_lease(&self) {
        match self
            .store
            .compare_and_delete(&self.config.key, self.identity.as_str())
            .await
        {
            Ok(true) => info!(key = %self.config.key, "Lease acquired during shutdown, released"),
            Ok(false) => debug!(key = %self.config.key, "Lease no longer ours, nothing to release"),
            Err(e) => warn!(
                key = %self.config.key,
                error = %e,
                "Failed to release lease acquired during shutdown, left to expire"
            ),
        }
    }

    /// Unconditional TTL reset; ownership is not re-verified
    async fn heartbeat(&self) {
        match self
            .store
            .refresh(&self.config.key, self.config.lease_ttl())
            .await
        {
            Ok(true) => debug!(key = %self.config.key, "Lease refreshed"),
            Ok(false) => {
                metrics::counter!("aira_election_refresh_failures_total").increment(1);
                warn!(key = %self.config.key, "Lease key missing on refresh");
            }
            Err(e) => {
                metrics::counter!("aira_election_refresh_failures_total").increment(1);
                warn!(key = %self.config.key, error = %e, "Lease refresh failed, retrying next tick");
            }
        }
    }

    fn run_init_funcs(&self) {
        let funcs = std::mem::take(&mut *self.init_funcs.lock());
        let total = funcs.len();

        for (index, f) in funcs.into_iter().enumerate() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
                error!(
                    index,
                    total,
                    reason = %panic_message(panic.as_ref()),
                    "Init function panicked"
                );
            }
        }
    }

    fn set_state(&self, state: ElectionState) {
        self.state.send_replace(state);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
