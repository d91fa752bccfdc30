//! Election data model

use std::fmt::{Display, Formatter};
use std::time::Duration;

use aira_common::{
    AiraError, DEFAULT_CLUSTER_KEY, DEFAULT_GRACE_SECS, DEFAULT_LOCK_TIME_SECS, run_identity,
};

/// Role of this process in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElectionState {
    /// Polling for the lease
    #[default]
    Follower,
    /// Holding and heartbeating the lease
    Leader,
    /// Election loop shut down
    Stopped,
}

impl ElectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ElectionState::Follower => "follower",
            ElectionState::Leader => "leader",
            ElectionState::Stopped => "stopped",
        }
    }
}

impl Display for ElectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value written into the lease key by the process that holds it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentity(String);

impl RunIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of the running process (`<machine>_<pid>`)
    pub fn current() -> Self {
        Self(run_identity())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RunIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timing and key of the leader lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfig {
    /// Lease key shared by every process of the cluster
    pub key: String,
    /// Poll interval of followers and heartbeat interval of the leader
    pub lock_time: Duration,
    /// Extra lease lifetime on top of `lock_time`
    pub grace: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_CLUSTER_KEY.to_string(),
            lock_time: Duration::from_secs(DEFAULT_LOCK_TIME_SECS),
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
        }
    }
}

impl ElectionConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_lock_time(mut self, lock_time: Duration) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// TTL written on acquisition and on every heartbeat
    pub fn lease_ttl(&self) -> Duration {
        self.lock_time + self.grace
    }

    /// The lease must outlive one heartbeat interval
    pub fn validate(&self) -> Result<(), AiraError> {
        if self.key.is_empty() {
            return Err(AiraError::IllegalArgument(
                "election key must not be empty".to_string(),
            ));
        }
        if self.lock_time.is_zero() {
            return Err(AiraError::IllegalArgument(
                "election lock time must be positive".to_string(),
            ));
        }
        if self.lease_ttl() <= self.lock_time {
            return Err(AiraError::IllegalArgument(format!(
                "lease ttl {:?} must exceed heartbeat interval {:?}",
                self.lease_ttl(),
                self.lock_time
            )));
        }
        Ok(())
    }
}
