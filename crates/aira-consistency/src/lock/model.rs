//! Distributed Mutex Data Model

use tokio::time::Instant;

/// Per-caller state of one lock/unlock cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexHandle {
    /// Store key guarded by the mutex
    pub key: String,
    /// Random value written into the key by the current acquisition
    pub token: Option<String>,
    /// When the current acquisition succeeded
    pub acquired_at: Option<Instant>,
}

impl MutexHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: None,
            acquired_at: None,
        }
    }

    /// Whether this handle believes it holds the lock
    ///
    /// The store may have expired the key since; only `unlock` can tell.
    pub fn acquired(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn mark_acquired(&mut self, token: String) {
        self.token = Some(token);
        self.acquired_at = Some(Instant::now());
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.acquired_at = None;
    }
}

/// Fresh token for one acquisition
pub(crate) fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
