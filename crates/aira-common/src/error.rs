//! Error types for Aira
//!
//! This module defines:
//! - `AiraError`: Application-specific error enum
//! - `AppError`: Wrapper around `anyhow::Error` for callers that want typed access

use std::fmt::{Display, Formatter};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum AiraError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("coordination store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("init functions can no longer be registered: election already started")]
    RegistrationClosed,

    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl AiraError {
    /// Whether the failure is expected to clear up on its own and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, AiraError::StoreUnavailable(_))
    }
}

/// Wrapper for application errors
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<AiraError> for AppError {
    fn from(value: AiraError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// The `AiraError` carried by this error, if any
    pub fn kind(&self) -> Option<&AiraError> {
        self.downcast_ref::<AiraError>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_is_transient() {
        assert!(AiraError::StoreUnavailable("connection refused".to_string()).is_transient());
        assert!(!AiraError::RegistrationClosed.is_transient());
        assert!(!AiraError::ConfigError("bad".to_string()).is_transient());
    }

    #[test]
    fn test_app_error_downcast() {
        let err: AppError = anyhow::Error::from(AiraError::Cancelled("lock:a".to_string())).into();
        assert!(matches!(err.kind(), Some(AiraError::Cancelled(key)) if key == "lock:a"));
        assert_eq!(err.to_string(), "operation cancelled: lock:a");
    }

    #[test]
    fn test_app_error_without_kind() {
        let err: AppError = anyhow::anyhow!("plain failure").into();
        assert!(err.kind().is_none());
        assert_eq!(err.inner().to_string(), "plain failure");
    }
}
