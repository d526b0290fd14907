use crate::application_port::AuthError;
use crate::domain_port::{CacheError, StoreError};

/// Caller-facing failure of any service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("store error: {0}")]
    Store(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out")]
    TimedOut,
}

impl ServiceError {
    /// Cancellation and deadline expiry say nothing about the data; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Cancelled | ServiceError::TimedOut)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ServiceError::Auth(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(msg) => ServiceError::Validation(msg),
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Fault(msg) => ServiceError::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_category() {
        assert!(matches!(
            ServiceError::from(StoreError::Validation("age".into())),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::NotFound),
            ServiceError::NotFound
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Fault("io".into())),
            ServiceError::Store(_)
        ));
    }

    #[test]
    fn only_cancellation_and_timeouts_are_retryable() {
        assert!(ServiceError::Cancelled.is_retryable());
        assert!(ServiceError::TimedOut.is_retryable());
        assert!(!ServiceError::NotFound.is_retryable());
        assert!(!ServiceError::Store("down".into()).is_retryable());
        assert!(!ServiceError::Auth(AuthError::TokenExpired).is_retryable());
    }
}
