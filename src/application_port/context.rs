use crate::application_port::ServiceError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-request handle carried into every store and cache call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        CallContext { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for `fut` unless this context is cancelled or `timeout` passes first.
    pub async fn wait<T, F>(&self, timeout: Duration, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            res = tokio::time::timeout(timeout, fut) => res.map_err(|_| ServiceError::TimedOut),
        }
    }

    /// Run one backend call under this context's cancellation and the given deadline.
    pub async fn guard<T, E, F>(&self, timeout: Duration, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ServiceError>,
    {
        self.wait(timeout, call).await?.map_err(Into::into)
    }
}
