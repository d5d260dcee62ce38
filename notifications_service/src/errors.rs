// notifications_service/src/errors.rs
use thiserror::Error;

/// Failure of an outbound notification call.
///
/// Adapters never panic or abort the process; every failure comes back as
/// one of these values so the caller can decide what to persist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The adapter has no credential configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// The remote call failed, timed out, or answered with a non-success
    /// status.
    #[error("upstream error: {0}")]
    UpstreamError(String),
    /// The synthesized asset could not be written to the content store.
    #[error("content store error: {0}")]
    ContentStore(String),
}

impl NotificationError {
    pub(crate) fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotificationError::UpstreamError(format!("{} request timed out: {}", service, err))
        } else {
            NotificationError::UpstreamError(format!("{} request failed: {}", service, err))
        }
    }
}

pub type NotificationResult<T> = Result<T, NotificationError>;
