// lib/src/errors.rs

use thiserror::Error;

use clinic_models::ValidationError;
use clinic_security::AuthError;
use notifications_service::NotificationError;

use crate::storage_engine::StorageError;

/// Outcome of a failed service operation.
///
/// The `Display` text of every variant except `Storage` and `Internal` is
/// meant for the end user.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller, or the patient a booking names, does not resolve to a user.
    #[error("{0}")]
    InvalidIdentity(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("This appointment slot is already booked")]
    SlotTaken,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    NotificationFailed {
        message: String,
        #[source]
        source: NotificationError,
    },

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn notification(message: impl Into<String>, source: NotificationError) -> Self {
        ServiceError::NotificationFailed { message: message.into(), source }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SlotTaken => ServiceError::SlotTaken,
            StorageError::AlreadyExists(what) => ServiceError::AlreadyExists(format!("{} already exists", what)),
            StorageError::NotFound(what) => ServiceError::NotFound(format!("{} not found", what)),
            StorageError::Invalid(e) => ServiceError::Validation(e),
            StorageError::Database(e) | StorageError::Serialization(e) => ServiceError::Storage(e),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ServiceError::InvalidCredentials,
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
