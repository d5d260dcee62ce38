// lib/src/storage_engine/errors.rs
use sled::transaction::TransactionError;
use thiserror::Error;

use clinic_models::ValidationError;

/// Failures raised by the storage engines.
///
/// Constraint violations detected inside a transaction abort it with one of
/// the typed variants; everything sled itself reports ends up in `Database`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    Database(String),
    #[error("Serialization/Deserialization error: {0}")]
    Serialization(String),
    /// A live appointment already holds the `(doctor, date, time)` slot.
    #[error("slot already taken")]
    SlotTaken,
    /// A unique index (email, doctor-per-user, review-per-patient) already
    /// holds the key.
    #[error("Already Exists: {0}")]
    AlreadyExists(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    /// A partial update produced an invalid record.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StorageError::Database(e.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
