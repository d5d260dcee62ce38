// models/src/identifiers.rs

use std::str::FromStr;

use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// The kind of record an identifier points at. Used only to word errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    User,
    Doctor,
    Appointment,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Doctor => "doctor",
            RecordKind::Appointment => "appointment",
        }
    }
}

/// Parses a record identifier received over the wire.
///
/// # Errors
/// Returns `ValidationError::InvalidId` if `value` is not a UUID.
pub fn parse_id(kind: RecordKind, value: &str) -> ValidationResult<Uuid> {
    Uuid::from_str(value.trim()).map_err(|_| ValidationError::InvalidId {
        kind: kind.as_str(),
        value: value.to_string(),
    })
}

/// Generates a fresh random identifier for a new record.
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}
