// models/src/lib.rs
//! Records shared by every crate of the clinic backend: users, doctor
//! profiles and appointments, with their field validation and the fee
//! policy.

pub mod errors;
pub mod fees;
pub mod identifiers;
pub mod medical;
pub mod schedule;

pub use errors::{ValidationError, ValidationResult};
pub use fees::{fee_for_specialization, FeeTier};
pub use identifiers::{new_id, parse_id, RecordKind};
pub use medical::*;
