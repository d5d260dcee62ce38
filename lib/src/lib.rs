// lib/src/lib.rs
//! Core of the clinic backend: sled-backed storage engines, the auth, doctor
//! and booking services, and the reminder scheduler.

pub mod errors;
pub mod scheduler;
pub mod services;
pub mod storage_engine;

pub use crate::errors::{ServiceError, ServiceResult};
pub use crate::scheduler::{ReminderScheduler, SchedulerConfig};
pub use crate::services::{AuthService, AuthSession, BookingService, DoctorService, VoiceCheck, VoiceDispatch};
pub use crate::storage_engine::{
    create_storage, open_sled_db, AppointmentStorageEngine, ClinicStorage, DoctorStorageEngine, SledClinicStorage,
    StorageError, StorageResult, UserStorageEngine,
};
