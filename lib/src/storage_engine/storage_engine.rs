// lib/src/storage_engine/storage_engine.rs
use async_trait::async_trait;
use uuid::Uuid;

use clinic_models::{Appointment, AppointmentUpdate, Doctor, DoctorUpdate, Review, User, VoiceNotification};

use super::errors::StorageResult;

#[async_trait]
pub trait UserStorageEngine: Send + Sync + 'static {
    /// Adds a new user. Fails with `AlreadyExists` if the email is taken.
    async fn create_user(&self, user: &User) -> StorageResult<()>;
    /// Retrieves a user by their unique ID.
    async fn get_user(&self, id: &Uuid) -> StorageResult<Option<User>>;
    /// Retrieves a user by exact (case-sensitive) email.
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    async fn list_users(&self) -> StorageResult<Vec<User>>;
}

#[async_trait]
pub trait DoctorStorageEngine: Send + Sync + 'static {
    /// Adds a doctor profile. Fails with `AlreadyExists` if its user already
    /// owns one.
    async fn create_doctor(&self, doctor: &Doctor) -> StorageResult<()>;
    async fn get_doctor(&self, id: &Uuid) -> StorageResult<Option<Doctor>>;
    async fn get_doctor_by_user(&self, user: &Uuid) -> StorageResult<Option<Doctor>>;
    async fn list_doctors(&self) -> StorageResult<Vec<Doctor>>;
    /// Applies a partial update to the stored profile and returns the result.
    /// Fields the update leaves out keep their stored values.
    async fn update_doctor(&self, id: &Uuid, update: DoctorUpdate) -> StorageResult<Doctor>;
    /// Appends a review and returns the updated profile. Fails with
    /// `AlreadyExists` if the reviewer already reviewed this doctor.
    async fn add_review(&self, doctor: &Uuid, review: Review) -> StorageResult<Doctor>;
}

#[async_trait]
pub trait AppointmentStorageEngine: Send + Sync + 'static {
    /// Inserts an appointment, claiming its slot unless it is cancelled.
    /// Fails with `SlotTaken` if a live appointment holds the slot.
    async fn create_appointment(&self, appointment: &Appointment) -> StorageResult<()>;
    async fn get_appointment(&self, id: &Uuid) -> StorageResult<Option<Appointment>>;
    async fn list_appointments(&self) -> StorageResult<Vec<Appointment>>;
    async fn list_appointments_for_patient(&self, patient: &Uuid) -> StorageResult<Vec<Appointment>>;
    /// Applies a partial update to the stored appointment, moving or
    /// releasing its slot claim as the new date, time and status require.
    async fn update_appointment(&self, id: &Uuid, update: &AppointmentUpdate) -> StorageResult<Appointment>;
    /// Sets the delivery record and leaves every other field as stored.
    async fn record_voice_notification(
        &self,
        id: &Uuid,
        notification: &VoiceNotification,
    ) -> StorageResult<Appointment>;
    /// Removes an appointment and releases its slot.
    async fn delete_appointment(&self, id: &Uuid) -> StorageResult<()>;
}

/// Everything the services need from persistence.
pub trait ClinicStorage: UserStorageEngine + DoctorStorageEngine + AppointmentStorageEngine {}

impl<T> ClinicStorage for T where T: UserStorageEngine + DoctorStorageEngine + AppointmentStorageEngine {}
