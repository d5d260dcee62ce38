// lib/src/storage_engine/sled_storage.rs
//! sled-backed persistence.
//!
//! Every record lives in its own tree keyed by the 16 raw bytes of its id
//! and is stored as JSON. Three index trees back the uniqueness rules:
//!
//! - `users_by_email`: email -> user id
//! - `doctors_by_user`: user id -> doctor id
//! - `slots`: doctor id ++ date ++ 0x00 ++ time -> appointment id, holding
//!   an entry only while the appointment is not cancelled
//!
//! Index and record are always written in the same multi-tree transaction.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::{Db, Transactional, Tree};
use tracing::{debug, info};
use uuid::Uuid;

use clinic_models::{Appointment, AppointmentUpdate, Doctor, DoctorUpdate, Review, User, VoiceNotification};

use super::errors::{StorageError, StorageResult};
use super::storage_engine::{AppointmentStorageEngine, DoctorStorageEngine, UserStorageEngine};

const USERS_TREE: &str = "users";
const USERS_BY_EMAIL_TREE: &str = "users_by_email";
const DOCTORS_TREE: &str = "doctors";
const DOCTORS_BY_USER_TREE: &str = "doctors_by_user";
const APPOINTMENTS_TREE: &str = "appointments";
const SLOTS_TREE: &str = "slots";

/// Opens (creating if needed) the sled database at `path`.
pub fn open_sled_db(path: &Path) -> StorageResult<Db> {
    info!("Opening sled database at {:?}", path);
    sled::Config::new()
        .path(path)
        .open()
        .map_err(|e| StorageError::Database(format!("Failed to open sled database at {:?}: {}", path, e)))
}

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn abort<T>(err: StorageError) -> ConflictableTransactionResult<T, StorageError> {
    Err(ConflictableTransactionError::Abort(err))
}

fn slot_key(doctor: &Uuid, date: NaiveDate, time: &str) -> Vec<u8> {
    let mut key = doctor.as_bytes().to_vec();
    key.extend_from_slice(date.format("%Y-%m-%d").to_string().as_bytes());
    key.push(0);
    key.extend_from_slice(time.as_bytes());
    key
}

/// The slot an appointment holds, if its status occupies one.
fn claimed_slot(appointment: &Appointment) -> Option<Vec<u8>> {
    appointment
        .status
        .occupies_slot()
        .then(|| slot_key(&appointment.doctor, appointment.date, &appointment.time))
}

#[derive(Debug, Clone)]
pub struct SledClinicStorage {
    db: Db,
    users: Tree,
    users_by_email: Tree,
    doctors: Tree,
    doctors_by_user: Tree,
    appointments: Tree,
    slots: Tree,
}

impl SledClinicStorage {
    pub fn new(db: Db) -> StorageResult<Self> {
        Ok(SledClinicStorage {
            users: db.open_tree(USERS_TREE)?,
            users_by_email: db.open_tree(USERS_BY_EMAIL_TREE)?,
            doctors: db.open_tree(DOCTORS_TREE)?,
            doctors_by_user: db.open_tree(DOCTORS_BY_USER_TREE)?,
            appointments: db.open_tree(APPOINTMENTS_TREE)?,
            slots: db.open_tree(SLOTS_TREE)?,
            db,
        })
    }

    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::new(open_sled_db(path)?)
    }

    /// Flushes dirty buffers to disk.
    pub async fn flush(&self) -> StorageResult<usize> {
        Ok(self.db.flush_async().await?)
    }

    fn scan<T: DeserializeOwned>(tree: &Tree) -> StorageResult<Vec<T>> {
        tree.iter()
            .values()
            .map(|value| decode(&value?))
            .collect()
    }
}

#[async_trait]
impl UserStorageEngine for SledClinicStorage {
    async fn create_user(&self, user: &User) -> StorageResult<()> {
        let bytes = encode(user)?;
        (&self.users, &self.users_by_email)
            .transaction(|(users, by_email)| -> ConflictableTransactionResult<(), StorageError> {
                if by_email.get(user.email.as_bytes())?.is_some() {
                    return abort(StorageError::AlreadyExists(format!("user with email {}", user.email)));
                }
                by_email.insert(user.email.as_bytes(), &user.id.as_bytes()[..])?;
                users.insert(&user.id.as_bytes()[..], bytes.as_slice())?;
                Ok(())
            })?;
        debug!("Stored user {}", user.id);
        Ok(())
    }

    async fn get_user(&self, id: &Uuid) -> StorageResult<Option<User>> {
        self.users.get(id.as_bytes())?.map(|bytes| decode(&bytes)).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        match self.users_by_email.get(email.as_bytes())? {
            Some(id) => self.users.get(id)?.map(|bytes| decode(&bytes)).transpose(),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = Self::scan(&self.users)?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[async_trait]
impl DoctorStorageEngine for SledClinicStorage {
    async fn create_doctor(&self, doctor: &Doctor) -> StorageResult<()> {
        let bytes = encode(doctor)?;
        (&self.doctors, &self.doctors_by_user)
            .transaction(|(doctors, by_user)| -> ConflictableTransactionResult<(), StorageError> {
                if by_user.get(doctor.user.as_bytes())?.is_some() {
                    return abort(StorageError::AlreadyExists(format!(
                        "doctor profile for user {}",
                        doctor.user
                    )));
                }
                by_user.insert(&doctor.user.as_bytes()[..], &doctor.id.as_bytes()[..])?;
                doctors.insert(&doctor.id.as_bytes()[..], bytes.as_slice())?;
                Ok(())
            })?;
        debug!("Stored doctor {} for user {}", doctor.id, doctor.user);
        Ok(())
    }

    async fn get_doctor(&self, id: &Uuid) -> StorageResult<Option<Doctor>> {
        self.doctors.get(id.as_bytes())?.map(|bytes| decode(&bytes)).transpose()
    }

    async fn get_doctor_by_user(&self, user: &Uuid) -> StorageResult<Option<Doctor>> {
        match self.doctors_by_user.get(user.as_bytes())? {
            Some(id) => self.doctors.get(id)?.map(|bytes| decode(&bytes)).transpose(),
            None => Ok(None),
        }
    }

    async fn list_doctors(&self) -> StorageResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = Self::scan(&self.doctors)?;
        doctors.sort_by_key(|d| d.created_at);
        Ok(doctors)
    }

    async fn update_doctor(&self, id: &Uuid, update: DoctorUpdate) -> StorageResult<Doctor> {
        let updated = self
            .doctors
            .transaction(|doctors| -> ConflictableTransactionResult<Doctor, StorageError> {
                let mut doctor = match doctors.get(id.as_bytes())? {
                    Some(current) => decode::<Doctor>(&current).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(StorageError::NotFound(format!("doctor {}", id))),
                };
                if let Err(e) = doctor.apply_update(update.clone()) {
                    return abort(e.into());
                }
                let bytes = encode(&doctor).map_err(ConflictableTransactionError::Abort)?;
                doctors.insert(&id.as_bytes()[..], bytes)?;
                Ok(doctor)
            })?;
        debug!("Updated doctor {}", id);
        Ok(updated)
    }

    async fn add_review(&self, doctor_id: &Uuid, review: Review) -> StorageResult<Doctor> {
        let updated = self
            .doctors
            .transaction(|doctors| -> ConflictableTransactionResult<Doctor, StorageError> {
                let mut doctor = match doctors.get(doctor_id.as_bytes())? {
                    Some(current) => decode::<Doctor>(&current).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(StorageError::NotFound(format!("doctor {}", doctor_id))),
                };
                if doctor.has_review_from(&review.user) {
                    return abort(StorageError::AlreadyExists(format!(
                        "review by user {} for doctor {}",
                        review.user, doctor_id
                    )));
                }
                doctor.add_review(review.clone());
                let bytes = encode(&doctor).map_err(ConflictableTransactionError::Abort)?;
                doctors.insert(&doctor_id.as_bytes()[..], bytes)?;
                Ok(doctor)
            })?;
        Ok(updated)
    }
}

#[async_trait]
impl AppointmentStorageEngine for SledClinicStorage {
    async fn create_appointment(&self, appointment: &Appointment) -> StorageResult<()> {
        let bytes = encode(appointment)?;
        let slot = claimed_slot(appointment);
        (&self.appointments, &self.slots)
            .transaction(|(appointments, slots)| -> ConflictableTransactionResult<(), StorageError> {
                if let Some(slot) = &slot {
                    if slots.get(slot.as_slice())?.is_some() {
                        return abort(StorageError::SlotTaken);
                    }
                    slots.insert(slot.as_slice(), &appointment.id.as_bytes()[..])?;
                }
                appointments.insert(&appointment.id.as_bytes()[..], bytes.as_slice())?;
                Ok(())
            })?;
        debug!("Stored appointment {} ({})", appointment.id, appointment.status);
        Ok(())
    }

    async fn get_appointment(&self, id: &Uuid) -> StorageResult<Option<Appointment>> {
        self.appointments.get(id.as_bytes())?.map(|bytes| decode(&bytes)).transpose()
    }

    async fn list_appointments(&self) -> StorageResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = Self::scan(&self.appointments)?;
        appointments.sort_by_key(|a| a.created_at);
        Ok(appointments)
    }

    async fn list_appointments_for_patient(&self, patient: &Uuid) -> StorageResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .list_appointments()
            .await?
            .into_iter()
            .filter(|a| a.is_owned_by(patient))
            .collect();
        appointments.sort_by_key(|a| a.created_at);
        Ok(appointments)
    }

    async fn update_appointment(&self, id: &Uuid, update: &AppointmentUpdate) -> StorageResult<Appointment> {
        let key = &id.as_bytes()[..];
        let updated = (&self.appointments, &self.slots)
            .transaction(|(appointments, slots)| -> ConflictableTransactionResult<Appointment, StorageError> {
                let current: Appointment = match appointments.get(key)? {
                    Some(current) => decode(&current).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(StorageError::NotFound(format!("appointment {}", id))),
                };
                let next = match current.with_update(update) {
                    Ok(next) => next,
                    Err(e) => return abort(e.into()),
                };
                let current_slot = claimed_slot(&current);
                let next_slot = claimed_slot(&next);
                if current_slot != next_slot {
                    if let Some(old) = &current_slot {
                        slots.remove(old.as_slice())?;
                    }
                    if let Some(new) = &next_slot {
                        if let Some(holder) = slots.get(new.as_slice())? {
                            if &holder[..] != key {
                                return abort(StorageError::SlotTaken);
                            }
                        }
                        slots.insert(new.as_slice(), key)?;
                    }
                }
                let bytes = encode(&next).map_err(ConflictableTransactionError::Abort)?;
                appointments.insert(key, bytes)?;
                Ok(next)
            })?;
        debug!("Updated appointment {} ({})", id, updated.status);
        Ok(updated)
    }

    async fn record_voice_notification(
        &self,
        id: &Uuid,
        notification: &VoiceNotification,
    ) -> StorageResult<Appointment> {
        let key = &id.as_bytes()[..];
        let updated = self
            .appointments
            .transaction(|appointments| -> ConflictableTransactionResult<Appointment, StorageError> {
                let mut appointment: Appointment = match appointments.get(key)? {
                    Some(current) => decode(&current).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(StorageError::NotFound(format!("appointment {}", id))),
                };
                appointment.voice_notification = Some(notification.clone());
                appointment.updated_at = notification.sent_at;
                let bytes = encode(&appointment).map_err(ConflictableTransactionError::Abort)?;
                appointments.insert(key, bytes)?;
                Ok(appointment)
            })?;
        debug!("Recorded voice notification for appointment {}", id);
        Ok(updated)
    }

    async fn delete_appointment(&self, id: &Uuid) -> StorageResult<()> {
        let key = &id.as_bytes()[..];
        (&self.appointments, &self.slots)
            .transaction(|(appointments, slots)| -> ConflictableTransactionResult<(), StorageError> {
                let current: Appointment = match appointments.remove(key)? {
                    Some(current) => decode(&current).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(StorageError::NotFound(format!("appointment {}", id))),
                };
                if let Some(slot) = claimed_slot(&current) {
                    if slots.get(slot.as_slice())?.is_some_and(|holder| &holder[..] == key) {
                        slots.remove(slot.as_slice())?;
                    }
                }
                Ok(())
            })?;
        debug!("Deleted appointment {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clinic_models::{AppointmentStatus, NewAppointment, NewDoctor, NewReview, NewUser, Role};

    fn storage() -> SledClinicStorage {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledClinicStorage::new(db).unwrap()
    }

    fn user(email: &str) -> User {
        let new_user = NewUser {
            name: "Test User".into(),
            email: email.into(),
            password: "secret1".into(),
            ..Default::default()
        };
        User::from_new_user(new_user, "$argon2id$stub".into(), Role::Patient)
    }

    fn appointment(doctor: Uuid, patient: Uuid, time: &str) -> Appointment {
        let request = NewAppointment {
            date: "2025-06-01".into(),
            time: time.into(),
            reason: "Checkup".into(),
            ..Default::default()
        };
        Appointment::from_request(&request, doctor, patient).unwrap()
    }

    #[tokio::test]
    async fn should_enforce_unique_email() {
        let storage = storage();
        let first = user("a@b.com");
        storage.create_user(&first).await.unwrap();
        let err = storage.create_user(&user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let found = storage.get_user_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(storage.get_user_by_email("A@b.com").await.unwrap().is_none());
        assert_eq!(storage.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_allow_one_doctor_per_user() {
        let storage = storage();
        let owner = Uuid::new_v4();
        let doctor = Doctor::from_new_doctor(NewDoctor::default(), owner, "Dr. A").unwrap();
        storage.create_doctor(&doctor).await.unwrap();
        let second = Doctor::from_new_doctor(NewDoctor::default(), owner, "Dr. B").unwrap();
        assert!(matches!(storage.create_doctor(&second).await, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.get_doctor_by_user(&owner).await.unwrap().unwrap().id, doctor.id);
    }

    #[tokio::test]
    async fn should_accept_one_review_per_patient() {
        let storage = storage();
        let doctor = Doctor::from_new_doctor(NewDoctor::default(), Uuid::new_v4(), "Dr. A").unwrap();
        storage.create_doctor(&doctor).await.unwrap();
        let patient = Uuid::new_v4();
        let review = NewReview { rating: 4, comment: "ok".into() }.into_review(patient).unwrap();

        let updated = storage.add_review(&doctor.id, review.clone()).await.unwrap();
        assert_eq!(updated.number_of_reviews, 1);
        assert!(matches!(storage.add_review(&doctor.id, review).await, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn should_reject_second_live_booking_of_a_slot() {
        let storage = storage();
        let doctor = Uuid::new_v4();
        storage.create_appointment(&appointment(doctor, Uuid::new_v4(), "10:00 AM")).await.unwrap();
        let err = storage
            .create_appointment(&appointment(doctor, Uuid::new_v4(), "10:00 AM"))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::SlotTaken);
        storage.create_appointment(&appointment(doctor, Uuid::new_v4(), "11:00 AM")).await.unwrap();
    }

    fn status(status: AppointmentStatus) -> AppointmentUpdate {
        AppointmentUpdate { status: Some(status), ..Default::default() }
    }

    #[tokio::test]
    async fn should_release_slot_on_cancel_and_reclaim_on_restore() {
        let storage = storage();
        let doctor = Uuid::new_v4();
        let first = appointment(doctor, Uuid::new_v4(), "10:00 AM");
        storage.create_appointment(&first).await.unwrap();

        let cancelled = storage.update_appointment(&first.id, &status(AppointmentStatus::Cancelled)).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let second = appointment(doctor, Uuid::new_v4(), "10:00 AM");
        storage.create_appointment(&second).await.unwrap();

        let err = storage.update_appointment(&first.id, &status(AppointmentStatus::Pending)).await.unwrap_err();
        assert_eq!(err, StorageError::SlotTaken);
        let stored = storage.get_appointment(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn should_move_slot_claim_when_rescheduled() {
        let storage = storage();
        let doctor = Uuid::new_v4();
        let first = appointment(doctor, Uuid::new_v4(), "10:00 AM");
        storage.create_appointment(&first).await.unwrap();
        let other = appointment(doctor, Uuid::new_v4(), "11:00 AM");
        storage.create_appointment(&other).await.unwrap();

        let clash = AppointmentUpdate { time: Some("11:00 AM".into()), ..Default::default() };
        assert_eq!(storage.update_appointment(&first.id, &clash).await.unwrap_err(), StorageError::SlotTaken);

        let moved = AppointmentUpdate {
            date: Some("2025-06-02".into()),
            time: Some("11:00 AM".into()),
            ..Default::default()
        };
        let rescheduled = storage.update_appointment(&first.id, &moved).await.unwrap();
        assert_eq!(rescheduled.date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        storage.create_appointment(&appointment(doctor, Uuid::new_v4(), "10:00 AM")).await.unwrap();
    }

    #[tokio::test]
    async fn should_reject_invalid_update_without_writing() {
        let storage = storage();
        let first = appointment(Uuid::new_v4(), Uuid::new_v4(), "10:00 AM");
        storage.create_appointment(&first).await.unwrap();

        let blank = AppointmentUpdate { reason: Some("  ".into()), ..Default::default() };
        assert!(matches!(storage.update_appointment(&first.id, &blank).await, Err(StorageError::Invalid(_))));
        assert!(matches!(
            storage.update_appointment(&Uuid::new_v4(), &AppointmentUpdate::default()).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(storage.get_appointment(&first.id).await.unwrap().unwrap().reason, "Checkup");
    }

    #[tokio::test]
    async fn should_keep_review_added_after_profile_was_read() {
        let storage = storage();
        let doctor = Doctor::from_new_doctor(NewDoctor::default(), Uuid::new_v4(), "Dr. A").unwrap();
        storage.create_doctor(&doctor).await.unwrap();
        let read_before_review = storage.get_doctor(&doctor.id).await.unwrap().unwrap();
        assert_eq!(read_before_review.number_of_reviews, 0);

        let review = NewReview { rating: 5, comment: "great".into() }.into_review(Uuid::new_v4()).unwrap();
        storage.add_review(&doctor.id, review).await.unwrap();

        let update = DoctorUpdate { experience: Some(9), ..Default::default() };
        let updated = storage.update_doctor(&read_before_review.id, update).await.unwrap();
        assert_eq!(updated.experience, 9);
        assert_eq!(updated.number_of_reviews, 1);
        assert_eq!(updated.reviews.len(), 1);

        let stored = storage.get_doctor(&doctor.id).await.unwrap().unwrap();
        assert_eq!(stored.number_of_reviews, 1);
        assert_eq!(stored.average_rating, 5.0);
    }

    #[tokio::test]
    async fn should_keep_voice_notification_across_status_update() {
        let storage = storage();
        let first = appointment(Uuid::new_v4(), Uuid::new_v4(), "10:00 AM");
        storage.create_appointment(&first).await.unwrap();

        let delivery = VoiceNotification {
            sent: true,
            audio_url: "/uploads/voice-notifications/appointment.mp3".into(),
            sent_at: chrono::Utc::now(),
        };
        let recorded = storage.record_voice_notification(&first.id, &delivery).await.unwrap();
        assert_eq!(recorded.status, AppointmentStatus::Pending);

        let confirmed = storage.update_appointment(&first.id, &status(AppointmentStatus::Confirmed)).await.unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.voice_notification, Some(delivery.clone()));

        let renoted = storage
            .update_appointment(&first.id, &AppointmentUpdate { notes: Some("bring reports".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renoted.voice_notification, Some(delivery));
        assert_eq!(renoted.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn should_release_slot_on_delete() {
        let storage = storage();
        let doctor = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let first = appointment(doctor, patient, "10:00 AM");
        storage.create_appointment(&first).await.unwrap();
        assert_eq!(storage.list_appointments_for_patient(&patient).await.unwrap().len(), 1);

        storage.delete_appointment(&first.id).await.unwrap();
        assert!(matches!(storage.delete_appointment(&first.id).await, Err(StorageError::NotFound(_))));
        storage.create_appointment(&appointment(doctor, patient, "10:00 AM")).await.unwrap();
    }
}
