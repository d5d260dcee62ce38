// lib/src/services/doctors.rs
use std::sync::Arc;

use tracing::info;

use clinic_models::{parse_id, Doctor, DoctorUpdate, DoctorView, NewDoctor, NewReview, RecordKind, Role};
use clinic_security::Caller;

use super::resolve_caller;
use crate::errors::{ServiceError, ServiceResult};
use crate::storage_engine::{ClinicStorage, DoctorStorageEngine, StorageError, UserStorageEngine};

#[derive(Clone)]
pub struct DoctorService {
    storage: Arc<dyn ClinicStorage>,
}

impl DoctorService {
    pub fn new(storage: Arc<dyn ClinicStorage>) -> Self {
        DoctorService { storage }
    }

    pub async fn list_doctors(&self) -> ServiceResult<Vec<DoctorView>> {
        let doctors = self.storage.list_doctors().await?;
        let mut views = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            views.push(self.expand(doctor).await?);
        }
        Ok(views)
    }

    pub async fn get_doctor(&self, id: &str) -> ServiceResult<DoctorView> {
        let doctor = self.load(id).await?;
        self.expand(doctor).await
    }

    /// Admins may create a profile for any doctor-role user; a doctor-role
    /// user may create their own. The fee is always derived.
    pub async fn create_doctor(&self, caller: &Caller, new_doctor: NewDoctor) -> ServiceResult<Doctor> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let owner_id = new_doctor.user.unwrap_or(actor.id);
        if !actor.role.is_admin() && (actor.role != Role::Doctor || owner_id != actor.id) {
            return Err(ServiceError::Forbidden("Only doctors can create a doctor profile".to_string()));
        }
        let owner = self
            .storage
            .get_user(&owner_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidIdentity(format!("User not found with id of {}", owner_id)))?;
        if owner.role != Role::Doctor {
            return Err(ServiceError::InvalidIdentity(format!("User {} does not have the doctor role", owner.id)));
        }

        let doctor = Doctor::from_new_doctor(new_doctor, owner.id, &owner.name)?;
        self.storage.create_doctor(&doctor).await.map_err(|e| match e {
            StorageError::AlreadyExists(_) => {
                ServiceError::AlreadyExists("Doctor profile already exists for this user".to_string())
            }
            other => other.into(),
        })?;
        info!("Created doctor {} ({}, fee {})", doctor.id, doctor.specialization, doctor.fees);
        Ok(doctor)
    }

    /// Owner or admin. The update is applied to the stored profile, so
    /// reviews recorded meanwhile are kept.
    pub async fn update_doctor(&self, caller: &Caller, id: &str, update: DoctorUpdate) -> ServiceResult<Doctor> {
        let doctor = self.load(id).await?;
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        if !actor.role.is_admin() && doctor.user != actor.id {
            return Err(ServiceError::Forbidden("Not authorized to update this doctor".to_string()));
        }
        let updated = self.storage.update_doctor(&doctor.id, update).await.map_err(|e| match e {
            StorageError::NotFound(_) => ServiceError::NotFound(format!("Doctor not found with id of {}", doctor.id)),
            other => other.into(),
        })?;
        info!("Updated doctor {}", updated.id);
        Ok(updated)
    }

    /// Patients only, one review per patient.
    pub async fn add_review(&self, caller: &Caller, id: &str, new_review: NewReview) -> ServiceResult<Doctor> {
        let doctor_id = parse_id(RecordKind::Doctor, id)?;
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        if actor.role != Role::Patient {
            return Err(ServiceError::Forbidden("Only patients can review doctors".to_string()));
        }
        let review = new_review.into_review(actor.id)?;
        let doctor = self.storage.add_review(&doctor_id, review).await.map_err(|e| match e {
            StorageError::AlreadyExists(_) => ServiceError::AlreadyExists("Doctor already reviewed".to_string()),
            StorageError::NotFound(_) => ServiceError::NotFound(format!("Doctor not found with id of {}", doctor_id)),
            other => other.into(),
        })?;
        info!("Doctor {} now has {} reviews", doctor.id, doctor.number_of_reviews);
        Ok(doctor)
    }

    async fn load(&self, id: &str) -> ServiceResult<Doctor> {
        let doctor_id = parse_id(RecordKind::Doctor, id)?;
        self.storage
            .get_doctor(&doctor_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Doctor not found with id of {}", doctor_id)))
    }

    async fn expand(&self, doctor: Doctor) -> ServiceResult<DoctorView> {
        let user_details = self.storage.get_user(&doctor.user).await?.map(|u| u.summary());
        Ok(DoctorView { doctor, user_details })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::SledClinicStorage;
    use clinic_models::{NewUser, User, ValidationError};

    struct Fixture {
        storage: Arc<dyn ClinicStorage>,
        service: DoctorService,
    }

    fn fixture() -> Fixture {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let storage: Arc<dyn ClinicStorage> = Arc::new(SledClinicStorage::new(db).unwrap());
        Fixture { service: DoctorService::new(storage.clone()), storage }
    }

    async fn user(storage: &Arc<dyn ClinicStorage>, email: &str, role: Role) -> Caller {
        let new_user = NewUser { name: format!("User {}", email), email: email.into(), ..Default::default() };
        let user = User::from_new_user(new_user, "$argon2id$stub".into(), role);
        storage.create_user(&user).await.unwrap();
        Caller::new(user.id, role)
    }

    #[tokio::test]
    async fn should_let_doctor_create_own_profile_once() {
        let f = fixture();
        let doctor_user = user(&f.storage, "doc@example.com", Role::Doctor).await;
        let request = NewDoctor { specialization: Some("Neurosurgery".into()), fees: Some(1), ..Default::default() };

        let doctor = f.service.create_doctor(&doctor_user, request.clone()).await.unwrap();
        assert_eq!(doctor.fees, 4000);
        assert_eq!(doctor.name, "User doc@example.com");

        let err = f.service.create_doctor(&doctor_user, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));

        let view = f.service.get_doctor(&doctor.id.to_string()).await.unwrap();
        assert_eq!(view.user_details.unwrap().email, "doc@example.com");
    }

    #[tokio::test]
    async fn should_forbid_patients_creating_profiles() {
        let f = fixture();
        let patient = user(&f.storage, "p@example.com", Role::Patient).await;
        let err = f.service.create_doctor(&patient, NewDoctor::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_let_admin_create_for_doctor_users_only() {
        let f = fixture();
        let admin = user(&f.storage, "admin@example.com", Role::Admin).await;
        let patient = user(&f.storage, "p@example.com", Role::Patient).await;
        let doctor_user = user(&f.storage, "doc@example.com", Role::Doctor).await;

        let for_patient = NewDoctor { user: Some(patient.user_id), ..Default::default() };
        assert!(matches!(
            f.service.create_doctor(&admin, for_patient).await,
            Err(ServiceError::InvalidIdentity(_))
        ));
        let for_doctor = NewDoctor { user: Some(doctor_user.user_id), ..Default::default() };
        assert_eq!(f.service.create_doctor(&admin, for_doctor).await.unwrap().user, doctor_user.user_id);
    }

    #[tokio::test]
    async fn should_rederive_fee_on_specialization_update_only() {
        let f = fixture();
        let doctor_user = user(&f.storage, "doc@example.com", Role::Doctor).await;
        let doctor = f
            .service
            .create_doctor(&doctor_user, NewDoctor { specialization: Some("Pediatrics".into()), ..Default::default() })
            .await
            .unwrap();
        let id = doctor.id.to_string();
        assert_eq!(doctor.fees, 2000);

        let updated = f
            .service
            .update_doctor(&doctor_user, &id, DoctorUpdate { specialization: Some("ONCOLOGY".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.fees, 4000);

        let updated = f
            .service
            .update_doctor(&doctor_user, &id, DoctorUpdate { experience: Some(12), fees: Some(5), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.fees, 4000);

        let stranger = user(&f.storage, "other@example.com", Role::Doctor).await;
        assert!(matches!(
            f.service.update_doctor(&stranger, &id, DoctorUpdate::default()).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn should_keep_reviews_when_owner_updates_profile() {
        let f = fixture();
        let doctor_user = user(&f.storage, "doc@example.com", Role::Doctor).await;
        let patient = user(&f.storage, "p@example.com", Role::Patient).await;
        let doctor = f.service.create_doctor(&doctor_user, NewDoctor::default()).await.unwrap();
        let id = doctor.id.to_string();

        f.service.add_review(&patient, &id, NewReview { rating: 3, comment: "Fine".into() }).await.unwrap();
        let updated = f
            .service
            .update_doctor(&doctor_user, &id, DoctorUpdate { is_available: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert!(!updated.is_available);
        assert_eq!(updated.number_of_reviews, 1);
        assert_eq!(updated.average_rating, 3.0);

        let blank = DoctorUpdate { name: Some(" ".into()), ..Default::default() };
        assert!(matches!(
            f.service.update_doctor(&doctor_user, &id, blank).await,
            Err(ServiceError::Validation(ValidationError::Required("name")))
        ));
        assert_eq!(f.service.get_doctor(&id).await.unwrap().doctor.name, doctor.name);
    }

    #[tokio::test]
    async fn should_accept_reviews_from_patients_only() {
        let f = fixture();
        let doctor_user = user(&f.storage, "doc@example.com", Role::Doctor).await;
        let patient = user(&f.storage, "p@example.com", Role::Patient).await;
        let doctor = f.service.create_doctor(&doctor_user, NewDoctor::default()).await.unwrap();
        let id = doctor.id.to_string();

        let review = NewReview { rating: 5, comment: "Very thorough".into() };
        assert!(matches!(
            f.service.add_review(&doctor_user, &id, review.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let reviewed = f.service.add_review(&patient, &id, review.clone()).await.unwrap();
        assert_eq!(reviewed.average_rating, 5.0);
        assert!(matches!(f.service.add_review(&patient, &id, review).await, Err(ServiceError::AlreadyExists(_))));

        let bad = NewReview { rating: 0, comment: "x".into() };
        let other = user(&f.storage, "q@example.com", Role::Patient).await;
        assert!(matches!(
            f.service.add_review(&other, &id, bad).await,
            Err(ServiceError::Validation(ValidationError::InvalidRating(0)))
        ));
    }

    #[tokio::test]
    async fn should_reject_malformed_ids() {
        let f = fixture();
        assert!(matches!(
            f.service.get_doctor("not-an-id").await,
            Err(ServiceError::Validation(ValidationError::InvalidId { .. }))
        ));
        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(f.service.get_doctor(&missing).await, Err(ServiceError::NotFound(_))));
    }
}
