// lib/src/services/booking.rs
//! Appointment booking and the voice/email confirmation flow.
//!
//! Slot conflicts are decided by the storage transaction, never by a
//! read-then-write in this module. Notification side effects run before any
//! write, so a failed synthesis or email leaves the appointment untouched.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use clinic_models::schedule::{long_date, spoken_date};
use clinic_models::{
    parse_id, Appointment, AppointmentUpdate, AppointmentView, NewAppointment, RecordKind, User, ValidationError,
    VoiceNotification,
};
use clinic_security::Caller;
use notifications_service::{BookingMessage, ConfirmationEmail, EmailSender, VoiceSynthesizer};

use super::resolve_caller;
use crate::errors::{ServiceError, ServiceResult};
use crate::storage_engine::{AppointmentStorageEngine, ClinicStorage, DoctorStorageEngine, StorageError, UserStorageEngine};

pub const CONFIRMATION_SUBJECT: &str = "Appointment Confirmation with Voice Notification";

/// Result of a successful send-voice request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDispatch {
    pub appointment_id: Uuid,
    pub audio_url: String,
    pub email_sent: bool,
    pub message_id: String,
}

/// Result of the voice connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCheck {
    pub api_connected: bool,
    pub voices: usize,
}

#[derive(Clone)]
pub struct BookingService {
    storage: Arc<dyn ClinicStorage>,
    voice: Arc<dyn VoiceSynthesizer>,
    email: Arc<dyn EmailSender>,
}

impl BookingService {
    pub fn new(
        storage: Arc<dyn ClinicStorage>,
        voice: Arc<dyn VoiceSynthesizer>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        BookingService { storage, voice, email }
    }

    /// All appointments for an admin, otherwise the caller's own.
    pub async fn list_appointments(&self, caller: &Caller) -> ServiceResult<Vec<AppointmentView>> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let appointments = if actor.role.is_admin() {
            self.storage.list_appointments().await?
        } else {
            self.storage.list_appointments_for_patient(&actor.id).await?
        };
        debug!("Listing {} appointments for {}", appointments.len(), actor.id);
        let mut views = Vec::with_capacity(appointments.len());
        for appointment in &appointments {
            views.push(self.expand(appointment).await?);
        }
        Ok(views)
    }

    /// Owner only.
    pub async fn get_appointment(&self, caller: &Caller, id: &str) -> ServiceResult<AppointmentView> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let appointment = self.load(id).await?;
        if !appointment.is_owned_by(&actor.id) {
            return Err(ServiceError::Forbidden("You can only view your own appointments.".to_string()));
        }
        self.expand(&appointment).await
    }

    pub async fn create_appointment(&self, caller: &Caller, request: NewAppointment) -> ServiceResult<Appointment> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let patient = self.resolve_patient(&actor, request.patient.as_deref()).await?;

        let doctor_ref = request
            .doctor
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(ValidationError::Required("doctor"))?;
        let doctor_id = parse_id(RecordKind::Doctor, doctor_ref)?;
        let doctor = self
            .storage
            .get_doctor(&doctor_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Doctor not found with id of {}", doctor_id)))?;

        let appointment = Appointment::from_request(&request, doctor.id, patient.id)?;
        self.storage.create_appointment(&appointment).await?;
        info!(
            "Booked appointment {} with doctor {} on {} at {}",
            appointment.id, doctor.id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    /// Owner only. Moving out of `cancelled` or to another date/time
    /// re-claims the slot. Only the fields present in `update` change.
    pub async fn update_appointment(
        &self,
        caller: &Caller,
        id: &str,
        update: AppointmentUpdate,
    ) -> ServiceResult<Appointment> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let appointment = self.load(id).await?;
        if !appointment.is_owned_by(&actor.id) {
            return Err(ServiceError::Forbidden("You can only update your own appointments.".to_string()));
        }
        let updated = self.storage.update_appointment(&appointment.id, &update).await?;
        info!("Updated appointment {} ({})", updated.id, updated.status);
        Ok(updated)
    }

    /// Owner or admin.
    pub async fn delete_appointment(&self, caller: &Caller, id: &str) -> ServiceResult<()> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let appointment = self.load(id).await?;
        if !actor.role.is_admin() && !appointment.is_owned_by(&actor.id) {
            return Err(ServiceError::Forbidden("You can only delete your own appointments.".to_string()));
        }
        self.storage.delete_appointment(&appointment.id).await?;
        info!("Deleted appointment {}", appointment.id);
        Ok(())
    }

    /// Synthesizes the confirmation, emails it, then records delivery.
    /// Nothing is written unless both calls succeed.
    pub async fn dispatch_voice_notification(&self, caller: &Caller, id: &str) -> ServiceResult<VoiceDispatch> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        let appointment_id = parse_id(RecordKind::Appointment, id)?;
        let appointment = self
            .storage
            .get_appointment(&appointment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;
        if !actor.role.is_admin() && !appointment.is_owned_by(&actor.id) {
            return Err(ServiceError::Forbidden(
                "You can only send notifications for your own appointments.".to_string(),
            ));
        }

        let view = self.expand(&appointment).await?;
        let patient = view
            .patient
            .ok_or_else(|| ServiceError::InvalidIdentity("Appointment patient no longer exists".to_string()))?;
        let doctor_name = view.doctor.map(|d| d.name).unwrap_or_else(|| "Doctor".to_string());

        let message = BookingMessage {
            recipient_name: patient.name.clone(),
            counterpart_name: doctor_name.clone(),
            date: spoken_date(appointment.date),
            time: appointment.time.clone(),
            reason: appointment.reason.clone(),
        };
        let audio_url = self
            .voice
            .create_booking_notification(&appointment.id, &message)
            .await
            .map_err(|e| {
                error!("Voice synthesis failed for appointment {}: {}", appointment.id, e);
                ServiceError::notification("Failed to generate voice notification", e)
            })?;

        let email = ConfirmationEmail {
            recipient_email: patient.email.clone(),
            recipient_name: patient.name.clone(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            doctor_name,
            date: long_date(appointment.date),
            time: appointment.time.clone(),
            reason: appointment.reason.clone(),
            audio_locator: Some(audio_url.clone()),
        };
        let message_id = self.email.send_confirmation(&email).await.map_err(|e| {
            error!("Confirmation email failed for appointment {}: {}", appointment.id, e);
            ServiceError::notification("Failed to send email notification", e)
        })?;

        let delivery = VoiceNotification { sent: true, audio_url: audio_url.clone(), sent_at: Utc::now() };
        self.storage
            .record_voice_notification(&appointment.id, &delivery)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => ServiceError::NotFound("Appointment not found".to_string()),
                other => other.into(),
            })?;
        info!("Voice notification for appointment {} delivered", appointment.id);

        Ok(VoiceDispatch { appointment_id: appointment.id, audio_url, email_sent: true, message_id })
    }

    pub async fn test_voice(&self) -> ServiceResult<VoiceCheck> {
        let voices = self
            .voice
            .check_connection()
            .await
            .map_err(|e| ServiceError::notification("Voice service test failed", e))?;
        Ok(VoiceCheck { api_connected: true, voices })
    }

    /// The booking's patient: the caller unless an admin names someone else.
    async fn resolve_patient(&self, actor: &User, patient: Option<&str>) -> ServiceResult<User> {
        let patient_id = match patient.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => parse_id(RecordKind::User, p)?,
            None => return Ok(actor.clone()),
        };
        if patient_id == actor.id {
            return Ok(actor.clone());
        }
        let patient = self
            .storage
            .get_user(&patient_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidIdentity("Invalid patient ID. Please login again.".to_string()))?;
        if !actor.role.is_admin() {
            return Err(ServiceError::Forbidden("You can only book appointments for yourself.".to_string()));
        }
        Ok(patient)
    }

    async fn load(&self, id: &str) -> ServiceResult<Appointment> {
        let appointment_id = parse_id(RecordKind::Appointment, id)?;
        self.storage
            .get_appointment(&appointment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment not found with id of {}", appointment_id)))
    }

    async fn expand(&self, appointment: &Appointment) -> ServiceResult<AppointmentView> {
        let doctor = match self.storage.get_doctor(&appointment.doctor).await? {
            Some(doctor) => {
                let owner = self.storage.get_user(&doctor.user).await?.map(|u| u.summary());
                Some(doctor.summary(owner))
            }
            None => None,
        };
        let patient = self.storage.get_user(&appointment.patient).await?.map(|u| u.summary());
        Ok(AppointmentView::new(appointment, doctor, patient))
    }
}
