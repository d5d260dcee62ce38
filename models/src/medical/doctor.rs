// models/src/medical/doctor.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{require_text, ValidationError, ValidationResult};
use crate::fees::fee_for_specialization;
use crate::identifiers::new_id;
use crate::medical::user::UserSummary;

pub const DEFAULT_SPECIALIZATION: &str = "General Physician";
pub const DEFAULT_EXPERIENCE_YEARS: u32 = 5;
pub const DEFAULT_TIMINGS: [&str; 2] = ["09:00 AM - 12:00 PM", "02:00 PM - 05:00 PM"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub degree: String,
    pub college: String,
    pub year: u16,
}

impl Qualification {
    fn validate(&self) -> ValidationResult<Qualification> {
        Ok(Qualification {
            degree: require_text("qualification degree", &self.degree)?,
            college: require_text("qualification college", &self.college)?,
            year: self.year,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Review payload as posted by a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NewReview {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

impl NewReview {
    pub fn into_review(self, user: Uuid) -> ValidationResult<Review> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::InvalidRating(self.rating));
        }
        Ok(Review {
            user,
            rating: self.rating as u8,
            comment: require_text("comment", &self.comment)?,
            created_at: Utc::now(),
        })
    }
}

// --- DTO for creating a doctor profile ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    /// Owning user; defaults to the caller when absent.
    #[serde(default)]
    pub user: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    /// Ignored: the fee is derived from the specialization.
    #[serde(default)]
    pub fees: Option<u32>,
    #[serde(default)]
    pub timings: Option<Vec<String>>,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

// --- DTO for partial doctor updates ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    /// Ignored: the fee is derived from the specialization.
    #[serde(default)]
    pub fees: Option<u32>,
    #[serde(default)]
    pub timings: Option<Vec<String>>,
    #[serde(default)]
    pub qualifications: Option<Vec<Qualification>>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub user: Uuid,
    pub name: String,
    pub specialization: String,
    pub experience: u32,
    pub fees: u32,
    pub timings: Vec<String>,
    pub qualifications: Vec<Qualification>,
    pub average_rating: f64,
    pub number_of_reviews: u32,
    pub reviews: Vec<Review>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Builds a profile for `user`, filling defaults and deriving the fee.
    pub fn from_new_doctor(new_doctor: NewDoctor, user: Uuid, fallback_name: &str) -> ValidationResult<Self> {
        let specialization = match new_doctor.specialization.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => DEFAULT_SPECIALIZATION.to_string(),
        };
        let name = match new_doctor.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => fallback_name.to_string(),
        };
        let timings = match new_doctor.timings {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_TIMINGS.iter().map(|t| t.to_string()).collect(),
        };
        let qualifications = new_doctor
            .qualifications
            .iter()
            .map(Qualification::validate)
            .collect::<ValidationResult<Vec<_>>>()?;
        let now = Utc::now();
        Ok(Doctor {
            id: new_id(),
            user,
            name,
            fees: fee_for_specialization(&specialization),
            specialization,
            experience: new_doctor.experience.filter(|e| *e > 0).unwrap_or(DEFAULT_EXPERIENCE_YEARS),
            timings,
            qualifications,
            average_rating: 0.0,
            number_of_reviews: 0,
            reviews: Vec::new(),
            is_available: new_doctor.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update. The fee is re-derived only when a
    /// specialization is supplied; a caller-supplied fee is always dropped.
    pub fn apply_update(&mut self, update: DoctorUpdate) -> ValidationResult<()> {
        if let Some(name) = update.name {
            self.name = require_text("name", &name)?;
        }
        if let Some(specialization) = update.specialization {
            let specialization = require_text("specialization", &specialization)?;
            self.fees = fee_for_specialization(&specialization);
            self.specialization = specialization;
        }
        if let Some(experience) = update.experience {
            self.experience = experience;
        }
        if let Some(timings) = update.timings {
            self.timings = timings;
        }
        if let Some(qualifications) = update.qualifications {
            self.qualifications = qualifications
                .iter()
                .map(Qualification::validate)
                .collect::<ValidationResult<Vec<_>>>()?;
        }
        if let Some(is_available) = update.is_available {
            self.is_available = is_available;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn has_review_from(&self, user: &Uuid) -> bool {
        self.reviews.iter().any(|r| &r.user == user)
    }

    /// Appends a review and recomputes the aggregate statistics.
    pub fn add_review(&mut self, review: Review) {
        self.reviews.push(review);
        self.number_of_reviews = self.reviews.len() as u32;
        let total: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
        self.average_rating = total as f64 / self.reviews.len() as f64;
        self.updated_at = Utc::now();
    }

    pub fn summary(&self, user: Option<UserSummary>) -> DoctorSummary {
        DoctorSummary {
            id: self.id,
            name: self.name.clone(),
            specialization: self.specialization.clone(),
            fees: self.fees,
            user,
        }
    }
}

/// Doctor fields embedded in an expanded appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub fees: u32,
    pub user: Option<UserSummary>,
}

/// A doctor profile with its owning user expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorView {
    #[serde(flatten)]
    pub doctor: Doctor,
    #[serde(rename = "userDetails")]
    pub user_details: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(specialization: &str) -> Doctor {
        let new_doctor = NewDoctor {
            specialization: Some(specialization.to_string()),
            fees: Some(1),
            ..Default::default()
        };
        Doctor::from_new_doctor(new_doctor, new_id(), "Dr. Who").unwrap()
    }

    #[test]
    fn should_fill_defaults_and_derive_fee() {
        let d = Doctor::from_new_doctor(NewDoctor::default(), new_id(), "Dr. Default").unwrap();
        assert_eq!(d.specialization, DEFAULT_SPECIALIZATION);
        assert_eq!(d.experience, DEFAULT_EXPERIENCE_YEARS);
        assert_eq!(d.timings.len(), 2);
        assert_eq!(d.fees, 2000);
        assert_eq!(d.name, "Dr. Default");
        assert!(d.is_available);
    }

    #[test]
    fn should_overwrite_caller_fee() {
        assert_eq!(doctor("Oncology").fees, 4000);
    }

    #[test]
    fn should_rederive_fee_only_when_specialization_supplied() {
        let mut d = doctor("Pediatrics");
        d.apply_update(DoctorUpdate { specialization: Some("cardiac surgery".into()), ..Default::default() })
            .unwrap();
        assert_eq!(d.fees, 4000);

        d.apply_update(DoctorUpdate { experience: Some(20), fees: Some(10), ..Default::default() })
            .unwrap();
        assert_eq!(d.fees, 4000);
        assert_eq!(d.experience, 20);
    }

    #[test]
    fn should_average_reviews() {
        let mut d = doctor("Dermatology");
        d.add_review(NewReview { rating: 5, comment: "great".into() }.into_review(new_id()).unwrap());
        d.add_review(NewReview { rating: 2, comment: "late".into() }.into_review(new_id()).unwrap());
        assert_eq!(d.number_of_reviews, 2);
        assert!((d.average_rating - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn should_reject_rating_out_of_range() {
        let err = NewReview { rating: 6, comment: "x".into() }.into_review(new_id()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidRating(6));
    }
}
