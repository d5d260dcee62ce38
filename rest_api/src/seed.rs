// rest_api/src/seed.rs
//! Sample data for a fresh database: a handful of doctor accounts with
//! profiles, and optionally an admin. Accounts are matched by email, so
//! running the seed twice changes nothing.

use std::sync::Arc;

use tracing::info;

use clinic_lib::{AuthService, ClinicStorage, DoctorService, ServiceError, ServiceResult, UserStorageEngine};
use clinic_models::{NewDoctor, NewUser, Qualification, Role, User};
use clinic_security::Caller;

pub const SAMPLE_DOCTOR_PASSWORD: &str = "password123";

struct SampleDoctor {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    address: &'static str,
    specialization: &'static str,
    experience: u32,
    timings: [&'static str; 2],
    qualifications: [(&'static str, &'static str, u16); 2],
}

const SAMPLE_DOCTORS: &[SampleDoctor] = &[
    SampleDoctor {
        name: "Dr. John Doe",
        email: "john.doe@hospital.com",
        phone: "+1-555-0101",
        address: "123 Medical Center, Boston, MA",
        specialization: "Cardiology",
        experience: 12,
        timings: ["09:00 AM - 12:00 PM", "02:00 PM - 05:00 PM"],
        qualifications: [("MD in Cardiology", "Harvard Medical School", 2010), ("MBBS", "Johns Hopkins University", 2008)],
    },
    SampleDoctor {
        name: "Dr. Sarah Wilson",
        email: "sarah.wilson@hospital.com",
        phone: "+1-555-0102",
        address: "456 Neurology Center, Stanford, CA",
        specialization: "Neurology",
        experience: 15,
        timings: ["10:00 AM - 01:00 PM", "03:00 PM - 06:00 PM"],
        qualifications: [("MD in Neurology", "Stanford Medical School", 2009), ("MBBS", "UCLA School of Medicine", 2007)],
    },
    SampleDoctor {
        name: "Dr. Michael Chen",
        email: "michael.chen@hospital.com",
        phone: "+1-555-0103",
        address: "789 Orthopedic Center, Rochester, MN",
        specialization: "Orthopedics",
        experience: 10,
        timings: ["08:00 AM - 11:00 AM", "01:00 PM - 04:00 PM"],
        qualifications: [
            ("MS in Orthopedics", "Mayo Clinic School of Medicine", 2012),
            ("MBBS", "Duke University School of Medicine", 2010),
        ],
    },
    SampleDoctor {
        name: "Dr. Emily Rodriguez",
        email: "emily.rodriguez@hospital.com",
        phone: "+1-555-0104",
        address: "321 Dermatology Center, New Haven, CT",
        specialization: "Dermatology",
        experience: 8,
        timings: ["09:30 AM - 12:30 PM", "02:30 PM - 05:30 PM"],
        qualifications: [
            ("MD in Dermatology", "Yale School of Medicine", 2014),
            ("MBBS", "Columbia University College of Physicians", 2012),
        ],
    },
    SampleDoctor {
        name: "Dr. David Thompson",
        email: "david.thompson@hospital.com",
        phone: "+1-555-0105",
        address: "654 Children's Hospital, Boston, MA",
        specialization: "Pediatrics",
        experience: 14,
        timings: ["08:30 AM - 11:30 AM", "01:30 PM - 04:30 PM"],
        qualifications: [
            ("MD in Pediatrics", "Boston University School of Medicine", 2009),
            ("MBBS", "Tufts University School of Medicine", 2007),
        ],
    },
];

/// Credentials for the optional admin account.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub doctors_created: usize,
    pub skipped: usize,
}

pub async fn seed(
    storage: &Arc<dyn ClinicStorage>,
    auth: &AuthService,
    doctors: &DoctorService,
    admin: Option<AdminSeed>,
) -> ServiceResult<SeedReport> {
    let mut report = SeedReport::default();

    for sample in SAMPLE_DOCTORS {
        let new_user = NewUser {
            name: sample.name.to_string(),
            email: sample.email.to_string(),
            password: SAMPLE_DOCTOR_PASSWORD.to_string(),
            phone: Some(sample.phone.to_string()),
            address: Some(sample.address.to_string()),
            ..Default::default()
        };
        let user = ensure_user(storage, auth, new_user, Role::Doctor, &mut report).await?;

        let profile = NewDoctor {
            name: Some(sample.name.to_string()),
            specialization: Some(sample.specialization.to_string()),
            experience: Some(sample.experience),
            timings: Some(sample.timings.iter().map(|t| t.to_string()).collect()),
            qualifications: sample
                .qualifications
                .iter()
                .map(|(degree, college, year)| Qualification {
                    degree: degree.to_string(),
                    college: college.to_string(),
                    year: *year,
                })
                .collect(),
            is_available: Some(true),
            ..Default::default()
        };
        match doctors.create_doctor(&Caller::new(user.id, user.role), profile).await {
            Ok(doctor) => {
                info!("Seeded doctor {} ({}, fee {})", doctor.name, doctor.specialization, doctor.fees);
                report.doctors_created += 1;
            }
            Err(ServiceError::AlreadyExists(_)) => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    if let Some(admin) = admin {
        let new_user = NewUser {
            name: "Administrator".to_string(),
            email: admin.email,
            password: admin.password,
            ..Default::default()
        };
        ensure_user(storage, auth, new_user, Role::Admin, &mut report).await?;
    }

    info!(
        "Seeding finished: {} users and {} doctor profiles created, {} already present",
        report.users_created, report.doctors_created, report.skipped
    );
    Ok(report)
}

async fn ensure_user(
    storage: &Arc<dyn ClinicStorage>,
    auth: &AuthService,
    new_user: NewUser,
    role: Role,
    report: &mut SeedReport,
) -> ServiceResult<User> {
    if let Some(existing) = storage.get_user_by_email(new_user.email.trim()).await? {
        report.skipped += 1;
        return Ok(existing);
    }
    let user = auth.create_user(new_user, role).await?;
    report.users_created += 1;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_lib::SledClinicStorage;
    use clinic_security::{TokenConfig, TokenService};

    #[tokio::test]
    async fn should_seed_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = clinic_lib::open_sled_db(dir.path()).unwrap();
        let storage: Arc<dyn ClinicStorage> = Arc::new(SledClinicStorage::new(db).unwrap());
        let tokens = TokenService::new(&TokenConfig { secret: "seed".into(), ttl_hours: 1 });
        let auth = AuthService::new(storage.clone(), tokens);
        let doctors = DoctorService::new(storage.clone());
        let admin = AdminSeed { email: "admin@clinic.com".into(), password: "admin-pass".into() };

        let first = seed(&storage, &auth, &doctors, Some(admin.clone())).await.unwrap();
        assert_eq!(first.users_created, SAMPLE_DOCTORS.len() + 1);
        assert_eq!(first.doctors_created, SAMPLE_DOCTORS.len());

        let second = seed(&storage, &auth, &doctors, Some(admin)).await.unwrap();
        assert_eq!(second.users_created, 0);
        assert_eq!(second.doctors_created, 0);

        let listed = doctors.list_doctors().await.unwrap();
        assert_eq!(listed.len(), SAMPLE_DOCTORS.len());
        let pediatrics = listed.iter().find(|d| d.doctor.specialization == "Pediatrics").unwrap();
        assert_eq!(pediatrics.doctor.fees, 2000);
    }
}
