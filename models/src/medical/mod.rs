// models/src/medical/mod.rs
pub mod appointment;
pub mod doctor;
pub mod role;
pub mod user;

pub use appointment::{
    Appointment, AppointmentStatus, AppointmentUpdate, AppointmentView, NewAppointment, VoiceNotification,
};
pub use doctor::{Doctor, DoctorSummary, DoctorUpdate, DoctorView, NewDoctor, NewReview, Qualification, Review};
pub use role::Role;
pub use user::{Login, NewUser, User, UserProfile, UserSummary};
