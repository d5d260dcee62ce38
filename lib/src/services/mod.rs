// lib/src/services/mod.rs

pub mod auth;
pub mod booking;
pub mod doctors;

pub use auth::{AuthService, AuthSession};
pub use booking::{BookingService, VoiceCheck, VoiceDispatch};
pub use doctors::DoctorService;

use clinic_models::User;
use clinic_security::Caller;

use crate::errors::{ServiceError, ServiceResult};
use crate::storage_engine::{ClinicStorage, UserStorageEngine};

/// Resolves a verified caller to the stored user. Authorization decisions
/// use the stored role, not the one carried in the token.
pub(crate) async fn resolve_caller(storage: &dyn ClinicStorage, caller: &Caller) -> ServiceResult<User> {
    storage
        .get_user(&caller.user_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidIdentity("Invalid user ID. Please login again.".to_string()))
}
