// rest_api/src/handlers/mod.rs

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod users;

use axum::Json;
use serde_json::Value;

use crate::errors::RestApiError;

pub type ApiResult<T = Json<Value>> = Result<T, RestApiError>;

pub async fn liveness() -> &'static str {
    "Doctor Appointment API is running"
}
