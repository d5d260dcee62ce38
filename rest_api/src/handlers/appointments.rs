// rest_api/src/handlers/appointments.rs

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use clinic_models::{AppointmentUpdate, NewAppointment};

use super::ApiResult;
use crate::extract::{ApiJson, AuthenticatedCaller};
use crate::AppState;

pub async fn list_appointments(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> ApiResult {
    let appointments = state.booking.list_appointments(&caller).await?;
    Ok(Json(json!({ "success": true, "count": appointments.len(), "data": appointments })))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> ApiResult {
    let appointment = state.booking.get_appointment(&caller, &id).await?;
    Ok(Json(json!({ "success": true, "data": appointment })))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiJson(request): ApiJson<NewAppointment>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let appointment = state.booking.create_appointment(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": appointment }))))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<AppointmentUpdate>,
) -> ApiResult {
    let appointment = state.booking.update_appointment(&caller, &id, update).await?;
    Ok(Json(json!({ "success": true, "data": appointment })))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> ApiResult {
    state.booking.delete_appointment(&caller, &id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}

pub async fn send_voice(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> ApiResult {
    let dispatch = state.booking.dispatch_voice_notification(&caller, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Voice notification sent successfully",
        "data": dispatch,
    })))
}

pub async fn test_voice(State(state): State<AppState>) -> ApiResult {
    let check = state.booking.test_voice().await?;
    info!("Voice service reachable, {} voices available", check.voices);
    Ok(Json(json!({
        "success": true,
        "message": "Voice service test successful",
        "data": check,
    })))
}
