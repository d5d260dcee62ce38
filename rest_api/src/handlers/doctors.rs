// rest_api/src/handlers/doctors.rs

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use clinic_models::{DoctorUpdate, NewDoctor, NewReview};

use super::ApiResult;
use crate::extract::{ApiJson, AuthenticatedCaller};
use crate::AppState;

pub async fn list_doctors(State(state): State<AppState>) -> ApiResult {
    let doctors = state.doctors.list_doctors().await?;
    Ok(Json(json!({ "success": true, "count": doctors.len(), "data": doctors })))
}

pub async fn get_doctor(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let doctor = state.doctors.get_doctor(&id).await?;
    Ok(Json(json!({ "success": true, "data": doctor })))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    ApiJson(new_doctor): ApiJson<NewDoctor>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let doctor = state.doctors.create_doctor(&caller, new_doctor).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": doctor }))))
}

pub async fn update_doctor(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<DoctorUpdate>,
) -> ApiResult {
    let doctor = state.doctors.update_doctor(&caller, &id, update).await?;
    Ok(Json(json!({ "success": true, "data": doctor })))
}

pub async fn add_review(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
    ApiJson(review): ApiJson<NewReview>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let doctor = state.doctors.add_review(&caller, &id, review).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": doctor }))))
}
