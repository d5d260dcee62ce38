// rest_api/src/handlers/auth.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::debug;

use clinic_lib::AuthSession;
use clinic_models::{Login, NewUser};

use super::ApiResult;
use crate::extract::{ApiJson, AuthenticatedCaller};
use crate::AppState;

fn session_body(session: AuthSession) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "token": session.token, "data": session.user }))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let session = state.auth.register(new_user).await?;
    Ok((StatusCode::CREATED, session_body(session)))
}

pub async fn login(State(state): State<AppState>, ApiJson(login): ApiJson<Login>) -> ApiResult {
    let session = state.auth.login(login).await?;
    Ok(session_body(session))
}

pub async fn me(State(state): State<AppState>, AuthenticatedCaller(caller): AuthenticatedCaller) -> ApiResult {
    let profile = state.auth.me(&caller).await?;
    Ok(Json(json!({ "success": true, "data": profile })))
}

/// Tokens are not tracked server side; the client drops its copy.
pub async fn logout() -> Json<serde_json::Value> {
    debug!("Logout acknowledged");
    Json(json!({ "success": true, "message": "User logged out successfully", "data": {} }))
}
