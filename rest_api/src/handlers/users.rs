// rest_api/src/handlers/users.rs

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use super::ApiResult;
use crate::extract::AuthenticatedCaller;
use crate::AppState;

pub async fn list_users(State(state): State<AppState>, AuthenticatedCaller(caller): AuthenticatedCaller) -> ApiResult {
    let users = state.auth.list_users(&caller).await?;
    Ok(Json(json!({ "success": true, "count": users.len(), "data": users })))
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> ApiResult {
    let user = state.auth.get_user(&caller, &id).await?;
    Ok(Json(json!({ "success": true, "data": user })))
}
