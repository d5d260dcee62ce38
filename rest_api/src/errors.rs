// rest_api/src/errors.rs

use std::error::Error as _;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use clinic_lib::ServiceError;
use clinic_security::AuthError;

/// Every failure a handler can answer with.
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Not authorized to access this route")]
    Unauthorized(#[source] AuthError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Server Error")]
    Panic(String),
}

impl From<AuthError> for RestApiError {
    fn from(err: AuthError) -> Self {
        RestApiError::Unauthorized(err)
    }
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidBody(rejection.body_text())
    }
}

impl RestApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestApiError::Service(err) => match err {
                ServiceError::Validation(_)
                | ServiceError::InvalidIdentity(_)
                | ServiceError::SlotTaken
                | ServiceError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
                ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::NotificationFailed { .. } | ServiceError::Storage(_) | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            RestApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RestApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RestApiError::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The user-facing message, plus the detail carried in `error`.
    fn parts(&self) -> (String, Option<String>) {
        match self {
            RestApiError::Service(ServiceError::NotificationFailed { message, source }) => {
                (message.clone(), Some(source.to_string()))
            }
            RestApiError::Service(err @ (ServiceError::Storage(_) | ServiceError::Internal(_))) => {
                ("Server Error".to_string(), Some(err.to_string()))
            }
            RestApiError::Service(err) => (err.to_string(), None),
            RestApiError::Unauthorized(err) => (self.to_string(), Some(err.to_string())),
            RestApiError::InvalidBody(detail) => ("Invalid request body".to_string(), Some(detail.clone())),
            RestApiError::Panic(detail) => (self.to_string(), Some(detail.clone())),
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} ({:?})", self, self.source().map(|s| s.to_string()));
        }
        let (message, detail) = self.parts();
        let body = match detail {
            Some(detail) => json!({ "success": false, "message": message, "error": detail }),
            None => json!({ "success": false, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}
