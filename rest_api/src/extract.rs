// rest_api/src/extract.rs
//! Request extractors that answer with the JSON error envelope.

use axum::async_trait;
use axum::extract::{FromRef, FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use clinic_security::{Caller, TokenService};

use crate::errors::RestApiError;

/// `axum::Json` whose rejections become 400 envelopes.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

/// The caller identified by the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        let header = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        Ok(AuthenticatedCaller(tokens.caller_from_header(header)?))
    }
}
