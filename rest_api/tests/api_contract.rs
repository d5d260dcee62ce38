// rest_api/tests/api_contract.rs

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use clinic_lib::create_storage;
use clinic_models::{NewDoctor, NewUser, Role};
use clinic_security::{Caller, TokenConfig, TokenService};
use notifications_service::{
    BookingMessage, ConfirmationEmail, EmailSender, NotificationError, NotificationResult, VoiceSynthesizer,
};
use rest_api::{build_router, AppState};

struct OfflineVoice;

#[async_trait]
impl VoiceSynthesizer for OfflineVoice {
    async fn create_booking_notification(&self, _: &Uuid, _: &BookingMessage) -> NotificationResult<String> {
        Err(NotificationError::ServiceUnavailable("Eleven Labs API key not configured".into()))
    }

    async fn check_connection(&self) -> NotificationResult<usize> {
        Ok(3)
    }
}

struct NullEmail;

#[async_trait]
impl EmailSender for NullEmail {
    async fn send_confirmation(&self, _: &ConfirmationEmail) -> NotificationResult<String> {
        Ok("<null@test>".into())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = create_storage(&dir.path().join("db")).unwrap();
        let tokens = TokenService::new(&TokenConfig { secret: "contract-tests".into(), ttl_hours: 1 });
        let state = AppState::new(
            storage,
            tokens,
            Arc::new(OfflineVoice),
            Arc::new(NullEmail),
            dir.path().join("uploads"),
        );
        let router = build_router(state.clone(), "http://localhost:3000").unwrap();
        TestApp { router, state, _dir: dir }
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let body = json!({ "name": "Asha Rao", "email": email, "password": "secret1" });
        let (status, value) = self.call("POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", value);
        value["token"].as_str().unwrap().to_string()
    }

    async fn doctor(&self) -> String {
        let new_user = NewUser {
            name: "Dr. Meera Iyer".into(),
            email: "meera@hospital.com".into(),
            password: "password123".into(),
            ..Default::default()
        };
        let user = self.state.auth.create_user(new_user, Role::Doctor).await.unwrap();
        let profile = NewDoctor { specialization: Some("Cardiology".into()), ..Default::default() };
        let doctor = self.state.doctors.create_doctor(&Caller::new(user.id, Role::Doctor), profile).await.unwrap();
        doctor.id.to_string()
    }
}

#[tokio::test]
async fn register_returns_token_and_forces_patient_role() {
    let app = TestApp::new();
    let body = json!({ "name": "Asha", "email": "asha@example.com", "password": "secret1", "role": "admin" });
    let (status, value) = app.call("POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["role"], "patient");
    assert!(value["data"].get("passwordHash").is_none());

    let token = value["token"].as_str().unwrap();
    let (status, me) = app.call("GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "asha@example.com");
}

#[tokio::test]
async fn short_password_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new();
    let body = json!({ "name": "Asha", "email": "asha@example.com", "password": "short" });
    let (status, value) = app.call("POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["success"], false);

    let login = json!({ "email": "asha@example.com", "password": "short" });
    let (status, _) = app.call("POST", "/api/auth/login", None, Some(login)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn slot_is_released_by_cancellation() {
    let app = TestApp::new();
    let doctor = app.doctor().await;
    let token = app.register("asha@example.com").await;
    let booking = json!({ "doctor": doctor, "date": "2025-06-01", "time": "10:00 AM", "reason": "Checkup" });

    let (status, created) = app.call("POST", "/api/appointments", Some(&token), Some(booking.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["data"]["status"], "pending");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, conflict) = app.call("POST", "/api/appointments", Some(&token), Some(booking.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(conflict["message"], "This appointment slot is already booked");

    let uri = format!("/api/appointments/{}", id);
    let (status, cancelled) = app.call("PUT", &uri, Some(&token), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "cancelled");

    let (status, _) = app.call("POST", "/api/appointments", Some(&token), Some(booking)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = app.call("GET", "/api/appointments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 2);
}

#[tokio::test]
async fn other_patients_cannot_touch_an_appointment() {
    let app = TestApp::new();
    let doctor = app.doctor().await;
    let owner = app.register("owner@example.com").await;
    let stranger = app.register("stranger@example.com").await;
    let booking = json!({ "doctor": doctor, "date": "2025-06-02", "time": "11:00 AM", "reason": "Fever" });
    let (_, created) = app.call("POST", "/api/appointments", Some(&owner), Some(booking)).await;
    let uri = format!("/api/appointments/{}", created["data"]["id"].as_str().unwrap());

    let (status, _) = app.call("GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("DELETE", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.call("GET", "/api/appointments", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 0);

    let (status, deleted) = app.call("DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], json!({}));
}

#[tokio::test]
async fn failed_voice_synthesis_answers_500_and_records_nothing() {
    let app = TestApp::new();
    let doctor = app.doctor().await;
    let token = app.register("asha@example.com").await;
    let booking = json!({ "doctor": doctor, "date": "2025-06-03", "time": "09:30 AM", "reason": "Consult" });
    let (_, created) = app.call("POST", "/api/appointments", Some(&token), Some(booking)).await;
    let uri = format!("/api/appointments/{}", created["data"]["id"].as_str().unwrap());

    let (status, value) = app.call("POST", &format!("{}/send-voice", uri), Some(&token), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["message"], "Failed to generate voice notification");
    assert!(value["error"].as_str().unwrap().contains("not configured"));

    let (_, fetched) = app.call("GET", &uri, Some(&token), None).await;
    assert!(fetched["data"]["voiceNotification"].is_null());
}

#[tokio::test]
async fn requests_without_token_or_with_bad_json_are_rejected() {
    let app = TestApp::new();
    let (status, value) = app.call("GET", "/api/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["success"], false);

    let (status, _) = app.call("GET", "/api/appointments", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_routes_answer_without_token() {
    let app = TestApp::new();
    app.doctor().await;

    let (status, doctors) = app.call("GET", "/api/doctors", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doctors["count"], 1);
    assert_eq!(doctors["data"][0]["fees"], 3000);

    let (status, check) = app.call("GET", "/api/appointments/test-voice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["data"]["apiConnected"], true);

    let (status, _) = app.call("GET", "/api/doctors/not-an-id", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
