// rest_api/src/lib.rs
//! HTTP surface of the clinic backend.

pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod seed;

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result as AnyhowResult};
use axum::extract::FromRef;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clinic_lib::{create_storage, AuthService, BookingService, ClinicStorage, DoctorService, ReminderScheduler};
use clinic_security::TokenService;
use notifications_service::{BrevoEmail, ContentStore, ElevenLabsVoice, EmailSender, VoiceSynthesizer};

pub use crate::config::{load_app_config, AppConfig};
pub use crate::errors::RestApiError;

use crate::handlers::{appointments, auth, doctors, users};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub doctors: DoctorService,
    pub booking: BookingService,
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn ClinicStorage>,
        tokens: TokenService,
        voice: Arc<dyn VoiceSynthesizer>,
        email: Arc<dyn EmailSender>,
        uploads_dir: PathBuf,
    ) -> Self {
        AppState {
            auth: AuthService::new(storage.clone(), tokens),
            doctors: DoctorService::new(storage.clone()),
            booking: BookingService::new(storage, voice, email),
            uploads_dir,
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.tokens().clone()
    }
}

/// Opens storage and wires the live notification adapters.
pub fn build_state(config: &AppConfig) -> AnyhowResult<(AppState, Arc<dyn ClinicStorage>)> {
    let storage = create_storage(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path.display()))?;
    let store = ContentStore::new(&config.uploads_dir);
    let voice = ElevenLabsVoice::new(config.voice_config(), store.clone()).context("Failed to set up voice adapter")?;
    let email = BrevoEmail::new(config.email_config(), store).context("Failed to set up email adapter")?;
    if config.eleven_labs_api_key.is_none() || config.brevo_api_key.is_none() {
        warn!("Notification credentials missing; send-voice requests will fail until they are configured");
    }
    let state = AppState::new(
        storage.clone(),
        TokenService::new(&config.token_config()),
        Arc::new(voice),
        Arc::new(email),
        config.uploads_dir.clone(),
    );
    Ok((state, storage))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    RestApiError::Panic(detail).into_response()
}

pub fn build_router(state: AppState, frontend_url: &str) -> AnyhowResult<Router> {
    let origin = HeaderValue::from_str(frontend_url)
        .with_context(|| format!("FRONTEND_URL is not a valid origin: {}", frontend_url))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true);

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/doctors", get(doctors::list_doctors).post(doctors::create_doctor))
        .route("/doctors/:id", get(doctors::get_doctor).put(doctors::update_doctor))
        .route("/doctors/:id/reviews", post(doctors::add_review))
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/appointments/test-voice", get(appointments::test_voice))
        .route(
            "/appointments/:id",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route("/appointments/:id/send-voice", post(appointments::send_voice));

    let uploads = ServeDir::new(&state.uploads_dir);
    Ok(Router::new()
        .route("/", get(handlers::liveness))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// Runs the server until Ctrl-C.
pub async fn start_server(config: AppConfig) -> AnyhowResult<()> {
    let (state, storage) = build_state(&config)?;
    let scheduler = if config.scheduler_enabled {
        let scheduler = Arc::new(
            ReminderScheduler::new(storage.clone(), config.scheduler_config())
                .context("Invalid reminder scheduler configuration")?,
        );
        scheduler.start();
        Some(scheduler)
    } else {
        info!("Reminder scheduler disabled");
        None
    };

    let app = build_router(state, &config.frontend_url)?;
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    info!("Clinic API listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await
        .context("REST API server failed to start or run")?;

    if let Some(scheduler) = scheduler {
        scheduler.stop();
    }
    info!("Clinic API stopped");
    Ok(())
}
