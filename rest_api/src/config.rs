// rest_api/src/config.rs

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use tracing::warn;

use clinic_lib::SchedulerConfig;
use clinic_security::TokenConfig;
use notifications_service::email::{DEFAULT_EMAIL_BASE_URL, DEFAULT_SENDER_EMAIL, DEFAULT_SENDER_NAME};
use notifications_service::voice::{DEFAULT_MODEL_ID, DEFAULT_VOICE_BASE_URL, DEFAULT_VOICE_ID};
use notifications_service::{EmailConfig, VoiceConfig};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DATABASE_PATH: &str = "data/clinic_db";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEV_JWT_SECRET: &str = "clinic-dev-secret-change-me";

/// Settings of the server process, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub frontend_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
    pub eleven_labs_api_key: Option<String>,
    pub eleven_labs_base_url: String,
    pub eleven_labs_voice_id: String,
    pub eleven_labs_model_id: String,
    pub brevo_api_key: Option<String>,
    pub brevo_base_url: String,
    pub brevo_sender_name: String,
    pub brevo_sender_email: String,
    pub notification_timeout_secs: u64,
    pub scheduler_utc_offset_minutes: i32,
    pub scheduler_daily_hour: u32,
    pub scheduler_enabled: bool,
}

/// Loads `.env` if present, then layers environment variables over the
/// defaults.
///
/// `JWT_SECRET` must be set to something other than the development
/// placeholder unless `dev_mode` is on.
pub fn load_app_config(dev_mode: bool) -> Result<AppConfig> {
    dotenv::dotenv().ok();
    let mut config = build_app_config(Environment::default().try_parsing(true))?;
    config.check_signing_secret(dev_mode)?;
    Ok(config)
}

pub(crate) fn build_app_config(environment: Environment) -> Result<AppConfig> {
    let settings = Config::builder()
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("host", DEFAULT_HOST)?
        .set_default("database_path", DEFAULT_DATABASE_PATH)?
        .set_default("uploads_dir", DEFAULT_UPLOADS_DIR)?
        .set_default("frontend_url", DEFAULT_FRONTEND_URL)?
        .set_default("jwt_secret", "")?
        .set_default("token_ttl_hours", clinic_security::DEFAULT_TOKEN_TTL_HOURS as i64)?
        .set_default("eleven_labs_base_url", DEFAULT_VOICE_BASE_URL)?
        .set_default("eleven_labs_voice_id", DEFAULT_VOICE_ID)?
        .set_default("eleven_labs_model_id", DEFAULT_MODEL_ID)?
        .set_default("brevo_base_url", DEFAULT_EMAIL_BASE_URL)?
        .set_default("brevo_sender_name", DEFAULT_SENDER_NAME)?
        .set_default("brevo_sender_email", DEFAULT_SENDER_EMAIL)?
        .set_default("notification_timeout_secs", 20_i64)?
        .set_default("scheduler_utc_offset_minutes", clinic_lib::scheduler::DEFAULT_UTC_OFFSET_MINUTES as i64)?
        .set_default("scheduler_daily_hour", clinic_lib::scheduler::DEFAULT_DAILY_HOUR as i64)?
        .set_default("scheduler_enabled", true)?
        .add_source(environment)
        .build()
        .context("Failed to read configuration from the environment")?;

    let mut config: AppConfig = settings
        .try_deserialize()
        .context("Invalid configuration value")?;
    config.eleven_labs_api_key = non_empty(config.eleven_labs_api_key);
    config.brevo_api_key = non_empty(config.brevo_api_key);
    config.jwt_secret = config.jwt_secret.trim().to_string();
    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Rejects a missing or placeholder signing secret. In dev mode the
    /// placeholder is substituted instead.
    pub fn check_signing_secret(&mut self, dev_mode: bool) -> Result<()> {
        if !self.jwt_secret.is_empty() && self.jwt_secret != DEV_JWT_SECRET {
            return Ok(());
        }
        if !dev_mode {
            return Err(anyhow!("JWT_SECRET is missing or set to the development placeholder"))
                .context("Refusing to sign tokens with a published secret; set JWT_SECRET or pass --dev");
        }
        warn!("JWT_SECRET is not set; dev mode signs tokens with the development secret");
        self.jwt_secret = DEV_JWT_SECRET.to_string();
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs.max(1))
    }

    pub fn voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            api_key: self.eleven_labs_api_key.clone(),
            base_url: self.eleven_labs_base_url.clone(),
            voice_id: self.eleven_labs_voice_id.clone(),
            model_id: self.eleven_labs_model_id.clone(),
            timeout: self.notification_timeout(),
        }
    }

    pub fn email_config(&self) -> EmailConfig {
        EmailConfig {
            api_key: self.brevo_api_key.clone(),
            base_url: self.brevo_base_url.clone(),
            sender_name: self.brevo_sender_name.clone(),
            sender_email: self.brevo_sender_email.clone(),
            timeout: self.notification_timeout(),
        }
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig { secret: self.jwt_secret.clone(), ttl_hours: self.token_ttl_hours }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            utc_offset_minutes: self.scheduler_utc_offset_minutes,
            daily_hour: self.scheduler_daily_hour,
        }
    }
}
