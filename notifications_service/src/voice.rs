// notifications_service/src/voice.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::content_store::{booking_audio_filename, ContentStore};
use crate::errors::{NotificationError, NotificationResult};

pub const DEFAULT_VOICE_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// `None` keeps the adapter in the fail-closed state.
    pub api_key: Option<String>,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            api_key: None,
            base_url: DEFAULT_VOICE_BASE_URL.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// What the confirmation script talks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingMessage {
    pub recipient_name: String,
    pub counterpart_name: String,
    /// Already human readable, e.g. `June 1, 2025`.
    pub date: String,
    pub time: String,
    pub reason: String,
}

pub fn render_booking_script(message: &BookingMessage) -> String {
    format!(
        "Hello {}, your appointment with {} has been confirmed. \
         Your appointment is scheduled for {} at {}. \
         Reason for visit: {}. \
         Please arrive 10 minutes before your scheduled time. Thank you.",
        message.recipient_name, message.counterpart_name, message.date, message.time, message.reason
    )
}

/// Text-to-speech seam used by the booking service.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    /// Synthesizes the confirmation for an appointment, stores the audio and
    /// returns its relative locator.
    async fn create_booking_notification(
        &self,
        appointment_id: &Uuid,
        message: &BookingMessage,
    ) -> NotificationResult<String>;

    /// Verifies credential and connectivity; returns the number of voices
    /// the account can use.
    async fn check_connection(&self) -> NotificationResult<usize>;
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<serde_json::Value>,
}

/// ElevenLabs-compatible synthesis client.
#[derive(Debug, Clone)]
pub struct ElevenLabsVoice {
    config: VoiceConfig,
    client: reqwest::Client,
    store: ContentStore,
}

impl ElevenLabsVoice {
    pub fn new(config: VoiceConfig, store: ContentStore) -> NotificationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::ServiceUnavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(ElevenLabsVoice { config, client, store })
    }

    fn api_key(&self) -> NotificationResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| NotificationError::ServiceUnavailable("Eleven Labs API key not configured".to_string()))
    }

    async fn synthesize(&self, text: &str) -> NotificationResult<Vec<u8>> {
        let api_key = self.api_key()?;
        let url = format!("{}/text-to-speech/{}", self.config.base_url.trim_end_matches('/'), self.config.voice_id);
        let body = SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings { stability: 0.5, similarity_boost: 0.5 },
        };
        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::from_transport("synthesis", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotificationError::UpstreamError(format!(
                "synthesis API returned {}: {}",
                status, detail
            )));
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| NotificationError::from_transport("synthesis", e))?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsVoice {
    async fn create_booking_notification(
        &self,
        appointment_id: &Uuid,
        message: &BookingMessage,
    ) -> NotificationResult<String> {
        let script = render_booking_script(message);
        let audio = self.synthesize(&script).await?;
        debug!("Synthesized {} bytes for appointment {}", audio.len(), appointment_id);

        let filename = booking_audio_filename(appointment_id, Utc::now());
        let locator = self.store.save_audio(&filename, &audio).await?;
        info!("Voice notification for appointment {} stored at {}", appointment_id, locator);
        Ok(locator)
    }

    async fn check_connection(&self) -> NotificationResult<usize> {
        let api_key = self.api_key()?;
        let url = format!("{}/voices", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("xi-api-key", api_key)
            .send()
            .await
            .map_err(|e| NotificationError::from_transport("voice listing", e))?;
        let status = response.status();
        if !status.is_success() {
            warn!("Voice API connectivity check answered {}", status);
            return Err(NotificationError::UpstreamError(format!("voice API returned {}", status)));
        }
        let voices: VoicesResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::UpstreamError(format!("unexpected voice listing: {}", e)))?;
        Ok(voices.voices.len())
    }
}
