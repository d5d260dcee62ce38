// notifications_service/src/email.rs
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content_store::ContentStore;
use crate::errors::{NotificationError, NotificationResult};

pub const DEFAULT_EMAIL_BASE_URL: &str = "https://api.brevo.com/v3";
pub const DEFAULT_SENDER_NAME: &str = "Doctor Appointment System";
pub const DEFAULT_SENDER_EMAIL: &str = "noreply@doctorappointment.com";
pub const AUDIO_ATTACHMENT_NAME: &str = "appointment_voice.mp3";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub sender_name: String,
    pub sender_email: String,
    pub timeout: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            api_key: None,
            base_url: DEFAULT_EMAIL_BASE_URL.to_string(),
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            sender_email: DEFAULT_SENDER_EMAIL.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Content of an appointment confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub doctor_name: String,
    /// Already human readable, e.g. `Sunday, June 1, 2025`.
    pub date: String,
    pub time: String,
    pub reason: String,
    /// Relative locator of the synthesized audio, if any.
    pub audio_locator: Option<String>,
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_confirmation_html(email: &ConfirmationEmail) -> String {
    let audio_section = match &email.audio_locator {
        Some(locator) => format!(
            r#"<div style="background-color:#e8f5e8;padding:15px;border-radius:5px;margin:20px 0;">
      <p><strong>Voice Message:</strong> A voice recording of your appointment details is attached to this email.</p>
      <audio controls src="{}"></audio>
    </div>"#,
            escape_html(locator)
        ),
        None => String::new(),
    };
    format!(
        r#"<html>
  <body style="font-family:Arial,sans-serif;line-height:1.6;color:#333;">
    <h2 style="color:#2c5aa0;">Appointment Confirmation</h2>
    <p>Dear {name},</p>
    <p>Your appointment has been successfully booked.</p>
    <div style="background-color:#f8f9fa;padding:20px;border-radius:5px;margin:20px 0;">
      <h3>Appointment Details</h3>
      <p><strong>Doctor:</strong> {doctor}</p>
      <p><strong>Date:</strong> {date}</p>
      <p><strong>Time:</strong> {time}</p>
      <p><strong>Reason:</strong> {reason}</p>
    </div>
    {audio}
    <p>Please arrive 10 minutes before your scheduled time.</p>
    <p>If you need to reschedule or cancel, please contact us as soon as possible.</p>
    <p>Best regards,<br>Doctor Appointment System</p>
  </body>
</html>"#,
        name = escape_html(&email.recipient_name),
        doctor = escape_html(&email.doctor_name),
        date = escape_html(&email.date),
        time = escape_html(&email.time),
        reason = escape_html(&email.reason),
        audio = audio_section,
    )
}

/// Transactional email seam used by the booking service.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends the confirmation and returns the provider's message id. The
    /// audio behind `audio_locator` is attached when it can be read.
    async fn send_confirmation(&self, email: &ConfirmationEmail) -> NotificationResult<String>;
}

#[derive(Debug, Serialize)]
pub(crate) struct Mailbox {
    pub(crate) name: String,
    pub(crate) email: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Attachment {
    pub(crate) name: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmailPayload {
    pub(crate) sender: Mailbox,
    pub(crate) to: Vec<Mailbox>,
    pub(crate) subject: String,
    pub(crate) html_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) attachment: Option<Vec<Attachment>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

/// Brevo-compatible transactional email client.
#[derive(Debug, Clone)]
pub struct BrevoEmail {
    config: EmailConfig,
    client: reqwest::Client,
    store: ContentStore,
}

impl BrevoEmail {
    pub fn new(config: EmailConfig, store: ContentStore) -> NotificationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::ServiceUnavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(BrevoEmail { config, client, store })
    }

    pub(crate) fn build_payload(&self, email: &ConfirmationEmail, audio: Option<&[u8]>) -> EmailPayload {
        EmailPayload {
            sender: Mailbox { name: self.config.sender_name.clone(), email: self.config.sender_email.clone() },
            to: vec![Mailbox { name: email.recipient_name.clone(), email: email.recipient_email.clone() }],
            subject: email.subject.clone(),
            html_content: render_confirmation_html(email),
            attachment: audio.map(|bytes| {
                vec![Attachment { name: AUDIO_ATTACHMENT_NAME.to_string(), content: STANDARD.encode(bytes) }]
            }),
        }
    }
}

#[async_trait]
impl EmailSender for BrevoEmail {
    async fn send_confirmation(&self, email: &ConfirmationEmail) -> NotificationResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| NotificationError::ServiceUnavailable("Brevo API key not configured".to_string()))?;

        let url = format!("{}/smtp/email", self.config.base_url.trim_end_matches('/'));
        let audio = match &email.audio_locator {
            Some(locator) => self.store.read(locator).await,
            None => None,
        };
        let payload = self.build_payload(email, audio.as_deref());
        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::from_transport("email", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Email API rejected message to {}: {}", email.recipient_email, status);
            return Err(NotificationError::UpstreamError(format!("email API returned {}: {}", status, detail)));
        }
        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::UpstreamError(format!("unexpected email response: {}", e)))?;
        let message_id = body.message_id.unwrap_or_default();
        info!("Confirmation email sent to {} ({})", email.recipient_email, message_id);
        Ok(message_id)
    }
}
