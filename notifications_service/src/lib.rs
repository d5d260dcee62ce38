// notifications_service/src/lib.rs
//! Outbound notification adapters: text-to-speech synthesis, transactional
//! email, and the directory store the synthesized audio lands in.

pub mod content_store;
pub mod email;
pub mod errors;
pub mod voice;

pub use content_store::{booking_audio_filename, ContentStore};
pub use email::{render_confirmation_html, BrevoEmail, ConfirmationEmail, EmailConfig, EmailSender};
pub use errors::{NotificationError, NotificationResult};
pub use voice::{render_booking_script, BookingMessage, ElevenLabsVoice, VoiceConfig, VoiceSynthesizer};
