// notifications_service/src/content_store.rs
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{NotificationError, NotificationResult};

/// URL prefix under which the store root is served.
pub const PUBLIC_PREFIX: &str = "/uploads";
pub const AUDIO_DIR: &str = "audio";

/// `booking_<appointmentId>_<epochMillis>.mp3`
pub fn booking_audio_filename(appointment_id: &Uuid, at: DateTime<Utc>) -> String {
    format!("booking_{}_{}.mp3", appointment_id, at.timestamp_millis())
}

/// Directory-backed store for synthesized audio. Assets are addressed by
/// relative locators such as `/uploads/audio/booking_<id>_<ms>.mp3`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ContentStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an audio asset and returns its locator.
    pub async fn save_audio(&self, filename: &str, bytes: &[u8]) -> NotificationResult<String> {
        let name = plain_file_name(filename)
            .ok_or_else(|| NotificationError::ContentStore(format!("refusing file name '{}'", filename)))?;
        let dir = self.root.join(AUDIO_DIR);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| NotificationError::ContentStore(format!("Failed to create {:?}: {}", dir, e)))?;
        let path = dir.join(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| NotificationError::ContentStore(format!("Failed to write {:?}: {}", path, e)))?;
        debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, AUDIO_DIR, name))
    }

    /// Reads the asset behind a locator, `None` when it does not exist or
    /// the locator does not point inside the audio directory.
    pub async fn read(&self, locator: &str) -> Option<Vec<u8>> {
        let path = self.resolve(locator)?;
        match fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Audio asset {:?} not readable: {}", path, e);
                None
            }
        }
    }

    fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let prefix = format!("{}/{}/", PUBLIC_PREFIX, AUDIO_DIR);
        let name = locator.strip_prefix(&prefix)?;
        let name = plain_file_name(name)?;
        Some(self.root.join(AUDIO_DIR).join(name))
    }
}

/// Accepts only a single normal path component.
fn plain_file_name(name: &str) -> Option<&str> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return None;
    }
    Some(name)
}
