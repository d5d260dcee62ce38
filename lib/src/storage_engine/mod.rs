// lib/src/storage_engine/mod.rs

pub mod errors;
pub mod sled_storage;
pub mod storage_engine;

pub use errors::{StorageError, StorageResult};
pub use sled_storage::{open_sled_db, SledClinicStorage};
pub use storage_engine::{AppointmentStorageEngine, ClinicStorage, DoctorStorageEngine, UserStorageEngine};

use std::path::Path;
use std::sync::Arc;

/// Opens the sled-backed store at `path` behind the storage trait object
/// the services consume.
pub fn create_storage(path: &Path) -> StorageResult<Arc<dyn ClinicStorage>> {
    Ok(Arc::new(SledClinicStorage::open(path)?))
}
