use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use strum_macros::Display;

/// Key under which the pitch calibration offset is persisted.
pub const KEY_PITCH_CALIBRATION_OFFSET: &str = "pitch_calibration_offset";
/// Key under which the estimated latitude is persisted.
pub const KEY_EST_LAT: &str = "estimated_latitude";
/// Key under which the estimated longitude is persisted.
pub const KEY_EST_LON: &str = "estimated_longitude";

#[derive(Debug, Display)]
pub enum StoreError {
    Io(std::io::Error),
    Malformed(serde_json::Error),
    Poisoned,
    /// NaN and infinities have no JSON representation and are never stored.
    NonFinite(String),
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self { Self::Io(value) }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self { Self::Malformed(value) }
}

/// Persistent storage for named scalar settings.
///
/// The calibration offset is the only value the core writes; the estimated
/// position is read from here when building the initial [`crate::config::NavSettings`].
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value for `key`, `None` if it was never written.
    fn get_f64(&self, key: &str) -> Option<f64>;
    /// Stores `value` under `key`, overwriting previous values.
    ///
    /// # Errors
    /// [`StoreError::NonFinite`] for NaN or infinite values, which leave the store unchanged.
    fn set_f64(&self, key: &str, value: f64) -> Result<(), StoreError>;
}

/// A volatile [`SettingsStore`], used when no settings file is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, f64>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl SettingsStore for MemoryStore {
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.lock().ok().and_then(|values| values.get(key).copied())
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<(), StoreError> {
        check_finite(key, value)?;
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// A [`SettingsStore`] backed by a flat JSON object on disk.
///
/// The file is read once on open and rewritten completely on every `set_f64`.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, f64>>,
}

impl JsonFileStore {
    /// Opens (or lazily creates) the settings file at `path`.
    ///
    /// A missing file yields an empty store; an unreadable or malformed file is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read(&path)?;
            serde_json::from_slice::<HashMap<String, f64>>(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl SettingsStore for JsonFileStore {
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.lock().ok().and_then(|values| values.get(key).copied())
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<(), StoreError> {
        check_finite(key, value)?;
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&updated)?)?;
        // only values that reached the disk become visible
        *values = updated;
        Ok(())
    }
}

fn check_finite(key: &str, value: f64) -> Result<(), StoreError> {
    if value.is_finite() { Ok(()) } else { Err(StoreError::NonFinite(key.to_string())) }
}
