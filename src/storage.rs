use crate::controller::validate_inputs;
use crate::workout::Workout;
use dirs_next as dirs;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

const APP_DIR: &str = "workout_mapper";
const DATA_DIR_ENV: &str = "WORKOUT_MAPPER_DATA_DIR";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Serde(serde_json::Error),
    InvalidKey(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage access failed: {e}"),
            StorageError::Serde(e) => write!(f, "stored data is not valid: {e}"),
            StorageError::InvalidKey(key) => write!(f, "invalid storage key: {key:?}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serde(e) => Some(e),
            StorageError::InvalidKey(_) => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serde(e)
    }
}

/// String key-value storage surviving across sessions.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Volatile store used when no data directory is available, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store keeping one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.root)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Determine the directory holding persisted workouts.
///
/// The `WORKOUT_MAPPER_DATA_DIR` environment variable takes precedence over
/// the directory configured in the settings, which in turn takes precedence
/// over the platform config directory.
pub fn resolve_data_dir(settings_dir: Option<&str>) -> Option<PathBuf> {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| settings_dir.map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|p| p.join(APP_DIR)))
}

/// Serialize the whole collection as one JSON array under `key`.
pub fn save_workouts<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &str,
    workouts: &[Workout],
) -> Result<(), StorageError> {
    let data = serde_json::to_string(workouts)?;
    store.set(key, &data)
}

/// Read the collection stored under `key`.
///
/// A missing key, a blank value or a JSON `null` all yield an empty
/// collection. Records come back with their derived metrics recomputed;
/// records whose inputs would not pass entry validation are skipped.
pub fn load_workouts<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Vec<Workout>, StorageError> {
    let Some(data) = store.get(key)? else {
        return Ok(Vec::new());
    };
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Option<Vec<Workout>> = serde_json::from_str(&data)?;
    Ok(parsed
        .unwrap_or_default()
        .into_iter()
        .filter(|w| {
            match validate_inputs(w.kind(), w.distance_km(), w.duration_min(), w.extra()) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Skipping stored workout {}: {e}", w.id());
                    false
                }
            }
        })
        .map(Workout::normalized)
        .collect())
}
