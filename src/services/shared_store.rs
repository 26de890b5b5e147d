//! Key-value store shared with the widget surface

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

/// Key holding the `HH:MM:SS` value
pub const TIMER_VALUE_KEY: &str = "timerValue";
/// Key holding `running`, `paused` or `stopped`
pub const TIMER_STATE_KEY: &str = "timerState";
/// Key holding `stopwatch` or `timer`
pub const TIMER_MODE_KEY: &str = "timerMode";

/// String key-value store readable by other processes
pub trait SharedStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<(), String>;

    /// Read a value; `None` when missing or when the store is unavailable
    fn get(&self, key: &str) -> Option<String>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut values = self.values.lock()
            .map_err(|e| format!("Failed to lock memory store: {}", e))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }
}

/// Store kept as a single JSON object in a file.
///
/// Every `get` re-reads the file so values written by another process are
/// visible; writes replace the file through a temporary sibling.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse {}: {}", self.path.display(), e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(format!("Failed to read {}: {}", self.path.display(), e)),
        }
    }
}

impl SharedStore for JsonFileStore {
    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock()
            .map_err(|e| format!("Failed to lock shared store: {}", e))?;

        // An unreadable file is replaced rather than blocking every later write
        let mut values = self.read_all().unwrap_or_else(|e| {
            warn!("Discarding shared store contents: {}", e);
            HashMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| format!("Failed to serialize shared store: {}", e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| format!("Failed to replace {}: {}", self.path.display(), e))?;

        debug!("Shared store {} = {}", key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                debug!("Shared store unavailable: {}", e);
                None
            }
        }
    }
}
