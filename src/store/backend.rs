use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::errors::{SparkError, SparkResult};

/// Durable key-value persistence seam, scoped to one installation.
/// Implementations report failures; the fail-soft policy lives one layer up
/// in [`PreferenceStore`](crate::store::PreferenceStore).
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> SparkResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SparkResult<()>;
    fn remove(&self, key: &str) -> SparkResult<()>;
}

#[derive(Default)]
pub struct MemoryBackend {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> SparkResult<Option<String>> {
        Ok(self.map.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SparkResult<()> {
        self.map
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SparkResult<()> {
        self.map.write().unwrap().remove(key);
        Ok(())
    }
}

/// One JSON object file, read-modify-write per call. The store is single
/// user and single device; cross-tab races are accepted as last write wins.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the platform config directory.
    pub fn open_default() -> SparkResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| SparkError::Storage("no config directory on this platform".into()))?
            .join("sparkpane");
        Ok(Self {
            path: dir.join("store.json"),
        })
    }

    fn read_map(&self) -> SparkResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let map = serde_json::from_str(&content)?;
        Ok(map)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> SparkResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> SparkResult<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SparkResult<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> SparkResult<()> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
