//! Persisted window state.
//!
//! A flat JSON key-value store shared by every window. Writes are
//! last-writer-wins; nothing is versioned or merged.

use crate::geometry::PartialBounds;
use crate::{Rect, Result};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const WIN_BOUNDS_KEY: &str = "winBounds";
pub const ZOOM_LEVEL_KEY: &str = "zoomLevel";

pub trait StateStore: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }
}

/// Reads `winBounds`, ignoring values that are not a bounds object.
pub fn load_bounds(store: &dyn StateStore) -> Option<PartialBounds> {
    let value = store.get(WIN_BOUNDS_KEY)?;
    match serde_json::from_value(value) {
        Ok(bounds) => Some(bounds),
        Err(e) => {
            warn!("Ignoring malformed {}: {}", WIN_BOUNDS_KEY, e);
            None
        }
    }
}

pub fn load_zoom_level(store: &dyn StateStore) -> Option<f64> {
    store.get(ZOOM_LEVEL_KEY).and_then(|v| v.as_f64())
}

pub fn save_bounds(store: &mut dyn StateStore, rect: Rect) -> Result<()> {
    store.set(WIN_BOUNDS_KEY, serde_json::to_value(rect)?)
}

pub fn save_zoom_level(store: &mut dyn StateStore, zoom_level: f64) -> Result<()> {
    store.set(ZOOM_LEVEL_KEY, Value::from(zoom_level))
}

pub fn default_state_path() -> PathBuf {
    crate::config::config_dir().join("state.json")
}

/// JSON object on disk, rewritten on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map,
                    other => {
                        warn!(
                            "State file {:?} holds {} instead of an object, starting empty",
                            path,
                            type_name(&other)
                        );
                        Map::new()
                    }
                }
            }
        } else {
            Map::new()
        };

        debug!("Opened state store {:?} with {} keys", path, values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clear(&mut self) -> Result<()> {
        self.values.clear();
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// In-memory store. Clones share the same contents, and every `set` is
/// recorded so callers can check how often a key was written.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    values: Map<String, Value>,
    writes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (key, value) in values {
                inner.values.insert(key.to_string(), value);
            }
        }
        store
    }

    /// Keys passed to `set`, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.lock().writes.iter().filter(|k| *k == key).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock only means a test panicked mid-write; the map is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), value);
        inner.writes.push(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn file_store_persists_across_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        save_bounds(&mut store, Rect::new(10.0, 20.0, 800.0, 600.0)).unwrap();
        save_zoom_level(&mut store, 1.5).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let bounds = load_bounds(&reopened).unwrap();
        assert_eq!(bounds.x, Some(10.0));
        assert_eq!(bounds.height, Some(600.0));
        assert_eq!(load_zoom_level(&reopened), Some(1.5));
    }

    #[test]
    fn file_store_tolerates_empty_and_non_object_files() {
        let temp = tempdir().unwrap();
        let empty = temp.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(JsonFileStore::open(&empty).unwrap().get(ZOOM_LEVEL_KEY).is_none());

        let array = temp.path().join("array.json");
        std::fs::write(&array, "[1, 2]").unwrap();
        assert!(JsonFileStore::open(&array).unwrap().get(ZOOM_LEVEL_KEY).is_none());
    }

    #[test]
    fn file_store_clear_removes_everything() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        save_zoom_level(&mut store, 2.0).unwrap();
        store.clear().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(load_zoom_level(&reopened), None);
    }

    #[test]
    fn malformed_bounds_are_ignored() {
        let store = MemoryStore::with_values([(WIN_BOUNDS_KEY, json!("wide"))]);
        assert_eq!(load_bounds(&store), None);
    }

    #[test]
    fn get_or_falls_back_to_default() {
        let store = MemoryStore::new();
        assert_eq!(store.get_or(ZOOM_LEVEL_KEY, json!(0)), json!(0));
    }

    #[test]
    fn memory_store_clones_share_writes() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        save_zoom_level(&mut handle, 0.5).unwrap();
        save_zoom_level(&mut handle, 1.0).unwrap();

        assert_eq!(store.write_count(ZOOM_LEVEL_KEY), 2);
        assert_eq!(load_zoom_level(&store), Some(1.0));
    }
}
