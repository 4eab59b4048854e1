//! Persistent key/value cache for slow external lookups (geocoding, housing
//! index queries). The cache is an explicit object owned by the caller and
//! written back only on [`ResponseCache::flush`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::IoError;

#[derive(Debug)]
pub struct ResponseCache {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

impl ResponseCache {
    /// Load the cache at `path`. A missing file is an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IoError> {
        let path = path.into();
        let entries: BTreeMap<String, Value> = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| IoError::json(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(IoError::read(&path, e)),
        };
        log::debug!("cache {}: {} entries", path.display(), entries.len());
        Ok(Self { path, entries, dirty: false })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.dirty = true;
        self.entries.insert(key.into(), value)
    }

    /// Read-through lookup: return the cached value, or compute, store and
    /// return it. A failed computation leaves the cache untouched.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        fetch: impl FnOnce() -> Result<Value, E>,
    ) -> Result<&Value, E> {
        if !self.entries.contains_key(key) {
            log::trace!("cache miss: {key}");
            let value = fetch()?;
            self.dirty = true;
            self.entries.insert(key.to_string(), value);
        }
        Ok(&self.entries[key])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache if it changed since it was opened or last flushed.
    /// The file is replaced atomically. Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool, IoError> {
        if !self.dirty {
            return Ok(false);
        }
        let text = serde_json::to_string_pretty(&self.entries).map_err(|e| IoError::json(&self.path, e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, text).map_err(|e| IoError::write(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| IoError::write(&self.path, e))?;

        self.dirty = false;
        log::debug!("flushed {} cache entries to {}", self.entries.len(), self.path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::open(dir.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn round_trips_through_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResponseCache::open(&path).unwrap();
        cache.insert("abbeville, alabama", json!({"lat": 31.57, "lng": -85.25}));
        assert!(cache.flush().unwrap());
        assert!(!dir.path().join("cache.json.tmp").exists());

        let reopened = ResponseCache::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("abbeville, alabama").unwrap()["lat"], 31.57);
    }

    #[test]
    fn clean_flush_does_not_touch_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{\"k\": 1}").unwrap();

        let mut cache = ResponseCache::open(&path).unwrap();
        assert!(!cache.flush().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"k\": 1}");
    }

    #[test]
    fn read_through_fetches_once() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::open(dir.path().join("c.json")).unwrap();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("k", || {
                    calls += 1;
                    Ok::<_, String>(json!(42))
                })
                .unwrap();
            assert_eq!(*value, json!(42));
        }
        assert_eq!(calls, 1);
        assert!(cache.is_dirty());
    }

    #[test]
    fn failed_fetch_is_not_cached() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::open(dir.path().join("c.json")).unwrap();
        let err = cache.get_or_try_insert_with("k", || Err("offline")).unwrap_err();
        assert_eq!(err, "offline");
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn corrupt_file_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(ResponseCache::open(&path), Err(IoError::Json { .. })));
    }
}
