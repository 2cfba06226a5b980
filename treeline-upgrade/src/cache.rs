//! Per-run cache of generated file contents.
//!
//! The orchestrator owns one cache and clears it at the start of every run.
//! A patch invalidates the patched path so the next load goes back to disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ContentCache {
    entries: Mutex<HashMap<PathBuf, Arc<str>>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached content of `path`, reading it from disk on a miss.
    ///
    /// Non-UTF-8 content is reported as `InvalidData`.
    pub fn load(&self, path: &Path) -> std::io::Result<Arc<str>> {
        if let Some(hit) = self.lock().get(path) {
            return Ok(hit.clone());
        }
        let content: Arc<str> = std::fs::read_to_string(path)?.into();
        self.lock().insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    /// Drop the cached entry for `path`, if any.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<str>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_serves_cached_content_until_invalidated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("negotiate.js");
        fs::write(&path, "v1").unwrap();

        let cache = ContentCache::new();
        assert_eq!(&*cache.load(&path).unwrap(), "v1");

        fs::write(&path, "v2").unwrap();
        assert_eq!(&*cache.load(&path).unwrap(), "v1", "stale read expected before invalidation");

        assert!(cache.invalidate(&path));
        assert_eq!(&*cache.load(&path).unwrap(), "v2");
    }

    #[test]
    fn missing_file_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.js");
        let cache = ContentCache::new();
        let err = cache.load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(cache.is_empty());
    }

    #[test]
    fn non_utf8_is_invalid_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("binary.js");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = ContentCache::new().load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn clear_empties_every_entry() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.js");
        let b = tmp.path().join("b.js");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let cache = ContentCache::new();
        cache.load(&a).unwrap();
        cache.load(&b).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(!cache.contains(&a));
        assert!(cache.is_empty());
    }
}
