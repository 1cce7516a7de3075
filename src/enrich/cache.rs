//! File-based cache for registry responses.
//!
//! Caches the per-provider draft a source produced for a package, with a
//! TTL. Only individual provider outputs are cached, never merged results:
//! the merged view is rebuilt every run so provider priorities and data
//! drift take effect.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::model::MetadataDraft;

/// Cache key: which source produced the draft, for which package identity.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub source: String,
    pub identity: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            identity: identity.into(),
        }
    }

    /// Filesystem-safe filename derived from the key.
    pub fn to_filename(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("source:{}|identity:{}", self.source, self.identity));
        let hash = hasher.finalize();
        format!("{hash:x}.json")
    }
}

/// File-based cache with TTL support.
pub struct FileCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Create a new file cache, creating the directory if needed.
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Result<Self> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }
        Ok(Self { cache_dir, ttl })
    }

    /// Get a cached draft. Returns None if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<MetadataDraft> {
        let path = self.cache_dir.join(key.to_filename());
        let metadata = fs::metadata(&path).ok()?;

        let modified = metadata.modified().ok()?;
        let age = modified.elapsed().ok()?;
        if age > self.ttl {
            let _ = fs::remove_file(&path);
            return None;
        }

        let data = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// Store a draft.
    pub fn set(&self, key: &CacheKey, draft: &MetadataDraft) -> Result<()> {
        let path = self.cache_dir.join(key.to_filename());
        let data = serde_json::to_string(draft)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Clear all cached entries.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.path().extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MetadataDraft {
        let mut draft = MetadataDraft::new();
        draft.set_description("cached description");
        draft
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf(), Duration::from_secs(60)).unwrap();
        let key = CacheKey::new("crates.io", "pkg:cargo/serde@1.0.0");

        assert!(cache.get(&key).is_none());
        cache.set(&key, &draft()).unwrap();
        let cached = cache.get(&key).expect("fresh entry");
        assert_eq!(cached.description.as_deref(), Some("cached description"));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf(), Duration::ZERO).unwrap();
        let key = CacheKey::new("crates.io", "pkg:cargo/serde@1.0.0");

        cache.set(&key, &draft()).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn distinct_keys_get_distinct_files() {
        let a = CacheKey::new("crates.io", "pkg:cargo/serde@1.0.0");
        let b = CacheKey::new("pypi.org", "pkg:cargo/serde@1.0.0");
        assert_ne!(a.to_filename(), b.to_filename());
    }
}
