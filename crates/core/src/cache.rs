//! Two-tier read cache in front of the persisted documents.
//!
//! The persisted output stays the source of truth and is always read first. Successful reads
//! refresh both tiers. When a read fails unexpectedly (I/O or corrupt JSON, not a missing
//! document) the last good copy is served from the in-process map, or from the persisted cold
//! copy if it is younger than the validity window.

use crate::constants::CACHE_VALIDITY;
use crate::storage;
use crate::TransformerResult;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct CachedDocument<T> {
    data: T,
    timestamp: DateTime<Utc>,
}

/// Read-through fallback cache for one document type.
#[derive(Debug)]
pub struct ReadCache<T> {
    hot: RwLock<HashMap<String, T>>,
    cold_dir: PathBuf,
    validity: Duration,
}

impl<T> ReadCache<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    pub fn new(cold_dir: PathBuf) -> Self {
        Self {
            hot: RwLock::new(HashMap::new()),
            cold_dir,
            validity: CACHE_VALIDITY,
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn cold_dir(&self) -> &Path {
        &self.cold_dir
    }

    /// Reads `key` through `load`, falling back to a cached copy if `load` fails.
    ///
    /// `Ok(None)` from `load` means the document does not exist; it evicts `key` and is passed
    /// through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error from `load` when neither tier holds a usable copy.
    pub fn read_through<F>(&self, key: &str, load: F) -> TransformerResult<Option<T>>
    where
        F: FnOnce() -> TransformerResult<Option<T>>,
    {
        match load() {
            Ok(Some(value)) => {
                self.store(key, &value);
                Ok(Some(value))
            }
            Ok(None) => {
                self.evict(key);
                Ok(None)
            }
            Err(e) => match self.fallback(key) {
                Some(value) => {
                    tracing::warn!("Serving cached copy of {} after read failure: {}", key, e);
                    Ok(Some(value))
                }
                None => Err(e),
            },
        }
    }

    fn cold_path(&self, key: &str) -> PathBuf {
        self.cold_dir.join(format!("{key}.json"))
    }

    fn store(&self, key: &str, value: &T) {
        {
            let mut hot = self.hot.write().unwrap_or_else(PoisonError::into_inner);
            if hot.get(key) == Some(value) {
                return;
            }
            hot.insert(key.to_owned(), value.clone());
        }

        let cached = CachedDocument {
            data: value,
            timestamp: Utc::now(),
        };
        let result = storage::ensure_dir(&self.cold_dir)
            .and_then(|()| storage::write_json_atomic(&self.cold_path(key), &cached));
        if let Err(e) = result {
            tracing::warn!("Failed to persist cache entry {}: {}", key, e);
        }
    }

    fn evict(&self, key: &str) {
        self.hot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if let Err(e) = storage::remove_if_exists(&self.cold_path(key)) {
            tracing::warn!("Failed to evict cache entry {}: {}", key, e);
        }
    }

    fn fallback(&self, key: &str) -> Option<T> {
        if let Some(value) = self
            .hot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Some(value.clone());
        }

        let cached: CachedDocument<T> = match storage::read_json_if_exists(&self.cold_path(key)) {
            Ok(Some(cached)) => cached,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Unreadable cache entry {}: {}", key, e);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(cached.timestamp);
        let fresh = age
            .to_std()
            .map(|age| age <= self.validity)
            .unwrap_or(true);
        if fresh {
            Some(cached.data)
        } else {
            tracing::debug!("Cache entry {} is older than the validity window", key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransformerError;
    use chrono::Duration as ChronoDuration;
    use std::fs;
    use tempfile::TempDir;

    fn failing_load() -> TransformerResult<Option<String>> {
        Err(TransformerError::InvalidInput("disk on fire".into()))
    }

    #[test]
    fn successful_reads_are_passed_through_and_cached() {
        let temp = TempDir::new().unwrap();
        let cache = ReadCache::new(temp.path().join("cache"));

        let value = cache
            .read_through("index", || Ok(Some("v1".to_string())))
            .unwrap();
        assert_eq!(value.as_deref(), Some("v1"));
        assert!(temp.path().join("cache/index.json").is_file());

        let fallback = cache.read_through("index", failing_load).unwrap();
        assert_eq!(fallback.as_deref(), Some("v1"));
    }

    #[test]
    fn cold_tier_survives_a_restart() {
        let temp = TempDir::new().unwrap();
        let cold_dir = temp.path().join("cache");
        ReadCache::new(cold_dir.clone())
            .read_through("resident-5001", || Ok(Some("doc".to_string())))
            .unwrap();

        let restarted: ReadCache<String> = ReadCache::new(cold_dir);
        let value = restarted.read_through("resident-5001", failing_load).unwrap();
        assert_eq!(value.as_deref(), Some("doc"));
    }

    #[test]
    fn stale_cold_entries_are_not_served() {
        let temp = TempDir::new().unwrap();
        let cold_dir = temp.path().join("cache");
        fs::create_dir_all(&cold_dir).unwrap();
        let stale = CachedDocument {
            data: "old".to_string(),
            timestamp: Utc::now() - ChronoDuration::hours(25),
        };
        fs::write(
            cold_dir.join("index.json"),
            serde_json::to_vec(&stale).unwrap(),
        )
        .unwrap();

        let cache: ReadCache<String> = ReadCache::new(cold_dir);
        assert!(cache.read_through("index", failing_load).is_err());
    }

    #[test]
    fn absent_documents_evict_and_are_never_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let cache = ReadCache::new(temp.path().join("cache"));
        cache
            .read_through("resident-1", || Ok(Some("doc".to_string())))
            .unwrap();

        assert_eq!(cache.read_through("resident-1", || Ok(None)).unwrap(), None);
        assert!(!temp.path().join("cache/resident-1.json").exists());
        assert!(cache.read_through("resident-1", failing_load).is_err());
    }

    #[test]
    fn errors_propagate_without_any_cached_copy() {
        let temp = TempDir::new().unwrap();
        let cache: ReadCache<String> = ReadCache::new(temp.path().join("cache"));
        assert!(cache.read_through("index", failing_load).is_err());
    }
}
