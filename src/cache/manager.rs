//! Cache manager for persisting API state to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files with
//! an absolute expiry timestamp in epoch milliseconds.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{Clock, SystemClock};

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// Epoch milliseconds until which the entry is fresh
    valid_till: i64,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: i64) -> bool {
        now < self.valid_till
    }
}

/// Manages reading and writing cached data to disk
///
/// Entries live as one JSON file per key in the cache directory
/// (`~/.config/coincal/` on Linux). A stale entry is never returned; it is only
/// replaced by the next `set` for the same key or removed by `delete`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    /// Creates a new CacheManager in the per-user configuration directory
    ///
    /// Credentials are stored here permanently, so the configuration directory is
    /// used rather than the purgeable cache directory. Returns `None` if no home
    /// directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "coincal")?;
        Some(Self::with_dir(project_dirs.config_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used for expiry
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let content = fs::read_to_string(self.cache_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Returns the value stored under `key` if present and fresh
    ///
    /// Missing, unparseable and stale entries all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.read_entry::<T>(key)?;
        if entry.is_fresh(self.clock.now_millis()) {
            Some(entry.data)
        } else {
            tracing::debug!(key, valid_till = entry.valid_till, "cache entry is stale");
            None
        }
    }

    /// Stores `data` under `key`, fresh for `ttl`
    ///
    /// With no `ttl` the entry never expires and stays until deleted or
    /// overwritten. The file is written to a temporary sibling and renamed into
    /// place so a reader never observes a half-written entry.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let valid_till = match ttl {
            Some(ttl) => {
                let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                self.clock.now_millis().saturating_add(ttl_millis)
            }
            None => i64::MAX,
        };
        let entry = CacheEntry { data, valid_till };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let path = self.cache_path(key);
        let tmp_path = self.cache_dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)
    }

    /// Removes the entry for `key`; deleting a missing key succeeds
    pub fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.cache_path(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
