//! Two-layer TTL store backing the response cache
//!
//! Payloads live in an in-memory map for the session and are mirrored as JSON
//! files (`{"data": …, "timestamp": <epoch-ms>}`) in an XDG cache directory.
//! A stale entry is treated as absent and evicted when it is next touched;
//! there is no background sweep. Storage failures degrade the cache to
//! "always absent" instead of failing the caller.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Freshness window for cached payloads (10 minutes)
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(600);

/// In-memory cache slot
#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    timestamp: DateTime<Utc>,
}

/// On-disk envelope for a cache entry
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    data: Value,
    /// Creation time in epoch milliseconds
    timestamp: i64,
}

/// TTL response cache with an optional persistent layer.
///
/// Constructed once at startup and shared via `Arc`. Lookups check the
/// in-memory map first, then the disk mirror, so entries written by a prior
/// run are reused while still fresh.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, StoredEntry>>,
    disk_dir: Option<PathBuf>,
}

impl ResponseCache {
    /// Creates a memory-only cache with the given TTL
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            ttl: Duration::milliseconds(ttl.as_millis() as i64),
            entries: Mutex::new(HashMap::new()),
            disk_dir: None,
        }
    }

    /// Creates a cache mirrored to the XDG cache directory for "ecodash".
    ///
    /// Falls back to memory-only when no home directory can be determined.
    pub fn persistent(ttl: StdDuration) -> Self {
        let disk_dir = ProjectDirs::from("", "", "ecodash")
            .map(|dirs| dirs.cache_dir().to_path_buf());
        if disk_dir.is_none() {
            warn!("no cache directory available, persisting disabled");
        }
        let mut cache = Self::new(ttl);
        cache.disk_dir = disk_dir;
        cache
    }

    /// Creates a cache mirrored to a specific directory (used by tests)
    pub fn with_disk_dir(ttl: StdDuration, dir: PathBuf) -> Self {
        let mut cache = Self::new(ttl);
        cache.disk_dir = Some(dir);
        cache
    }

    /// Returns the payload for `key` if a fresh entry exists.
    ///
    /// A stale entry is evicted from both layers and reported absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// `get` against an explicit clock reading (used by tests)
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.get(key) {
                Some(stored) if self.is_fresh(stored.timestamp, now) => Some(stored.value.clone()),
                Some(_) => {
                    entries.remove(key);
                    None
                }
                None => None,
            }
        };

        if let Some(value) = entry {
            debug!(key, "cache hit");
            return self.decode(key, value);
        }

        // Memory miss: the persistent layer may hold an entry from a prior run
        if let Some((value, timestamp)) = self.read_disk(key, now) {
            self.entries.lock().insert(
                key.to_string(),
                StoredEntry {
                    value: value.clone(),
                    timestamp,
                },
            );
            return self.decode(key, value);
        }
        None
    }

    /// Stores `payload` under `key`, overwriting any existing entry.
    ///
    /// Disk errors are logged and swallowed; the memory layer always wins.
    pub fn put<T: Serialize>(&self, key: &str, payload: &T) {
        self.put_at(key, payload, Utc::now());
    }

    /// `put` against an explicit clock reading (used by tests)
    pub fn put_at<T: Serialize>(&self, key: &str, payload: &T, now: DateTime<Utc>) {
        let value = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize payload for cache");
                return;
            }
        };

        self.entries.lock().insert(
            key.to_string(),
            StoredEntry {
                value: value.clone(),
                timestamp: now,
            },
        );

        if let Err(e) = self.write_disk(key, value, now) {
            warn!(key, error = %e, "failed to persist cache entry");
        }
    }

    fn is_fresh(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - timestamp < self.ttl
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                // Shape mismatch, e.g. the payload type changed between runs
                warn!(key, error = %e, "discarding undecodable cache entry");
                self.entries.lock().remove(key);
                None
            }
        }
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.disk_dir.as_ref().map(|dir| dir.join(format!("{}.json", key)))
    }

    /// Reads a fresh entry from the disk mirror, evicting it when stale.
    /// Returns the payload with its original creation time so the memory
    /// layer inherits the remaining TTL.
    fn read_disk(&self, key: &str, now: DateTime<Utc>) -> Option<(Value, DateTime<Utc>)> {
        let path = self.entry_path(key)?;
        let content = fs::read_to_string(&path).ok()?;
        let entry: DiskEntry = match serde_json::from_str(&content) {
            Ok(e) => e,
            Err(e) => {
                warn!(key, error = %e, "ignoring corrupt cache file");
                return None;
            }
        };

        let timestamp = DateTime::from_timestamp_millis(entry.timestamp)?;
        if self.is_fresh(timestamp, now) {
            debug!(key, "persistent cache hit");
            Some((entry.data, timestamp))
        } else {
            if let Err(e) = fs::remove_file(&path) {
                warn!(key, error = %e, "failed to evict stale cache file");
            }
            None
        }
    }

    fn write_disk(&self, key: &str, data: Value, now: DateTime<Utc>) -> std::io::Result<()> {
        let Some(path) = self.entry_path(key) else {
            return Ok(());
        };
        if let Some(dir) = &self.disk_dir {
            fs::create_dir_all(dir)?;
        }
        let entry = DiskEntry {
            data,
            timestamp: now.timestamp_millis(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}
