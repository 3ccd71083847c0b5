// File-backed byte cache with per-entry TTL metadata.
//
// Each entry is a pair of files under a namespace directory: the payload and
// a JSON metadata sidecar carrying the original key and expiry timestamps.
// Writes go through a temp file and rename, so readers never observe a
// half-written payload. Expired entries are deleted when a read touches them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cache metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Cache activity counters. An instance is injected into each cache that
/// should report into it; nothing here is process-global.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
    bytes_written: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    pub bytes_written: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        CacheStats::default()
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }

    /// Hit rate over all reads so far; 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let snap = self.snapshot();
        let total = snap.hits + snap.misses;
        if total == 0 {
            0.0
        } else {
            snap.hits as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata sidecar
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct EntryMetadata {
    key: String,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    size: u64,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// String-keyed byte cache under `base_dir/namespace/`.
pub struct FileCache {
    namespace: String,
    dir: PathBuf,
    default_ttl_hours: i64,
    stats: Option<Arc<CacheStats>>,
}

impl FileCache {
    pub fn new(
        base_dir: &Path,
        namespace: &str,
        default_ttl_hours: i64,
    ) -> Result<Self, CacheError> {
        let dir = base_dir.join(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        Ok(FileCache {
            namespace: namespace.to_string(),
            dir,
            default_ttl_hours,
            stats: None,
        })
    }

    /// Attach a stats observer. Multiple caches may share one.
    pub fn with_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stats(&self) -> Option<&CacheStats> {
        self.stats.as_deref()
    }

    /// Payload path for a key. The key is hashed for the filename so long or
    /// filesystem-hostile keys are safe; a sanitized prefix keeps the
    /// directory human-readable.
    fn entry_path(&self, key: &str) -> PathBuf {
        let prefix: String = key
            .chars()
            .take(20)
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{:016x}_{prefix}.bin", fnv1a(key)))
    }

    fn metadata_path(entry_path: &Path) -> PathBuf {
        entry_path.with_extension("meta")
    }

    /// Store a payload. `ttl_hours` overrides the cache default for this
    /// entry only.
    pub fn set(&self, key: &str, value: &[u8], ttl_hours: Option<i64>) -> Result<(), CacheError> {
        let result = self.set_inner(key, value, ttl_hours);
        match &result {
            Ok(()) => {
                if let Some(stats) = self.stats() {
                    stats.record_write(value.len() as u64);
                }
            }
            Err(e) => {
                warn!("{}: failed to cache '{key}': {e}", self.namespace);
                if let Some(stats) = self.stats() {
                    stats.record_error();
                }
            }
        }
        result
    }

    fn set_inner(&self, key: &str, value: &[u8], ttl_hours: Option<i64>) -> Result<(), CacheError> {
        let entry_path = self.entry_path(key);
        let meta_path = Self::metadata_path(&entry_path);
        let tmp_path = entry_path.with_extension("tmp");

        std::fs::write(&tmp_path, value).map_err(|e| CacheError::Io {
            path: tmp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &entry_path).map_err(|e| CacheError::Io {
            path: entry_path.display().to_string(),
            source: e,
        })?;

        let now = Utc::now();
        let ttl = Duration::hours(ttl_hours.unwrap_or(self.default_ttl_hours));
        let metadata = EntryMetadata {
            key: key.to_string(),
            stored_at: now,
            expires_at: now + ttl,
            size: value.len() as u64,
        };
        let json = serde_json::to_string(&metadata)?;
        std::fs::write(&meta_path, json).map_err(|e| CacheError::Io {
            path: meta_path.display().to_string(),
            source: e,
        })?;

        debug!("{}: cached '{key}' ({} bytes)", self.namespace, value.len());
        Ok(())
    }

    /// Fetch a payload. Missing, expired, or unreadable entries all read as
    /// None; expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entry_path = self.entry_path(key);
        let meta_path = Self::metadata_path(&entry_path);

        let meta_text = match std::fs::read_to_string(&meta_path) {
            Ok(text) => text,
            Err(_) => {
                if let Some(stats) = self.stats() {
                    stats.record_miss();
                }
                return None;
            }
        };
        let metadata: EntryMetadata = match serde_json::from_str(&meta_text) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("{}: corrupt metadata for '{key}': {e}", self.namespace);
                if let Some(stats) = self.stats() {
                    stats.record_error();
                }
                return None;
            }
        };

        if Utc::now() > metadata.expires_at {
            debug!("{}: '{key}' expired", self.namespace);
            let _ = std::fs::remove_file(&entry_path);
            let _ = std::fs::remove_file(&meta_path);
            if let Some(stats) = self.stats() {
                stats.record_miss();
            }
            return None;
        }

        match std::fs::read(&entry_path) {
            Ok(value) => {
                if let Some(stats) = self.stats() {
                    stats.record_hit();
                }
                Some(value)
            }
            Err(e) => {
                warn!("{}: failed to read '{key}': {e}", self.namespace);
                if let Some(stats) = self.stats() {
                    stats.record_error();
                }
                None
            }
        }
    }

    /// Remove one entry. Absent entries are not an error.
    pub fn invalidate(&self, key: &str) {
        let entry_path = self.entry_path(key);
        let _ = std::fs::remove_file(Self::metadata_path(&entry_path));
        let _ = std::fs::remove_file(entry_path);
    }

    /// Remove every file in the namespace. Returns the number removed.
    pub fn clear(&self) -> usize {
        let mut count = 0;
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        for entry in entries.flatten() {
            if entry.path().is_file() && std::fs::remove_file(entry.path()).is_ok() {
                count += 1;
            }
        }
        debug!("{}: cleared {count} files", self.namespace);
        count
    }
}

/// FNV-1a over the key bytes. Stable across runs and platforms, which the
/// standard hasher does not guarantee; filenames must not change between
/// invocations.
fn fnv1a(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(tag: &str, ttl_hours: i64) -> FileCache {
        let base = std::env::temp_dir().join(format!("draftboard_cache_{tag}"));
        let _ = std::fs::remove_dir_all(&base);
        FileCache::new(&base, "test", ttl_hours).expect("cache dir should be creatable")
    }

    #[test]
    fn set_then_get_roundtrip() {
        let cache = temp_cache("roundtrip", 24);
        cache.set("rankings:espn", b"some,csv,data", None).unwrap();
        assert_eq!(
            cache.get("rankings:espn").as_deref(),
            Some(b"some,csv,data".as_ref())
        );
        cache.clear();
    }

    #[test]
    fn missing_key_is_none() {
        let cache = temp_cache("missing", 24);
        assert!(cache.get("never-stored").is_none());
        cache.clear();
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        // TTL of -1 hours: already expired the moment it is written.
        let cache = temp_cache("expired", 24);
        cache.set("stale", b"old", Some(-1)).unwrap();
        assert!(cache.get("stale").is_none());
        // The files are gone, so a second read is a plain miss.
        assert!(cache.get("stale").is_none());
        cache.clear();
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = temp_cache("invalidate", 24);
        cache.set("doomed", b"bytes", None).unwrap();
        cache.invalidate("doomed");
        assert!(cache.get("doomed").is_none());
        cache.clear();
    }

    #[test]
    fn clear_removes_all_files() {
        let cache = temp_cache("clear", 24);
        cache.set("a", b"1", None).unwrap();
        cache.set("b", b"2", None).unwrap();
        // Payload + metadata per entry.
        assert_eq!(cache.clear(), 4);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn hostile_keys_are_safe_filenames() {
        let cache = temp_cache("hostile", 24);
        let key = "https://example.com/rankings?week=1&pos=RB/WR";
        cache.set(key, b"payload", None).unwrap();
        assert_eq!(cache.get(key).as_deref(), Some(b"payload".as_ref()));
        cache.clear();
    }

    #[test]
    fn stats_count_hits_misses_writes() {
        let stats = Arc::new(CacheStats::new());
        let cache = temp_cache("stats", 24).with_stats(Arc::clone(&stats));

        cache.set("k", b"v", None).unwrap();
        assert!(cache.get("k").is_some());
        assert!(cache.get("absent").is_none());

        let snap = stats.snapshot();
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.bytes_written, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
        cache.clear();
    }

    #[test]
    fn fnv1a_is_stable() {
        // Pinned value: filenames must never change across builds.
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
