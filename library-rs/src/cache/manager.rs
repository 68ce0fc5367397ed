//! TTL + LRU cache with disk persistence and a checksum-verified blob store.
//!
//! One `CacheManager` owns a cache directory:
//! - `metadata/cache_index.json` - the serialized entry table
//! - `files/<key>.cache`         - raw blobs for cached files
//! - `temp/`                     - scratch space
//!
//! Every operation is serialized behind one mutex. All I/O is synchronous;
//! index writes go to a temp file and are renamed into place.

use crate::cache::entry::CacheEntry;
use crate::errors::{AioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const INDEX_VERSION: &str = "1.0";

/// Cache tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one (seconds)
    pub default_ttl: u64,
    /// Soft ceiling for the blob store in bytes
    pub max_cache_size: u64,
    /// Hard ceiling on entry count; LRU eviction keeps the table at or below it
    pub max_entries: usize,
    /// Minimum seconds between non-forced `cleanup` runs
    pub cleanup_interval: u64,
    /// Verify blob checksums on write and read
    pub checksum_validation: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: 3600,
            max_cache_size: 1024 * 1024 * 1024,
            max_entries: 10_000,
            cleanup_interval: 3600,
            checksum_validation: true,
        }
    }
}

/// Snapshot of cache statistics returned by `get_stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_size: u64,
    pub hit_rate: f64,
    pub total_entries: usize,
    pub expired_entries: usize,
}

/// Counts from one `cleanup` pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// True when the run was skipped because the interval had not elapsed
    pub skipped: bool,
    pub expired_cleaned: usize,
    pub evicted: usize,
    pub orphaned_cleaned: usize,
    pub total_entries: usize,
}

/// Running counters, persisted alongside the entries in the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheCounters {
    #[serde(default)]
    hits: u64,
    #[serde(default)]
    misses: u64,
    #[serde(default)]
    evictions: u64,
    #[serde(default)]
    total_size: u64,
    #[serde(default)]
    last_cleanup: Option<DateTime<Utc>>,
}

/// On-disk shape of `metadata/cache_index.json`
#[derive(Serialize, Deserialize)]
struct CacheIndex {
    version: String,
    created_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
    stats: CacheCounters,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    counters: CacheCounters,
}

/// Disk-backed TTL cache with LRU eviction and file-blob support
pub struct CacheManager {
    cache_dir: PathBuf,
    metadata_dir: PathBuf,
    files_dir: PathBuf,
    temp_dir: PathBuf,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl CacheManager {
    /// Create a manager rooted at `cache_dir`, creating the directory
    /// structure and loading any existing index.
    ///
    /// A corrupt or unreadable index is logged and ignored; the manager
    /// starts empty in that case.
    pub fn new(cache_dir: impl AsRef<Path>, config: CacheConfig) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        let metadata_dir = cache_dir.join("metadata");
        let files_dir = cache_dir.join("files");
        let temp_dir = cache_dir.join("temp");

        for dir in [&cache_dir, &metadata_dir, &files_dir, &temp_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                AioError::IoError(format!(
                    "Failed to create cache directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let manager = Self {
            cache_dir,
            metadata_dir,
            files_dir,
            temp_dir,
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                counters: CacheCounters::default(),
            }),
        };

        if let Err(e) = manager.load() {
            warn!("failed to load cache index: {}", e);
        }

        debug!("cache manager initialized: {}", manager.cache_dir.display());
        Ok(manager)
    }

    /// Cache root directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Scratch directory for callers that stage downloads before caching
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== KEY/VALUE OPERATIONS =====

    /// Get a value, recording a hit or miss.
    ///
    /// An expired entry is purged on the spot and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.lock_state();

        let expired = match state.entries.get(key) {
            None => {
                state.counters.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            state.entries.remove(key);
            state.counters.misses += 1;
            return None;
        }

        state.counters.hits += 1;
        state.entries.get_mut(key).map(|entry| entry.access())
    }

    /// Get a value, falling back to `default` on a miss
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Insert or overwrite a value.
    ///
    /// Runs an LRU sweep if the insert pushed the table over
    /// `max_entries`. Capacity never causes a `false` return.
    pub fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> bool {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let mut state = self.lock_state();

        state.entries.insert(key.to_string(), CacheEntry::new(key, value, ttl));

        if state.entries.len() > self.config.max_entries {
            self.evict_lru_locked(&mut state);
        }

        debug!("cached entry: {} (ttl: {}s)", key, ttl);
        true
    }

    /// Remove an entry; true if it existed
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.lock_state();
        state.entries.remove(key).is_some()
    }

    /// True if the key is present and not expired (no purge)
    pub fn exists(&self, key: &str) -> bool {
        let state = self.lock_state();
        state.entries.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Reset an entry's expiry window; false if the key is absent
    pub fn refresh(&self, key: &str, ttl: Option<u64>) -> bool {
        let mut state = self.lock_state();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.refresh(ttl);
                debug!("refreshed cache entry: {}", key);
                true
            }
            None => false,
        }
    }

    // ===== FILE CACHE =====

    /// Cache file content under `files/<key>.cache`.
    ///
    /// With checksum validation enabled the content hash is computed; if
    /// `checksum` was supplied and disagrees, the partial blob is deleted
    /// and `ChecksumMismatch` is returned. The metadata entry is stored
    /// under `file:<key>`.
    ///
    /// # Arguments
    /// * `original_path` - Source path, used to derive the key when none is given
    /// * `content` - Raw file bytes
    /// * `key` - Explicit cache key (derived from `original_path` if `None`)
    /// * `checksum` - Expected SHA-256 hex digest of `content`
    /// * `ttl` - TTL for the metadata entry
    ///
    /// # Returns
    /// Path to the cached blob
    pub fn cache_file(
        &self,
        original_path: &str,
        content: &[u8],
        key: Option<&str>,
        checksum: Option<&str>,
        ttl: Option<u64>,
    ) -> Result<PathBuf> {
        let key = match key {
            Some(k) => k.to_string(),
            None => file_key(original_path),
        };

        let blob_path = self.files_dir.join(format!("{}.cache", key));

        fs::write(&blob_path, content).map_err(|e| {
            AioError::IoError(format!(
                "Failed to write cached file {}: {}",
                blob_path.display(),
                e
            ))
        })?;

        let stored_checksum = if self.config.checksum_validation {
            let calculated = sha256_hex(content);
            if let Some(expected) = checksum {
                if calculated != expected {
                    let _ = fs::remove_file(&blob_path);
                    return Err(AioError::ChecksumMismatch(format!(
                        "content for {} does not match the declared checksum",
                        original_path
                    )));
                }
            }
            Some(calculated)
        } else {
            checksum.map(|c| c.to_string())
        };

        let metadata = json!({
            "original_path": original_path,
            "cache_path": blob_path.to_string_lossy(),
            "size": content.len(),
            "checksum": stored_checksum,
            "cached_at": Utc::now().to_rfc3339(),
        });

        let meta_key = format!("file:{}", key);
        {
            // Overwriting a key replaces its blob; retire the old size first
            let mut state = self.lock_state();
            if let Some(previous) = state.entries.get(&meta_key) {
                let old_size = previous
                    .data
                    .get("size")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0);
                state.counters.total_size = state.counters.total_size.saturating_sub(old_size);
            }
        }

        self.set(&meta_key, metadata, ttl);
        self.lock_state().counters.total_size += content.len() as u64;

        debug!("cached file: {} -> {}", original_path, blob_path.display());
        Ok(blob_path)
    }

    /// Path to a cached file, or None if it is absent or corrupt.
    ///
    /// A blob whose recomputed checksum no longer matches is purged along
    /// with its metadata (self-healing); the call then reports a plain
    /// miss. A metadata entry whose blob has vanished is purged too.
    pub fn get_cached_file(&self, key: &str) -> Option<PathBuf> {
        let meta_key = format!("file:{}", key);
        let metadata = self.get(&meta_key)?;

        let cache_path = metadata
            .get("cache_path")
            .and_then(|v| v.as_str())
            .map(PathBuf::from);

        if let Some(path) = cache_path {
            if path.exists() {
                if self.config.checksum_validation {
                    if let Some(expected) = metadata.get("checksum").and_then(|v| v.as_str()) {
                        match fs::read(&path) {
                            Ok(content) => {
                                if sha256_hex(&content) != expected {
                                    warn!(
                                        "checksum mismatch for cached file: {}",
                                        path.display()
                                    );
                                    self.delete_cached_file(key);
                                    return None;
                                }
                            }
                            Err(e) => {
                                warn!(
                                    "failed to validate cached file {}: {}",
                                    path.display(),
                                    e
                                );
                                return None;
                            }
                        }
                    }
                }
                return Some(path);
            }
        }

        // Blob is gone; drop the dangling metadata
        self.delete(&meta_key);
        None
    }

    /// Remove a cached file and its metadata; true if the entry existed
    pub fn delete_cached_file(&self, key: &str) -> bool {
        let mut state = self.lock_state();
        let meta_key = format!("file:{}", key);

        match state.entries.remove(&meta_key) {
            Some(entry) => {
                Self::remove_blob(&mut state.counters, &self.files_dir, key, &entry.data);
                debug!("deleted cached file: {}", key);
                true
            }
            None => false,
        }
    }

    /// Delete the blob behind a `file:` entry and subtract its size
    fn remove_blob(counters: &mut CacheCounters, files_dir: &Path, key: &str, metadata: &Value) {
        let path = metadata
            .get("cache_path")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_else(|| files_dir.join(format!("{}.cache", key)));

        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("failed to remove cached blob {}: {}", path.display(), e);
                return;
            }
            let size = metadata.get("size").and_then(|v| v.as_u64()).unwrap_or(0);
            counters.total_size = counters.total_size.saturating_sub(size);
        }
    }

    /// Remove one entry, blob included for `file:` keys
    fn remove_entry_locked(&self, state: &mut CacheState, key: &str) -> bool {
        match state.entries.remove(key) {
            Some(entry) => {
                if let Some(file_key) = key.strip_prefix("file:") {
                    Self::remove_blob(&mut state.counters, &self.files_dir, file_key, &entry.data);
                }
                true
            }
            None => false,
        }
    }

    // ===== EVICTION AND CLEANUP =====

    /// Evict oldest-accessed entries until the table fits `max_entries`
    fn evict_lru_locked(&self, state: &mut CacheState) -> usize {
        if state.entries.len() <= self.config.max_entries {
            return 0;
        }

        let mut order: Vec<(String, DateTime<Utc>)> = state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_accessed))
            .collect();
        order.sort_by_key(|(_, last_accessed)| *last_accessed);

        let to_remove = state.entries.len() - self.config.max_entries;
        for (key, _) in order.into_iter().take(to_remove) {
            self.remove_entry_locked(state, &key);
            state.counters.evictions += 1;
        }

        debug!("evicted {} LRU cache entries", to_remove);
        to_remove
    }

    /// Purge every expired entry; returns the count removed
    fn cleanup_expired_locked(&self, state: &mut CacheState) -> usize {
        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let mut cleaned = 0;
        for key in expired_keys {
            if self.remove_entry_locked(state, &key) {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            debug!("cleaned up {} expired cache entries", cleaned);
        }

        state.counters.last_cleanup = Some(Utc::now());
        cleaned
    }

    /// Delete blobs that no metadata entry references
    fn cleanup_orphaned_locked(&self, state: &mut CacheState) -> usize {
        let valid_names: HashSet<String> = state
            .entries
            .keys()
            .filter_map(|key| key.strip_prefix("file:"))
            .map(|file_key| format!("{}.cache", file_key))
            .collect();

        let mut orphaned = 0;
        if let Ok(dir_entries) = fs::read_dir(&self.files_dir) {
            for dir_entry in dir_entries.flatten() {
                let name = dir_entry.file_name().to_string_lossy().to_string();
                if !name.ends_with(".cache") || valid_names.contains(&name) {
                    continue;
                }

                let path = dir_entry.path();
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                match fs::remove_file(&path) {
                    Ok(()) => {
                        state.counters.total_size =
                            state.counters.total_size.saturating_sub(size);
                        orphaned += 1;
                    }
                    Err(e) => warn!("failed to remove orphaned file {}: {}", name, e),
                }
            }
        }

        if orphaned > 0 {
            debug!("cleaned up {} orphaned cache files", orphaned);
        }
        orphaned
    }

    /// Run the expiry sweep, LRU eviction and orphan sweep.
    ///
    /// Skipped wholesale (reported via `skipped`) if `cleanup_interval`
    /// has not elapsed since the previous run, unless `force`.
    pub fn cleanup(&self, force: bool) -> CleanupReport {
        let mut state = self.lock_state();

        if !force {
            if let Some(last) = state.counters.last_cleanup {
                let elapsed = (Utc::now() - last).num_seconds();
                if elapsed < self.config.cleanup_interval as i64 {
                    return CleanupReport {
                        skipped: true,
                        total_entries: state.entries.len(),
                        ..Default::default()
                    };
                }
            }
        }

        debug!("starting cache cleanup");

        let expired_cleaned = self.cleanup_expired_locked(&mut state);

        let mut evicted = 0;
        if state.entries.len() > self.config.max_entries {
            evicted = self.evict_lru_locked(&mut state);
        }

        let orphaned_cleaned = self.cleanup_orphaned_locked(&mut state);

        CleanupReport {
            skipped: false,
            expired_cleaned,
            evicted,
            orphaned_cleaned,
            total_entries: state.entries.len(),
        }
    }

    // ===== STATISTICS AND MAINTENANCE =====

    /// Current statistics, including derived hit rate and expiry counts
    pub fn get_stats(&self) -> CacheStats {
        let state = self.lock_state();

        let total_entries = state.entries.len();
        let expired_entries = state.entries.values().filter(|e| e.is_expired()).count();
        let lookups = state.counters.hits + state.counters.misses;
        let hit_rate = if lookups > 0 {
            state.counters.hits as f64 / lookups as f64
        } else {
            0.0
        };

        CacheStats {
            hits: state.counters.hits,
            misses: state.counters.misses,
            evictions: state.counters.evictions,
            total_size: state.counters.total_size,
            hit_rate,
            total_entries,
            expired_entries,
        }
    }

    /// Drop every entry and reset statistics.
    ///
    /// With `include_files` the blob directory is removed and recreated.
    pub fn clear(&self, include_files: bool) -> bool {
        let mut state = self.lock_state();

        if include_files {
            if self.files_dir.exists() {
                if let Err(e) = fs::remove_dir_all(&self.files_dir) {
                    warn!("failed to clear file cache: {}", e);
                    return false;
                }
            }
            if let Err(e) = fs::create_dir_all(&self.files_dir) {
                warn!("failed to recreate file cache directory: {}", e);
                return false;
            }
        }

        state.entries.clear();
        state.counters = CacheCounters {
            last_cleanup: Some(Utc::now()),
            ..Default::default()
        };

        debug!("cache cleared");
        true
    }

    /// Persist the entry table to `metadata/cache_index.json`.
    ///
    /// Written to a temp file and renamed into place; a failed save is
    /// logged and leaves the previous index intact.
    pub fn save(&self) -> bool {
        let index = {
            let state = self.lock_state();
            CacheIndex {
                version: INDEX_VERSION.to_string(),
                created_at: Utc::now(),
                entries: state.entries.values().cloned().collect(),
                stats: state.counters.clone(),
            }
        };

        let index_file = self.metadata_dir.join("cache_index.json");
        let temp_file = self.metadata_dir.join("cache_index.json.tmp");

        let serialized = match serde_json::to_string_pretty(&index) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to serialize cache index: {}", e);
                return false;
            }
        };

        if let Err(e) = fs::write(&temp_file, serialized) {
            warn!("failed to write cache index: {}", e);
            return false;
        }
        if let Err(e) = fs::rename(&temp_file, &index_file) {
            warn!("failed to replace cache index: {}", e);
            return false;
        }

        debug!("cache saved: {} entries", index.entries.len());
        true
    }

    /// Load the entry table from disk.
    ///
    /// Entries that fail to deserialize or are already expired are
    /// discarded; the counts are logged. Missing index is not an error.
    pub fn load(&self) -> Result<()> {
        let index_file = self.metadata_dir.join("cache_index.json");
        if !index_file.exists() {
            debug!("no existing cache index found");
            return Ok(());
        }

        let raw = fs::read_to_string(&index_file).map_err(|e| {
            AioError::IoError(format!(
                "Failed to read cache index {}: {}",
                index_file.display(),
                e
            ))
        })?;
        let index: Value = serde_json::from_str(&raw)?;

        let mut state = self.lock_state();
        let mut loaded = 0;
        let mut expired = 0;
        let mut skipped = 0;

        if let Some(entries) = index.get("entries").and_then(|v| v.as_array()) {
            for entry_value in entries {
                match serde_json::from_value::<CacheEntry>(entry_value.clone()) {
                    Ok(entry) => {
                        if entry.is_expired() {
                            expired += 1;
                            continue;
                        }
                        state.entries.insert(entry.key.clone(), entry);
                        loaded += 1;
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!("failed to load cache entry: {}", e);
                    }
                }
            }
        }

        if let Some(stats) = index.get("stats") {
            if let Ok(counters) = serde_json::from_value::<CacheCounters>(stats.clone()) {
                state.counters = counters;
            }
        }

        debug!(
            "loaded {} cache entries ({} expired, {} unreadable)",
            loaded, expired, skipped
        );
        Ok(())
    }
}

/// Deterministic cache key for a file path (truncated SHA-256 hex)
fn file_key(original_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_path.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
