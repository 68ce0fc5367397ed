// Cache Persistence Integration Tests
//
// Exercises the cache across process-restart boundaries: each test saves
// through one CacheManager, then opens a second manager over the same
// directory and verifies what survives. Only the public API is used.

use aio_library::{CacheConfig, CacheManager};
use serde_json::json;
use std::fs;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

/// A saved index reloads entries, file metadata and counters into a new
/// manager over the same directory.
#[test]
fn full_state_survives_restart() {
    let temp = TempDir::new().unwrap();
    let content = b"installer payload";

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        cache.set("gui:settings", json!({"theme": "dark", "scale": 1.25}), Some(86400));
        cache.set("catalog:etag", json!("W/\"abc123\""), Some(86400));
        cache
            .cache_file("downloads/tool.zip", content, Some("tool"), None, Some(86400))
            .unwrap();
        cache.get("gui:settings");
        assert!(cache.save());
    }

    let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();

    assert_eq!(
        cache.get("gui:settings"),
        Some(json!({"theme": "dark", "scale": 1.25}))
    );
    assert_eq!(cache.get("catalog:etag"), Some(json!("W/\"abc123\"")));

    let blob = cache.get_cached_file("tool").unwrap();
    assert_eq!(fs::read(blob).unwrap(), content);

    // One hit persisted from the first session, two more just recorded
    assert_eq!(cache.get_stats().hits, 4);
}

/// Entries whose TTL elapsed between save and reload are dropped during
/// load, not resurrected.
#[test]
fn expired_entries_are_dropped_on_reload() {
    let temp = TempDir::new().unwrap();

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        cache.set("short_lived", json!("gone soon"), Some(1));
        cache.set("long_lived", json!("still here"), Some(86400));
        assert!(cache.save());
    }

    sleep(Duration::from_millis(1100));

    let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
    assert!(!cache.exists("short_lived"));
    assert_eq!(cache.get("long_lived"), Some(json!("still here")));
    assert_eq!(cache.get_stats().total_entries, 1);
}

/// A blob tampered with while the process was down is caught by the
/// checksum on first read after restart and self-heals to a miss.
#[test]
fn tampered_blob_is_caught_after_restart() {
    let temp = TempDir::new().unwrap();
    let blob_path;

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        blob_path = cache
            .cache_file("downloads/tool.zip", b"trusted bytes", Some("tool"), None, Some(86400))
            .unwrap();
        assert!(cache.save());
    }

    fs::write(&blob_path, b"swapped while offline").unwrap();

    let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
    assert_eq!(cache.get_cached_file("tool"), None);
    assert!(!blob_path.exists());
    assert!(!cache.exists("file:tool"));
}

/// A corrupt index never blocks startup: the manager comes up empty and
/// fully usable, and the next save replaces the bad index.
#[test]
fn corrupt_index_recovers_to_empty_usable_cache() {
    let temp = TempDir::new().unwrap();
    let index = temp.path().join("metadata").join("cache_index.json");

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        cache.set("victim", json!("will be lost"), Some(86400));
        assert!(cache.save());
    }

    fs::write(&index, "not json at all {{{").unwrap();

    let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
    assert_eq!(cache.get_stats().total_entries, 0);

    cache.set("replacement", json!("fresh"), Some(86400));
    assert!(cache.save());

    // The rewritten index parses again
    let raw = fs::read_to_string(&index).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}

/// Repeated save/load cycles are stable: no entry duplication and no
/// drift in the entry table.
#[test]
fn repeated_cycles_are_stable() {
    let temp = TempDir::new().unwrap();

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        for i in 0..10 {
            cache.set(&format!("key_{}", i), json!(i), Some(86400));
        }
        assert!(cache.save());
    }

    for _ in 0..3 {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        assert_eq!(cache.get_stats().total_entries, 10);
        assert!(cache.save());
    }

    let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
    for i in 0..10 {
        assert_eq!(cache.get(&format!("key_{}", i)), Some(json!(i)));
    }
}

/// The entry ceiling is enforced on reload too: a manager configured
/// smaller than the saved table evicts down to its own ceiling on the
/// first over-capacity insert.
#[test]
fn smaller_ceiling_applies_after_reload() {
    let temp = TempDir::new().unwrap();

    {
        let cache = CacheManager::new(temp.path(), CacheConfig::default()).unwrap();
        for i in 0..20 {
            cache.set(&format!("key_{}", i), json!(i), Some(86400));
        }
        assert!(cache.save());
    }

    let config = CacheConfig {
        max_entries: 5,
        ..CacheConfig::default()
    };
    let cache = CacheManager::new(temp.path(), config).unwrap();

    // Load itself does not evict; the next insert triggers the sweep
    cache.set("one_more", json!("over"), Some(86400));
    assert_eq!(cache.get_stats().total_entries, 5);
    assert!(cache.exists("one_more"));
}
