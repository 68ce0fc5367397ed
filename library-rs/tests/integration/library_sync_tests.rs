// Library Sync Integration Tests
//
// Runs the whole metadata pipeline end to end with canned catalog
// sources: remote catalog -> LibraryManager -> ToolInfo table -> filter
// and search layers. Network failures are simulated through the
// CatalogSource seam.

use aio_library::{
    AioError, CatalogSource, LibraryConfig, LibraryManager, Result, ToolFilter, ToolSearchEngine,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Canned source returning a fixed catalog document
struct StaticSource {
    catalog: Value,
}

impl CatalogSource for StaticSource {
    fn fetch_catalog(&self, _url: &str) -> Result<Value> {
        Ok(self.catalog.clone())
    }
}

/// Source standing in for an HTTP 500 from the catalog host
struct FailingSource;

impl CatalogSource for FailingSource {
    fn fetch_catalog(&self, _url: &str) -> Result<Value> {
        Err(AioError::NetworkError(
            "Catalog fetch failed with status 500 Internal Server Error".to_string(),
        ))
    }
}

fn sample_catalog() -> Value {
    json!({
        "tools": [
            {
                "name": "Sunshine Server",
                "description": "Self-hosted game stream server",
                "version": "2.1.0",
                "category": "Streaming",
                "maintainer": {"name": "LizardByte"},
                "status": "verified",
                "quality_score": 9.1,
                "platforms": ["windows", "linux"],
                "tags": ["server", "streaming"],
            },
            {
                "name": "Virtual Display",
                "description": "Headless virtual display driver",
                "version": "1.0.3",
                "category": "Drivers",
                "quality_score": 6.0,
                "platforms": ["windows"],
                "tags": ["display"],
            },
            {
                "name": "Helper Scripts",
                "description": "Assorted setup helpers",
                "category": "Utilities",
                "platforms": ["all"],
            },
        ]
    })
}

fn manager_over(dir: &TempDir, source: Box<dyn CatalogSource>) -> LibraryManager {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    LibraryManager::with_source(dir.path(), LibraryConfig::default(), source).unwrap()
}

/// Catalog entries flow through sync into the filter and search layers
/// unchanged: the full pipeline agrees on the same records.
#[test]
fn sync_feeds_filter_and_search_layers() {
    let temp = TempDir::new().unwrap();
    let manager = manager_over(
        &temp,
        Box::new(StaticSource {
            catalog: sample_catalog(),
        }),
    );

    assert!(manager.sync_library_metadata());
    let tools = manager.get_available_tools();
    assert_eq!(tools.len(), 3);

    // Filter layer over the synced table
    let mut filter = ToolFilter::new();
    let filtered = filter.apply_filters(
        &tools,
        &json!({"trust_score_min": 8.0, "platforms": ["linux"]}),
    );
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, "sunshine-server");

    // Search layer over the same table
    let mut engine = ToolSearchEngine::new();
    let found = engine.search_by_name(&tools, "sunsh", true);
    assert_eq!(found[0].id, "sunshine-server");

    let found = engine.combined_search(
        &tools,
        Some("display"),
        None,
        None,
        Some("windows"),
        0.0,
        true,
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "virtual-display");
}

/// A sync failure returns false and keeps serving the previously synced
/// snapshot: availability beats freshness.
#[test]
fn failed_sync_keeps_serving_previous_snapshot() {
    let temp = TempDir::new().unwrap();

    {
        let manager = manager_over(
            &temp,
            Box::new(StaticSource {
                catalog: sample_catalog(),
            }),
        );
        assert!(manager.sync_library_metadata());
    }

    // Restart against a broken catalog host
    let manager = manager_over(&temp, Box::new(FailingSource));
    assert!(manager.initialize());

    // Stale but fully queryable
    assert_eq!(manager.get_available_tools().len(), 3);
    let tool = manager.get_tool_info("sunshine-server").unwrap();
    assert_eq!(tool.author, "LizardByte");
    assert!(tool.validated);
    assert_eq!(tool.trust_score, Some(9.1));

    // An explicit forced sync still fails loudly but changes nothing
    assert!(!manager.force_sync());
    assert_eq!(manager.get_available_tools().len(), 3);
}

/// A catalog that is valid JSON but the wrong shape aborts the sync with
/// the table untouched.
#[test]
fn malformed_catalog_aborts_sync() {
    let temp = TempDir::new().unwrap();

    {
        let manager = manager_over(
            &temp,
            Box::new(StaticSource {
                catalog: sample_catalog(),
            }),
        );
        assert!(manager.sync_library_metadata());
    }

    let manager = manager_over(
        &temp,
        Box::new(StaticSource {
            catalog: json!({"message": "rate limit exceeded"}),
        }),
    );
    assert!(manager.initialize());
    assert!(!manager.force_sync());

    // The earlier snapshot still serves
    assert_eq!(manager.get_available_tools().len(), 3);
}

/// With no snapshot and a dead source, the manager comes up empty and
/// usable rather than erroring out of every accessor.
#[test]
fn cold_start_with_dead_source_is_empty_not_broken() {
    let temp = TempDir::new().unwrap();
    let manager = manager_over(&temp, Box::new(FailingSource));

    assert!(!manager.initialize());
    assert!(manager.get_available_tools().is_empty());
    assert!(manager.get_tool_info("anything").is_none());
    assert!(!manager.is_tool_available("anything"));
    assert!(manager.get_categories().is_empty());
    assert!(manager.search_tools("query", None).is_empty());

    let status = manager.get_sync_status();
    assert_eq!(status.tool_count, 0);
    assert!(status.sync_due);
}

/// The snapshot round-trips category grouping and sync timestamps: a
/// fresh manager inside the interval does not re-sync on initialize.
#[test]
fn snapshot_restores_categories_and_sync_time() {
    let temp = TempDir::new().unwrap();

    {
        let manager = manager_over(
            &temp,
            Box::new(StaticSource {
                catalog: sample_catalog(),
            }),
        );
        assert!(manager.sync_library_metadata());
    }
    assert!(temp.path().join("library_metadata.json").exists());

    // FailingSource proves no network round trip happens on initialize
    let manager = manager_over(&temp, Box::new(FailingSource));
    assert!(manager.initialize());

    assert_eq!(
        manager.get_categories(),
        vec!["Drivers", "Streaming", "Utilities"]
    );
    assert_eq!(manager.get_tools_by_category("Streaming").len(), 1);

    let status = manager.get_sync_status();
    assert!(status.last_sync.is_some());
    assert!(!status.sync_due);
}

/// clear_cache drops both the table and the snapshot; the next restart
/// is a cold start again.
#[test]
fn clear_cache_forces_cold_start() {
    let temp = TempDir::new().unwrap();

    {
        let manager = manager_over(
            &temp,
            Box::new(StaticSource {
                catalog: sample_catalog(),
            }),
        );
        assert!(manager.sync_library_metadata());
        assert!(manager.clear_cache());
        assert!(manager.get_available_tools().is_empty());
    }
    assert!(!temp.path().join("library_metadata.json").exists());

    let manager = manager_over(&temp, Box::new(FailingSource));
    assert!(!manager.initialize());
    assert!(manager.get_available_tools().is_empty());
}

/// After clear_cache, read accessors keep serving the empty table even
/// while the catalog source works; only an explicit sync repopulates.
#[test]
fn reads_after_clear_stay_empty_until_explicit_sync() {
    let temp = TempDir::new().unwrap();
    let manager = manager_over(
        &temp,
        Box::new(StaticSource {
            catalog: sample_catalog(),
        }),
    );

    assert!(manager.sync_library_metadata());
    assert!(manager.clear_cache());

    // No lazy re-fetch behind the caller's back
    assert!(manager.get_available_tools().is_empty());
    assert!(manager.get_tool_info("sunshine-server").is_none());
    assert!(manager.search_tools("sunshine", None).is_empty());
    assert_eq!(manager.get_sync_status().tool_count, 0);

    assert!(manager.force_sync());
    assert_eq!(manager.get_available_tools().len(), 3);
}

/// A catalog update replaces the table wholesale: removed tools vanish,
/// new ones appear, nothing lingers from the previous sync.
#[test]
fn resync_replaces_table_wholesale() {
    let temp = TempDir::new().unwrap();

    let manager = manager_over(
        &temp,
        Box::new(StaticSource {
            catalog: sample_catalog(),
        }),
    );
    assert!(manager.sync_library_metadata());
    assert!(manager.is_tool_available("helper-scripts"));

    drop(manager);

    let manager = manager_over(
        &temp,
        Box::new(StaticSource {
            catalog: json!({"tools": [
                {"name": "Sunshine Server", "version": "2.2.0", "category": "Streaming"},
                {"name": "Brand New Tool", "category": "Utilities"},
            ]}),
        }),
    );
    assert!(manager.force_sync());

    assert_eq!(manager.get_available_tools().len(), 2);
    assert!(!manager.is_tool_available("helper-scripts"));
    assert!(manager.is_tool_available("brand-new-tool"));
    assert_eq!(
        manager.get_tool_info("sunshine-server").unwrap().version,
        "2.2.0"
    );
}
