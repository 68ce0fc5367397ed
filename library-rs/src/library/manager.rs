//! Catalog synchronization and the in-memory tool table
//!
//! `LibraryManager` fetches the remote catalog through a `CatalogSource`,
//! normalizes entries into `ToolInfo`, and persists a local snapshot. Sync
//! failures leave the previous state untouched; read accessors lazily
//! initialize from the snapshot on first use.

use crate::errors::{AioError, Result};
use crate::library::tool_info::ToolInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Library sync tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryConfig {
    /// GitHub repository hosting the community catalog
    pub repository_url: String,
    /// Seconds between automatic catalog syncs
    pub sync_interval: u64,
    /// HTTP request timeout in seconds
    pub request_timeout: u64,
    pub user_agent: String,
    pub max_retries: u32,
    /// Run quick validation on parsed entries during sync
    pub validation_enabled: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            repository_url: "https://github.com/LeGeRyChEeSe/Sunshine-AIO-Library".to_string(),
            sync_interval: 3600,
            request_timeout: 30,
            user_agent: "Sunshine-AIO/1.0".to_string(),
            max_retries: 3,
            validation_enabled: true,
        }
    }
}

/// Sync state reported by `get_sync_status`
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_due: bool,
    pub tool_count: usize,
    pub repository_url: String,
}

/// Capability seam for fetching the remote catalog document.
///
/// The production implementation is an HTTP client; tests substitute
/// canned or failing sources.
pub trait CatalogSource: Send + Sync {
    fn fetch_catalog(&self, url: &str) -> Result<Value>;
}

/// Blocking HTTP catalog source with timeout and user agent
pub struct HttpCatalogSource {
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| AioError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch_catalog(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(AioError::NetworkError(format!(
                "Catalog fetch failed with status {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .map_err(|e| AioError::ParseError(format!("Catalog is not valid JSON: {}", e)))
    }
}

struct LibraryState {
    tools: HashMap<String, ToolInfo>,
    /// category name -> tool ids
    categories: HashMap<String, Vec<String>>,
    last_sync: Option<DateTime<Utc>>,
    initialized: bool,
}

/// Community library metadata manager
pub struct LibraryManager {
    library_dir: PathBuf,
    config: LibraryConfig,
    source: Box<dyn CatalogSource>,
    state: Mutex<LibraryState>,
}

impl LibraryManager {
    /// Create a manager persisting its snapshot under `library_dir`, with
    /// the default HTTP catalog source.
    pub fn new(library_dir: impl AsRef<Path>, config: LibraryConfig) -> Result<Self> {
        let source = HttpCatalogSource::new(config.request_timeout, &config.user_agent)?;
        Self::with_source(library_dir, config, Box::new(source))
    }

    /// Create a manager with an explicit catalog source
    pub fn with_source(
        library_dir: impl AsRef<Path>,
        config: LibraryConfig,
        source: Box<dyn CatalogSource>,
    ) -> Result<Self> {
        let library_dir = library_dir.as_ref().to_path_buf();
        fs::create_dir_all(&library_dir).map_err(|e| {
            AioError::IoError(format!(
                "Failed to create library directory {}: {}",
                library_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            library_dir,
            config,
            source,
            state: Mutex::new(LibraryState {
                tools: HashMap::new(),
                categories: HashMap::new(),
                last_sync: None,
                initialized: false,
            }),
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot_path(&self) -> PathBuf {
        self.library_dir.join("library_metadata.json")
    }

    /// Load the snapshot from disk and sync if stale.
    ///
    /// Safe to call repeatedly; only the first call does work. Returns
    /// false when a needed sync failed, though a stale snapshot may still
    /// have been loaded and remains served.
    pub fn initialize(&self) -> bool {
        {
            let state = self.lock_state();
            if state.initialized {
                return true;
            }
        }

        if let Err(e) = self.load_snapshot() {
            debug!("no usable library snapshot: {}", e);
        }

        let mut ok = true;
        if self.should_sync() {
            ok = self.sync_library_metadata();
        }

        self.lock_state().initialized = true;
        ok
    }

    fn ensure_initialized(&self) {
        self.initialize();
    }

    /// True when the catalog has never synced or the interval has elapsed
    fn should_sync(&self) -> bool {
        let state = self.lock_state();
        match state.last_sync {
            None => true,
            Some(last) => (Utc::now() - last).num_seconds() >= self.config.sync_interval as i64,
        }
    }

    /// Fetch, normalize and atomically adopt the remote catalog.
    ///
    /// Any network, JSON or shape failure returns false with the previous
    /// in-memory table and on-disk snapshot untouched.
    pub fn sync_library_metadata(&self) -> bool {
        let url = match derive_catalog_url(&self.config.repository_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("cannot derive catalog URL: {}", e);
                return false;
            }
        };

        debug!("syncing library metadata from {}", url);

        let catalog = match self.source.fetch_catalog(&url) {
            Ok(value) => value,
            Err(e) => {
                warn!("library sync failed: {}", e);
                return false;
            }
        };

        let entries = match catalog.get("tools").and_then(|v| v.as_array()) {
            Some(entries) => entries,
            None => {
                warn!("catalog has no tools array; sync aborted");
                return false;
            }
        };

        // Build the replacement table completely before touching state
        let mut tools: HashMap<String, ToolInfo> = HashMap::new();
        let mut skipped = 0;
        for entry in entries {
            match ToolInfo::from_catalog_entry(entry) {
                Some(tool) => {
                    tools.insert(tool.id.clone(), tool);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("skipped {} unparseable catalog entries", skipped);
        }

        let categories = group_by_category(&tools);
        let now = Utc::now();

        {
            let mut state = self.lock_state();
            state.tools = tools;
            state.categories = categories;
            state.last_sync = Some(now);
        }

        if !self.save_snapshot() {
            warn!("library snapshot save failed; in-memory table remains current");
        }

        info!(
            "library sync complete: {} tools",
            self.lock_state().tools.len()
        );
        true
    }

    /// Sync immediately, ignoring the interval
    pub fn force_sync(&self) -> bool {
        self.ensure_initialized();
        self.sync_library_metadata()
    }

    // ===== READ ACCESSORS =====

    /// All tools, in no particular order
    pub fn get_available_tools(&self) -> Vec<ToolInfo> {
        self.ensure_initialized();
        self.lock_state().tools.values().cloned().collect()
    }

    pub fn get_tool_info(&self, id: &str) -> Option<ToolInfo> {
        self.ensure_initialized();
        self.lock_state().tools.get(id).cloned()
    }

    pub fn is_tool_available(&self, id: &str) -> bool {
        self.ensure_initialized();
        self.lock_state().tools.contains_key(id)
    }

    /// Case-insensitive substring search over id, name and description,
    /// optionally narrowed to one category.
    pub fn search_tools(&self, query: &str, category: Option<&str>) -> Vec<ToolInfo> {
        self.ensure_initialized();
        let query = query.to_lowercase();
        let state = self.lock_state();

        state
            .tools
            .values()
            .filter(|tool| {
                if let Some(category) = category {
                    if !tool.category.eq_ignore_ascii_case(category) {
                        return false;
                    }
                }
                query.is_empty()
                    || tool.id.to_lowercase().contains(&query)
                    || tool.name.to_lowercase().contains(&query)
                    || tool.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    /// Sorted category names
    pub fn get_categories(&self) -> Vec<String> {
        self.ensure_initialized();
        let state = self.lock_state();
        let mut categories: Vec<String> = state.categories.keys().cloned().collect();
        categories.sort();
        categories
    }

    pub fn get_tools_by_category(&self, category: &str) -> Vec<ToolInfo> {
        self.ensure_initialized();
        let state = self.lock_state();
        state
            .categories
            .get(category)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tools.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_verified_tools(&self) -> Vec<ToolInfo> {
        self.ensure_initialized();
        self.lock_state()
            .tools
            .values()
            .filter(|t| t.validated)
            .cloned()
            .collect()
    }

    /// All tools, highest trust score first; unrated tools rank last
    pub fn get_tools_sorted_by_quality(&self) -> Vec<ToolInfo> {
        self.ensure_initialized();
        let mut tools: Vec<ToolInfo> = self.lock_state().tools.values().cloned().collect();
        tools.sort_by(|a, b| {
            let a = a.trust_score.unwrap_or(0.0);
            let b = b.trust_score.unwrap_or(0.0);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        tools
    }

    pub fn get_sync_status(&self) -> SyncStatus {
        let sync_due = self.should_sync();
        let state = self.lock_state();
        SyncStatus {
            last_sync: state.last_sync,
            sync_due,
            tool_count: state.tools.len(),
            repository_url: self.config.repository_url.clone(),
        }
    }

    /// Drop the in-memory table and the on-disk snapshot.
    ///
    /// Reads after a clear serve the empty table; the catalog is not
    /// re-fetched until an explicit `sync_library_metadata` or
    /// `force_sync`.
    pub fn clear_cache(&self) -> bool {
        let snapshot = self.snapshot_path();
        if snapshot.exists() {
            if let Err(e) = fs::remove_file(&snapshot) {
                warn!("failed to remove library snapshot: {}", e);
                return false;
            }
        }

        let mut state = self.lock_state();
        state.tools.clear();
        state.categories.clear();
        state.last_sync = None;
        state.initialized = true;

        debug!("library cache cleared");
        true
    }

    // ===== SNAPSHOT PERSISTENCE =====

    /// Write the snapshot via temp-then-rename; failures are logged
    fn save_snapshot(&self) -> bool {
        let snapshot = {
            let state = self.lock_state();
            json!({
                "last_updated": state.last_sync.map(|t| t.to_rfc3339()),
                "tools": state.tools,
                "categories": state.categories.iter().map(|(name, ids)| {
                    (name.clone(), json!({"name": name, "tools": ids}))
                }).collect::<serde_json::Map<String, Value>>(),
                "repository_info": {
                    "url": self.config.repository_url,
                    "total_tools": state.tools.len(),
                },
            })
        };

        let path = self.snapshot_path();
        let temp = self.library_dir.join("library_metadata.json.tmp");

        let serialized = match serde_json::to_string_pretty(&snapshot) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to serialize library snapshot: {}", e);
                return false;
            }
        };

        if let Err(e) = fs::write(&temp, serialized) {
            warn!("failed to write library snapshot: {}", e);
            return false;
        }
        if let Err(e) = fs::rename(&temp, &path) {
            warn!("failed to replace library snapshot: {}", e);
            return false;
        }

        debug!("library snapshot saved: {}", path.display());
        true
    }

    /// Load the snapshot, re-seeding `last_sync` from its `last_updated`
    fn load_snapshot(&self) -> Result<()> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Err(AioError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let raw = fs::read_to_string(&path)
            .map_err(|e| AioError::IoError(format!("Failed to read library snapshot: {}", e)))?;
        let snapshot: Value = serde_json::from_str(&raw)?;

        let mut tools: HashMap<String, ToolInfo> = HashMap::new();
        let mut skipped = 0;
        if let Some(entries) = snapshot.get("tools").and_then(|v| v.as_object()) {
            for (id, value) in entries {
                match serde_json::from_value::<ToolInfo>(value.clone()) {
                    Ok(tool) => {
                        tools.insert(id.clone(), tool);
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!("skipping unreadable snapshot tool {}: {}", id, e);
                    }
                }
            }
        }
        if skipped > 0 {
            warn!("skipped {} unreadable snapshot tools", skipped);
        }

        let last_sync = snapshot
            .get("last_updated")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let categories = group_by_category(&tools);

        let mut state = self.lock_state();
        debug!("loaded library snapshot: {} tools", tools.len());
        state.tools = tools;
        state.categories = categories;
        state.last_sync = last_sync;

        Ok(())
    }
}

/// Raw-content URL for the catalog, derived from a GitHub repository URL
fn derive_catalog_url(repository_url: &str) -> Result<String> {
    let trimmed = repository_url
        .trim_end_matches('/')
        .trim_end_matches(".git");

    let rest = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .ok_or_else(|| {
            AioError::ConfigError(format!("Not a GitHub repository URL: {}", repository_url))
        })?;

    let mut parts = rest.split('/');
    let owner = parts.next().filter(|s| !s.is_empty());
    let repo = parts.next().filter(|s| !s.is_empty());

    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok(format!(
            "https://raw.githubusercontent.com/{}/{}/main/tools.json",
            owner, repo
        )),
        _ => Err(AioError::ConfigError(format!(
            "Repository URL missing owner/repo: {}",
            repository_url
        ))),
    }
}

fn group_by_category(tools: &HashMap<String, ToolInfo>) -> HashMap<String, Vec<String>> {
    let mut categories: HashMap<String, Vec<String>> = HashMap::new();
    for tool in tools.values() {
        categories
            .entry(tool.category.clone())
            .or_default()
            .push(tool.id.clone());
    }
    // Deterministic order inside each category
    for ids in categories.values_mut() {
        ids.sort();
    }
    categories
}
