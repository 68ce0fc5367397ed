//! Strongly-typed record for one community tool
//!
//! Catalog entries are normalized into `ToolInfo` at parse time: missing
//! fields get their defaults here, so readers never fall back per site.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One installable community tool, as held in the library table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolInfo {
    /// Stable identifier, `[a-zA-Z0-9_-]+`
    pub id: String,
    pub name: String,
    /// Semantic version, `MAJOR.MINOR.PATCH` prefix expected
    pub version: String,
    pub description: String,
    pub category: String,
    pub author: String,
    pub tags: Vec<String>,
    pub platforms: Vec<String>,
    /// Community quality signal, 0.0 to 10.0; absent means unrated
    pub trust_score: Option<f64>,
    pub validated: bool,
    pub verification_status: String,
    pub download_url: String,
    /// Declared payload size in bytes
    pub size: u64,
    /// Algorithm-prefixed hex digest, e.g. `sha256:<hex>`
    pub checksum: Option<String>,
    pub dependencies: Vec<String>,
    pub screenshots: Vec<String>,
    pub installation_type: Option<String>,
    pub last_updated: Option<String>,
    pub date_added: Option<String>,
    pub repository: Option<String>,
    pub documentation: Option<String>,
    pub license: Option<String>,
    pub language: Option<String>,
    pub github_stars: u64,
    pub github_forks: u64,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            version: "0.0.0".to_string(),
            description: String::new(),
            category: "General".to_string(),
            author: "Unknown".to_string(),
            tags: Vec::new(),
            platforms: vec!["windows".to_string()],
            trust_score: None,
            validated: false,
            verification_status: "unverified".to_string(),
            download_url: String::new(),
            size: 0,
            checksum: None,
            dependencies: Vec::new(),
            screenshots: Vec::new(),
            installation_type: None,
            last_updated: None,
            date_added: None,
            repository: None,
            documentation: None,
            license: None,
            language: None,
            github_stars: 0,
            github_forks: 0,
        }
    }
}

impl ToolInfo {
    /// Parse one entry from the remote catalog's `tools[]` array.
    ///
    /// The catalog shape differs from the internal record: `maintainer.name`
    /// becomes `author`, `status == "verified"` sets `validated`,
    /// `quality_score` becomes `trust_score` and the id is derived from the
    /// name. Entries without a usable name are rejected; every other field
    /// defaults.
    pub fn from_catalog_entry(entry: &Value) -> Option<Self> {
        let name = entry.get("name").and_then(|v| v.as_str())?.trim();
        if name.is_empty() {
            return None;
        }

        let status = entry
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unverified");

        let author = entry
            .get("maintainer")
            .and_then(|m| m.get("name"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Unknown");

        let platforms = string_array(entry.get("platforms"));
        let platforms = if platforms.is_empty() {
            vec!["windows".to_string()]
        } else {
            platforms
        };

        Some(Self {
            id: tool_id_from_name(name),
            name: name.to_string(),
            version: opt_string(entry.get("version")).unwrap_or_else(|| "0.0.0".to_string()),
            description: opt_string(entry.get("description")).unwrap_or_default(),
            category: opt_string(entry.get("category")).unwrap_or_else(|| "General".to_string()),
            author: author.to_string(),
            tags: string_array(entry.get("tags")),
            platforms,
            trust_score: entry.get("quality_score").and_then(|v| v.as_f64()),
            validated: status.eq_ignore_ascii_case("verified"),
            verification_status: status.to_string(),
            download_url: opt_string(entry.get("download_url")).unwrap_or_default(),
            size: entry.get("size").and_then(|v| v.as_u64()).unwrap_or(0),
            checksum: opt_string(entry.get("checksum")),
            dependencies: string_array(entry.get("dependencies")),
            screenshots: string_array(entry.get("screenshots")),
            installation_type: opt_string(entry.get("installation_type")),
            last_updated: opt_string(entry.get("last_activity")),
            date_added: opt_string(entry.get("added_date")),
            repository: opt_string(entry.get("repository")),
            documentation: opt_string(entry.get("documentation")),
            license: opt_string(entry.get("license")),
            language: opt_string(entry.get("language")),
            github_stars: entry.get("github_stars").and_then(|v| v.as_u64()).unwrap_or(0),
            github_forks: entry.get("github_forks").and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }

    /// True when the tool declares support for `platform`.
    ///
    /// The literal values `all` and `cross-platform` match every platform;
    /// comparisons are case-insensitive.
    pub fn matches_platform(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| {
            p.eq_ignore_ascii_case(platform)
                || p.eq_ignore_ascii_case("all")
                || p.eq_ignore_ascii_case("cross-platform")
        })
    }

    /// Flatten to the metadata shape `ToolValidator` consumes
    pub fn to_validation_metadata(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "version": self.version,
            "description": self.description,
            "author": self.author,
            "category": self.category,
            "platform_support": self.platforms,
            "download_url": self.download_url,
            "size": self.size,
            "checksum": self.checksum,
            "dependencies": self.dependencies,
            "generated_at": Utc::now().to_rfc3339(),
        })
    }
}

/// Derive a stable tool id from a display name.
///
/// Lowercased, runs of non-alphanumeric characters collapse to one dash,
/// leading/trailing dashes trimmed. "Sunshine Virtual Display!" becomes
/// "sunshine-virtual-display".
pub fn tool_id_from_name(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            id.push('-');
            last_dash = true;
        }
    }
    while id.ends_with('-') {
        id.pop();
    }
    id
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
