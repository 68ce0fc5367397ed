//! Multi-level validation of community tools before installation
//!
//! Checks run in stages: metadata schema, platform compatibility, security
//! scoring, file integrity (checksums, content scanning) and dependency
//! sanity. Strictness is tunable from Minimal through Paranoid.

use crate::validator::result::{ValidationLevel, ValidationResult};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static TOOL_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+").unwrap());
static DEPENDENCY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());

/// File extensions that can carry executable payloads
const DANGEROUS_EXTENSIONS: [&str; 17] = [
    ".exe", ".bat", ".cmd", ".com", ".pif", ".scr", ".vbs", ".js", ".jar", ".msi", ".dll", ".so",
    ".dylib", ".app", ".deb", ".rpm", ".pkg",
];

/// Shell/interpreter invocation patterns flagged during content scans
const SUSPICIOUS_PATTERNS: [&str; 10] = [
    r"eval\s*\(",
    r"exec\s*\(",
    r"system\s*\(",
    r"subprocess\.",
    r"os\.system",
    r"shell_exec",
    r"curl\s+.*\|\s*(sh|bash)",
    r"wget\s+.*\|\s*(sh|bash)",
    r"powershell\s+-",
    r"cmd\s*/c",
];

static SUSPICIOUS_CONTENT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SUSPICIOUS_PATTERNS
        .iter()
        .map(|pattern| {
            let compiled = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .unwrap();
            (*pattern, compiled)
        })
        .collect()
});

/// Validator tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    pub validation_level: ValidationLevel,
    /// Largest declared tool size accepted, in bytes
    pub max_file_size: u64,
    /// Authors granted a security score bonus (case-insensitive)
    pub trusted_authors: Vec<String>,
    /// Download hosts rejected outright, subdomains included
    pub blocked_domains: Vec<String>,
    /// Extra content-scan patterns; a match is an error, not a warning
    pub blocked_patterns: Vec<String>,
    pub checksum_required: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validation_level: ValidationLevel::Standard,
            max_file_size: 100 * 1024 * 1024,
            trusted_authors: Vec::new(),
            blocked_domains: Vec::new(),
            blocked_patterns: Vec::new(),
            checksum_required: true,
        }
    }
}

/// Staged validator for tool metadata and payloads
pub struct ToolValidator {
    config: ValidatorConfig,
}

impl ToolValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        debug!(
            "tool validator initialized with level: {}",
            config.validation_level
        );
        Self { config }
    }

    /// Current validation configuration
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Replace the validation configuration
    pub fn set_config(&mut self, config: ValidatorConfig) {
        debug!("validation configuration updated");
        self.config = config;
    }

    /// Run every validation stage against a tool.
    ///
    /// Schema problems short-circuit the rest. Warnings from later stages
    /// always accumulate; errors only when the stage failed. The security
    /// score comes from the security stage.
    ///
    /// # Arguments
    /// * `metadata` - Tool metadata object
    /// * `files` - Local payload files, when already downloaded
    ///
    /// # Returns
    /// Combined result across all stages
    pub fn validate_tool(&self, metadata: &Value, files: Option<&[PathBuf]>) -> ValidationResult {
        let mut result = ValidationResult::with_level(self.config.validation_level);
        let tool_id = metadata
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        debug!("validating tool: {}", tool_id);

        let schema_result = self.validate_schema(metadata);
        if !schema_result.is_valid {
            result.errors.extend(schema_result.errors);
            result.warnings.extend(schema_result.warnings);
            result.is_valid = false;
            warn!("tool {} failed schema validation", tool_id);
            return result;
        }

        result.merge(self.validate_platform_compatibility(metadata));

        let security_result = self.validate_security(metadata, files);
        result.security_score = security_result.security_score;
        result.merge(security_result);

        if let Some(paths) = files {
            result.merge(self.validate_files(paths, metadata));
        }

        result.merge(self.validate_dependencies(metadata));

        if result.is_valid {
            result.add_info("Tool validation completed successfully".to_string());
            debug!("tool {} validation passed", tool_id);
        } else {
            warn!("tool {} validation failed", tool_id);
        }

        result
    }

    /// Validate metadata shape: required fields, field types, id and
    /// version formats, download URL protocol, dangerous keys.
    pub fn validate_schema(&self, metadata: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        for field in ["id", "name", "version"] {
            if metadata.get(field).is_none() {
                result.add_error(format!("Missing required field: {}", field));
            }
        }

        check_field_constraints(metadata, &mut result);

        if let Some(id) = metadata.get("id").and_then(|v| v.as_str()) {
            if !id.is_empty() && !TOOL_ID_PATTERN.is_match(id) {
                result.add_error(format!("Invalid tool id format: {}", id));
            }
        }

        if let Some(version) = metadata.get("version").and_then(|v| v.as_str()) {
            if !version.is_empty() && !VERSION_PATTERN.is_match(version) {
                result.add_warning(format!("Invalid version format: {}", version));
            }
        }

        if let Some(url) = metadata.get("download_url").and_then(|v| v.as_str()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(format!("Unsupported download URL protocol: {}", url));
            }
        }

        for field in ["executable", "command", "script", "run"] {
            if metadata.get(field).is_some() {
                result.add_warning(format!(
                    "Tool contains potentially dangerous field: {}",
                    field
                ));
            }
        }

        if result.is_valid {
            result.add_info("Schema validation passed".to_string());
        }

        result
    }

    /// Check the tool supports the current platform.
    ///
    /// A missing or empty `platform_support` list is a warning, not a
    /// failure. `all` matches everything; platform names compare
    /// case-insensitively.
    pub fn validate_platform_compatibility(&self, metadata: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let supported: Vec<String> = metadata
            .get("platform_support")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if supported.is_empty() {
            result.add_warning("No platform support specified".to_string());
            return result;
        }

        let platform_name = current_platform();
        let is_supported = supported
            .iter()
            .any(|p| p.eq_ignore_ascii_case("all") || p.eq_ignore_ascii_case(platform_name));

        if is_supported {
            result.add_info(format!("Platform compatibility confirmed: {}", platform_name));
        } else {
            result.add_error(format!(
                "Tool not compatible with current platform: {}. Supported: {:?}",
                platform_name, supported
            ));
        }

        for entry in &supported {
            if !matches!(
                entry.to_lowercase().as_str(),
                "windows" | "linux" | "macos" | "all"
            ) {
                result.add_warning(format!("Unknown platform: {}", entry));
            }
        }

        result
    }

    /// Score the tool's trustworthiness from 0.0 to 1.0.
    ///
    /// Starts at 1.0 and applies signed deltas for author trust, dangerous
    /// metadata keys, suspicious description words, dangerous file
    /// extensions, oversize payloads and the configured strictness. A
    /// score below the level's minimum fails validation.
    pub fn validate_security(&self, metadata: &Value, files: Option<&[PathBuf]>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut score: f64 = 1.0;

        let author = metadata
            .get("author")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        let trusted = self
            .config
            .trusted_authors
            .iter()
            .any(|a| a.to_lowercase() == author);

        if trusted {
            result.add_info(format!("Tool from trusted author: {}", author));
            score += 0.1;
        } else if author.is_empty() || author == "unknown" {
            result.add_warning("Tool has unknown or missing author".to_string());
            score -= 0.1;
        }

        for key in ["executable", "command", "script", "run", "install_command"] {
            if metadata.get(key).is_some() {
                result.add_warning(format!(
                    "Tool metadata contains potentially dangerous key: {}",
                    key
                ));
                score -= 0.05;
            }
        }

        let description = metadata
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        for word in ["hack", "crack", "bypass", "exploit", "backdoor", "malware"] {
            if description.contains(word) {
                result.add_warning(format!(
                    "Tool description contains suspicious word: {}",
                    word
                ));
                score -= 0.1;
            }
        }

        if let Some(paths) = files {
            let dangerous: Vec<String> = paths
                .iter()
                .filter(|p| has_dangerous_extension(p))
                .map(|p| p.display().to_string())
                .collect();
            score -= 0.2 * dangerous.len() as f64;
            if !dangerous.is_empty() {
                result.add_warning(format!(
                    "Tool contains potentially dangerous files: {:?}",
                    dangerous
                ));
            }
        }

        let size = metadata.get("size").and_then(|v| v.as_u64()).unwrap_or(0);
        if size > self.config.max_file_size {
            result.add_error(format!(
                "Tool size ({} bytes) exceeds maximum allowed ({} bytes)",
                size, self.config.max_file_size
            ));
            score -= 0.3;
        }

        if let Some(url) = metadata.get("download_url").and_then(|v| v.as_str()) {
            if let Some(host) = download_host(url) {
                if self.is_blocked_host(&host) {
                    result.add_error(format!("Download URL host is blocked: {}", host));
                }
            }
        }

        score -= match self.config.validation_level {
            ValidationLevel::Strict => 0.05,
            ValidationLevel::Paranoid => 0.1,
            _ => 0.0,
        };

        let score = score.clamp(0.0, 1.0);
        result.security_score = score;

        let minimum = self.config.validation_level.min_security_score();
        if score < minimum {
            result.add_error(format!(
                "Security score {:.2} below minimum {:.2}",
                score, minimum
            ));
        } else {
            result.add_info(format!("Security validation passed (score: {:.2})", score));
        }

        result
    }

    /// Validate payload files: existence, checksums when required and
    /// content scanning at Strict or Paranoid.
    pub fn validate_files(&self, paths: &[PathBuf], metadata: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let missing: Vec<String> = paths
            .iter()
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            result.add_error(format!("Missing files: {:?}", missing));
            return result;
        }

        if self.config.checksum_required {
            result.merge(self.validate_checksums(paths, metadata));
        }

        if matches!(
            self.config.validation_level,
            ValidationLevel::Strict | ValidationLevel::Paranoid
        ) {
            result.merge(self.scan_file_contents(paths));
        }

        result
    }

    /// Compare a combined SHA-256 over all files against the declared
    /// checksum.
    ///
    /// Files are hashed in sorted path order, streamed in 8 KiB chunks.
    /// An `sha256:` prefix on the declared value is accepted. No declared
    /// checksum is a warning only.
    pub fn validate_checksums(&self, paths: &[PathBuf], metadata: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let expected = match metadata.get("checksum").and_then(|v| v.as_str()) {
            Some(c) if !c.is_empty() => c.trim_start_matches("sha256:").to_lowercase(),
            _ => {
                result.add_warning("No checksum provided in metadata".to_string());
                return result;
            }
        };

        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        for path in sorted {
            let mut file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    result.add_error(format!("Error reading file {}: {}", path.display(), e));
                    return result;
                }
            };

            let mut buffer = [0u8; 8192];
            loop {
                match file.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => hasher.update(&buffer[..n]),
                    Err(e) => {
                        result.add_error(format!(
                            "Error reading file {}: {}",
                            path.display(),
                            e
                        ));
                        return result;
                    }
                }
            }
        }

        let calculated = hex::encode(hasher.finalize());
        if calculated == expected {
            result.add_info("Checksum validation passed".to_string());
        } else {
            result.add_error(format!(
                "Checksum mismatch. Expected: {}, Got: {}",
                expected, calculated
            ));
        }

        result
    }

    /// Scan text files for suspicious invocation patterns (warnings) and
    /// configured blocked patterns (errors). Binary files are skipped.
    pub fn scan_file_contents(&self, paths: &[PathBuf]) -> ValidationResult {
        let mut result = ValidationResult::new();

        let mut blocked: Vec<(&str, Regex)> = Vec::new();
        for pattern in &self.config.blocked_patterns {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => blocked.push((pattern.as_str(), re)),
                Err(e) => result.add_warning(format!("Invalid blocked pattern {}: {}", pattern, e)),
            }
        }

        for path in paths {
            if is_binary_file(path) {
                continue;
            }

            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    result.add_warning(format!(
                        "Error scanning file {}: {}",
                        path.display(),
                        e
                    ));
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);

            for (pattern, re) in SUSPICIOUS_CONTENT_PATTERNS.iter() {
                if re.is_match(&content) {
                    result.add_warning(format!(
                        "Suspicious pattern found in {}: {}",
                        path.display(),
                        pattern
                    ));
                }
            }

            for (pattern, re) in &blocked {
                if re.is_match(&content) {
                    result.add_error(format!(
                        "Blocked pattern found in {}: {}",
                        path.display(),
                        pattern
                    ));
                }
            }
        }

        result
    }

    /// Sanity-check the dependency list: names, types and count
    pub fn validate_dependencies(&self, metadata: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let dependencies = match metadata.get("dependencies").and_then(|v| v.as_array()) {
            Some(deps) if !deps.is_empty() => deps,
            _ => {
                result.add_info("No dependencies specified".to_string());
                return result;
            }
        };

        for dep in dependencies {
            match dep.as_str() {
                Some(name) => {
                    if !DEPENDENCY_PATTERN.is_match(name) {
                        result.add_warning(format!("Suspicious dependency name: {}", name));
                    }
                }
                None => result.add_error(format!("Invalid dependency format: {}", dep)),
            }
        }

        if dependencies.len() > 20 {
            result.add_warning(format!(
                "Tool has excessive dependencies ({})",
                dependencies.len()
            ));
        }

        result.add_info(format!(
            "Dependencies validation completed ({} deps)",
            dependencies.len()
        ));
        result
    }

    /// Fast accept/reject without allocating a full result: required
    /// fields, id format and platform compatibility only.
    pub fn quick_validate(&self, metadata: &Value) -> bool {
        for field in ["id", "name", "version"] {
            if metadata.get(field).is_none() {
                return false;
            }
        }

        let tool_id = metadata.get("id").and_then(|v| v.as_str()).unwrap_or("");
        if !TOOL_ID_PATTERN.is_match(tool_id) {
            return false;
        }

        self.validate_platform_compatibility(metadata).is_valid
    }

    fn is_blocked_host(&self, host: &str) -> bool {
        self.config.blocked_domains.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        })
    }
}

impl Default for ToolValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

fn check_field_constraints(metadata: &Value, result: &mut ValidationResult) {
    for field in ["id", "name", "description", "author", "category", "version"] {
        if let Some(value) = metadata.get(field) {
            match value.as_str() {
                Some(s) => {
                    if s.trim().is_empty() && (field == "id" || field == "name") {
                        result.add_error(format!("Field {} cannot be empty", field));
                    }
                }
                None => result.add_error(format!("Field {} must be a string", field)),
            }
        }
    }

    for field in ["platform_support", "dependencies", "files", "tags"] {
        if let Some(value) = metadata.get(field) {
            if !value.is_array() {
                result.add_error(format!("Field {} must be an array", field));
            }
        }
    }

    if let Some(value) = metadata.get("size") {
        if !value.is_number() {
            result.add_error("Field size must be numeric".to_string());
        } else if value.as_f64().map(|n| n < 0.0).unwrap_or(false) {
            result.add_error("Field size cannot be negative".to_string());
        }
    }
}

/// Current OS normalized to the catalog's platform names
fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "linux" => "linux",
        "macos" => "macos",
        _ => "unknown",
    }
}

fn has_dangerous_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let dotted = format!(".{}", ext.to_lowercase());
            DANGEROUS_EXTENSIONS.contains(&dotted.as_str())
        }
        None => false,
    }
}

/// Lowercased host of a download URL, when one parses
fn download_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// NUL byte in the first 8 KiB marks a file as binary
fn is_binary_file(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return true,
    };

    let mut buffer = [0u8; 8192];
    match file.read(&mut buffer) {
        Ok(n) => buffer[..n].contains(&0),
        Err(_) => true,
    }
}
