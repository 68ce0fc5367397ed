//! Aggregate settings for the library core (YAML format)
//!
//! Format:
//! ```yaml
//! cache:
//!   defaultTtl: 3600
//!   maxEntries: 10000
//! validator:
//!   validationLevel: standard
//!   trustedAuthors: [LizardByte]
//! library:
//!   repositoryUrl: https://github.com/owner/repo
//!   syncInterval: 3600
//! ```
//!
//! The composition root loads one `LibrarySettings` and hands each section
//! to the component it configures; nothing here reads the environment.

use crate::cache::manager::CacheConfig;
use crate::errors::{AioError, Result};
use crate::library::manager::LibraryConfig;
use crate::validator::tool_validator::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for every component of the library core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibrarySettings {
    pub cache: CacheConfig,
    pub validator: ValidatorConfig,
    pub library: LibraryConfig,
}

impl LibrarySettings {
    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AioError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AioError::IoError(format!("Failed to read settings: {}", e)))?;

        let settings: LibrarySettings = serde_yaml::from_str(&content)
            .map_err(|e| AioError::ParseError(format!("Invalid settings YAML: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|e| {
            AioError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path.as_ref(), yaml)
            .map_err(|e| AioError::IoError(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Validate cross-field constraints.
    ///
    /// Ensures:
    /// - cache ceilings and intervals are non-zero
    /// - the repository URL is an HTTP(S) URL
    /// - the request timeout is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(AioError::ValidationError(
                "cache.maxEntries must be greater than zero".to_string(),
            ));
        }

        if self.cache.default_ttl == 0 {
            return Err(AioError::ValidationError(
                "cache.defaultTtl must be greater than zero".to_string(),
            ));
        }

        if self.library.repository_url.is_empty() {
            return Err(AioError::ValidationError(
                "library.repositoryUrl cannot be empty".to_string(),
            ));
        }

        if !self.library.repository_url.starts_with("http://")
            && !self.library.repository_url.starts_with("https://")
        {
            return Err(AioError::ValidationError(format!(
                "library.repositoryUrl must be an HTTP(S) URL, got '{}'",
                self.library.repository_url
            )));
        }

        if self.library.request_timeout == 0 {
            return Err(AioError::ValidationError(
                "library.requestTimeout must be greater than zero".to_string(),
            ));
        }

        if self.library.sync_interval == 0 {
            return Err(AioError::ValidationError(
                "library.syncInterval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
