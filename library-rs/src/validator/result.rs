//! Validation levels and the shared result type for validator checks

use crate::errors::AioError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validation strictness levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Basic validation only
    Minimal,
    /// Standard security checks
    Standard,
    /// Enhanced security validation
    Strict,
    /// Maximum security validation
    Paranoid,
}

impl ValidationLevel {
    /// Minimum security score a tool must reach at this level
    pub fn min_security_score(&self) -> f64 {
        match self {
            Self::Minimal => 0.3,
            Self::Standard => 0.5,
            Self::Strict => 0.7,
            Self::Paranoid => 0.8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Strict => "strict",
            Self::Paranoid => "paranoid",
        }
    }
}

impl Default for ValidationLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = AioError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "strict" => Ok(Self::Strict),
            "paranoid" => Ok(Self::Paranoid),
            other => Err(AioError::ConfigError(format!(
                "Unknown validation level: {}",
                other
            ))),
        }
    }
}

/// Result of one validation pass, accumulating messages by severity
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub level: ValidationLevel,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub security_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::with_level(ValidationLevel::default())
    }

    pub fn with_level(level: ValidationLevel) -> Self {
        Self {
            is_valid: true,
            level,
            messages: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            security_score: 1.0,
            timestamp: Utc::now(),
        }
    }

    /// Add an informational message
    pub fn add_info(&mut self, message: String) {
        self.messages.push(message);
    }

    /// Add a warning; the result stays valid
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Add an error and mark the result invalid
    pub fn add_error(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }

    /// Fold a sub-check into this result.
    ///
    /// Warnings carry over unconditionally; errors and the invalid flag
    /// only when the sub-check failed. Info messages and score stay with
    /// the sub-check.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        if !other.is_valid {
            self.is_valid = false;
            self.errors.extend(other.errors);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}
