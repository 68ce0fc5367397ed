//! Validation module for community tools
//!
//! Multi-level checks (minimal, standard, strict, paranoid) covering
//! metadata schema, platform compatibility, security scoring, checksums
//! and file content scanning.

pub mod result;
pub mod tool_validator;

pub use result::{ValidationLevel, ValidationResult};
pub use tool_validator::{ToolValidator, ValidatorConfig};
