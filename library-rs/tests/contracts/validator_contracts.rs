// Validator Contract Tests
//
// These tests pin the trust-gate invariants: errors force invalidity,
// security scoring is monotone under added penalties, and checksum
// validation flips on any byte change.

use aio_library::{ToolValidator, ValidatorConfig};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

/// WHY: Appending an error must force is_valid = false; warnings and
/// messages must never change validity. Callers branch on is_valid, so
/// any drift here silently admits bad tools.
#[test]
fn errors_invalidate_warnings_do_not() {
    let validator = ToolValidator::default();

    // Warning-only outcome stays valid
    let result = validator.validate_schema(&json!({
        "id": "tool",
        "name": "Tool",
        "version": "not-semver",
    }));
    assert!(result.is_valid);
    assert!(!result.warnings.is_empty());

    // One error flips it
    let result = validator.validate_schema(&json!({
        "id": "tool",
        "version": "1.0.0",
    }));
    assert!(!result.is_valid);
    assert!(!result.errors.is_empty());
}

/// WHY: The security score must be monotonically non-increasing as
/// penalty conditions are added to otherwise-identical metadata. A
/// penalty that raises the score would invert the trust gate.
#[test]
fn security_score_is_monotone_under_penalties() {
    let validator = ToolValidator::default();

    let mut metadata = json!({
        "id": "tool",
        "name": "Tool",
        "version": "1.0.0",
        "author": "someone",
        "description": "A fine tool",
    });
    let mut last_score = validator.validate_security(&metadata, None).security_score;

    // Each step adds one penalty condition and may only lower the score
    metadata["author"] = json!("unknown");
    let score = validator.validate_security(&metadata, None).security_score;
    assert!(score <= last_score);
    last_score = score;

    metadata["script"] = json!("setup.ps1");
    let score = validator.validate_security(&metadata, None).security_score;
    assert!(score <= last_score);
    last_score = score;

    metadata["description"] = json!("A fine tool to bypass things");
    let score = validator.validate_security(&metadata, None).security_score;
    assert!(score <= last_score);
    last_score = score;

    metadata["description"] = json!("hack crack bypass exploit");
    let score = validator.validate_security(&metadata, None).security_score;
    assert!(score <= last_score);

    // And it never leaves [0, 1]
    assert!((0.0..=1.0).contains(&score));
}

/// WHY: Minimal clean metadata must validate with a security score in
/// [0.8, 1.0] - no penalties triggered beyond the named author baseline.
#[test]
fn clean_minimal_metadata_validates_high() {
    let validator = ToolValidator::default();
    let result = validator.validate_tool(
        &json!({
            "id": "t1",
            "name": "Tool",
            "version": "1.0.0",
            "author": "someone",
            "download_url": "https://x/t.zip",
        }),
        None,
    );

    assert!(result.is_valid);
    assert!(result.security_score >= 0.8);
    assert!(result.security_score <= 1.0);
}

/// WHY: Hostile metadata (path-traversal id, script-injection name,
/// javascript: URL) must be rejected with errors naming the id format
/// and the URL protocol.
#[test]
fn hostile_metadata_is_rejected_with_named_errors() {
    let validator = ToolValidator::default();
    let result = validator.validate_tool(
        &json!({
            "id": "../../etc",
            "name": "<script>",
            "download_url": "javascript:alert(1)",
        }),
        None,
    );

    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|e| e.contains("Invalid tool id")));
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("download URL protocol")));
}

/// WHY: validate_checksums must flip from valid to invalid when the file
/// bytes change under a fixed declared checksum. Symmetry: the same
/// declaration accepts the original bytes and rejects any other bytes.
#[test]
fn checksum_validation_flips_on_byte_change() {
    let validator = ToolValidator::default();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("payload.bin");

    fs::write(&file, b"original bytes").unwrap();

    // Declare the checksum of the original content
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"original bytes");
    let declared = hex::encode(hasher.finalize());
    let metadata = json!({"checksum": declared});

    let paths = vec![file.clone()];
    assert!(validator.validate_checksums(&paths, &metadata).is_valid);

    // Swap the bytes, hold the declaration fixed
    fs::write(&file, b"replaced bytes").unwrap();
    let result = validator.validate_checksums(&paths, &metadata);
    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|e| e.contains("Checksum mismatch")));
}

/// WHY: Per-level minimum thresholds gate the same score differently: a
/// mid-range score passes minimal and fails paranoid. The level knob must
/// actually move the gate.
#[test]
fn level_thresholds_gate_the_same_metadata_differently() {
    // 1.0 - 0.1 (unknown author) - 0.3 (suspicious words) = 0.6 baseline
    let metadata = json!({
        "id": "tool",
        "name": "Tool",
        "version": "1.0.0",
        "description": "hack crack bypass",
    });

    let minimal = ToolValidator::new(ValidatorConfig {
        validation_level: "minimal".parse().unwrap(),
        ..ValidatorConfig::default()
    });
    assert!(minimal.validate_security(&metadata, None).is_valid);

    let paranoid = ToolValidator::new(ValidatorConfig {
        validation_level: "paranoid".parse().unwrap(),
        ..ValidatorConfig::default()
    });
    assert!(!paranoid.validate_security(&metadata, None).is_valid);
}

/// WHY: Metadata missing every optional field must still resolve its
/// required-field check deterministically, listing exactly the missing
/// required fields.
#[test]
fn missing_required_fields_are_listed_exactly() {
    let validator = ToolValidator::default();
    let result = validator.validate_schema(&json!({}));

    assert!(!result.is_valid);
    for field in ["id", "name", "version"] {
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.contains(&format!("Missing required field: {}", field))),
            "expected missing-field error for {}",
            field
        );
    }
    assert_eq!(result.errors.len(), 3);
}

/// WHY: quick_validate is the fast-path admission filter; it must agree
/// with full validation on the checks it covers.
#[test]
fn quick_validate_agrees_with_full_validation() {
    let validator = ToolValidator::default();

    let good = json!({
        "id": "fast-tool",
        "name": "Fast",
        "version": "0.1.0",
        "platform_support": ["all"],
    });
    assert!(validator.quick_validate(&good));
    assert!(validator.validate_tool(&good, None).is_valid);

    let bad_id = json!({"id": "../bad", "name": "Bad", "version": "0.1.0"});
    assert!(!validator.quick_validate(&bad_id));
    assert!(!validator.validate_tool(&bad_id, None).is_valid);
}
