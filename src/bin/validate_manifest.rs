//! Offline manifest linter.
//!
//! Usage: `validate_manifest [portal-root]` (defaults to the current
//! directory). Exits non-zero when the manifest fails schema, semantic, or
//! asset-path validation.

use std::path::PathBuf;
use std::process;

use portalsync::lint::lint_portal;

fn main() {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let report = match lint_portal(&root) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("[validate-manifest] {:#}", err);
            process::exit(1);
        }
    };

    if !report.warnings.is_empty() {
        eprintln!("[validate-manifest] Warnings:");
        for warning in &report.warnings {
            eprintln!("- {}", warning);
        }
    }

    if !report.errors.is_empty() {
        eprintln!("[validate-manifest] Validation failed:");
        for error in &report.errors {
            eprintln!("- {}", error);
        }
        process::exit(1);
    }

    println!("[validate-manifest] Validation passed.");
}
