// All core functionality is in clo-compliance-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod judge_setup;

// Re-export core types for convenience
pub use clo_compliance_core::*;

// Re-export CLI utilities
pub use judge_setup::select_backend;

use std::path::{Path, PathBuf};

/// Default report location: `<output_dir>/compliance_report.<ext>`
pub fn default_report_path(config: &ComplianceConfig) -> PathBuf {
    Path::new(&config.paths.output_dir).join(format!("compliance_report.{}", config.report.format.extension()))
}

/// Default covenant extraction location: `<output_dir>/<document stem>_covenants.json`
pub fn default_covenants_path(config: &ComplianceConfig, document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    Path::new(&config.paths.output_dir).join(format!("{stem}_covenants.json"))
}
