//! CLI command implementations.

pub mod generate;
pub mod invalidations;
pub mod paths;
pub mod recipe;

pub use generate::generate;
pub use invalidations::invalidations;
pub use paths::list_paths;
pub use recipe::show_recipe;

use anyhow::{Context, Result};
use flourish_core::{calendar, DiagnosticSeverity, Site};
use serde_json::json;
use std::path::Path;

/// Load the site, with the publication span available to every template as
/// `global.copyright`.
pub(crate) fn open_site(source: &Path, output: &Path) -> Result<Site> {
    let site = Site::open(source, output)
        .with_context(|| format!("Failed to load site from {}", source.display()))?;
    Ok(site.with_global_context(|site| {
        json!({ "copyright": calendar::copyright_range(&site.sources()) })
    }))
}

/// Summarize what the store and queries noticed along the way. Each
/// diagnostic was already logged when it was raised.
pub(crate) fn report_diagnostics(site: &Site) {
    let diagnostics = site.diagnostics().drain();
    if diagnostics.is_empty() {
        return;
    }
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Warning)
        .count();
    tracing::info!(
        total = diagnostics.len(),
        warnings,
        "Finished with {} diagnostics",
        diagnostics.len()
    );
}
