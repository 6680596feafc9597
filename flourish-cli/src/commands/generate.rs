//! Generate command implementation.

use super::{open_site, report_diagnostics};
use crate::OutputFormat;
use anyhow::{Context, Result};
use flourish_core::Renderer;
use flourish_render::{BuiltinRenderer, JsonRenderer};
use std::path::Path;

/// Generate the whole site, or only what answers `paths`.
pub fn generate(
    source: &Path,
    output: &Path,
    format: OutputFormat,
    future: Option<bool>,
    paths: &[String],
) -> Result<()> {
    let site = open_site(source, output)?.with_future(future);
    let renderer: &dyn Renderer = match format {
        OutputFormat::Html => &BuiltinRenderer,
        OutputFormat::Json => &JsonRenderer,
    };

    let generated = if paths.is_empty() {
        site.generate_site(renderer)
            .context("Failed to generate site")?
    } else {
        let mut generated = Vec::new();
        for path in paths {
            generated.extend(
                site.generate_path(path, renderer)
                    .with_context(|| format!("Failed to generate {path}"))?,
            );
        }
        generated
    };

    report_diagnostics(&site);
    tracing::info!("Wrote {} files to {}", generated.len(), output.display());
    Ok(())
}
