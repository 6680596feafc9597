//! Show how a single path would be rendered.

use super::open_site;
use anyhow::{Context, Result};
use std::path::Path;

pub fn show_recipe(source: &Path, output: &Path, path: &str) -> Result<()> {
    let site = open_site(source, output)?;
    let recipe = site
        .recipe(path)
        .with_context(|| format!("Failed to build recipe for {path}"))?
        .with_context(|| format!("Nothing generates {path}"))?;
    println!("{}", serde_json::to_string_pretty(&recipe)?);
    Ok(())
}
