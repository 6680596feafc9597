//! Collapse generated paths into cache invalidations.

use super::open_site;
use anyhow::{Context, Result};
use flourish_core::DirTrie;
use std::path::Path;

/// Print at most `max` paths covering `paths`, or every generated path.
pub fn invalidations(source: &Path, output: &Path, max: usize, paths: &[String]) -> Result<()> {
    let paths = if paths.is_empty() {
        let site = open_site(source, output)?;
        site.all_paths()
            .context("Failed to list paths")?
            .into_iter()
            .map(|(_, path)| path)
            .collect()
    } else {
        paths.to_vec()
    };

    let mut trie = DirTrie::new();
    for path in &paths {
        trie.insert(path)?;
    }
    for path in trie.collapse(max) {
        println!("{path}");
    }
    Ok(())
}
