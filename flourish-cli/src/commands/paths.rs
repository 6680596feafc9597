//! List the paths each route generates.

use super::open_site;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RoutePath {
    route: String,
    path: String,
}

pub fn list_paths(source: &Path, output: &Path, name: Option<&str>, json: bool) -> Result<()> {
    let site = open_site(source, output)?;
    let paths: Vec<RoutePath> = match name {
        Some(name) => site
            .route_paths(name)
            .with_context(|| format!("Failed to list paths for {name}"))?
            .into_iter()
            .map(|path| RoutePath {
                route: name.to_string(),
                path,
            })
            .collect(),
        None => site
            .all_paths()
            .context("Failed to list paths")?
            .into_iter()
            .map(|(route, path)| RoutePath { route, path })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        for entry in &paths {
            println!("{}\t{}", entry.path, entry.route);
        }
    }
    Ok(())
}
