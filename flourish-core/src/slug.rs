//! Slugs: document identifiers derived from source paths.

use regex::Regex;
use std::path::{Component, Path};
use std::sync::OnceLock;

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| {
        Regex::new(r"^/?[A-Za-z0-9-]+(?:/[A-Za-z0-9-]+)*$").expect("valid slug regex")
    })
}

/// Whether an explicit slug (as found in a CSV `slug` column) is acceptable.
///
/// ```
/// use flourish_core::slug::is_valid_slug;
///
/// assert!(is_valid_slug("series/part-one"));
/// assert!(is_valid_slug("/leading-slash"));
/// assert!(!is_valid_slug("has space"));
/// assert!(!is_valid_slug("trailing/"));
/// ```
pub fn is_valid_slug(slug: &str) -> bool {
    slug_regex().is_match(slug)
}

/// Slug for a file relative to the source directory: the path with its final
/// extension removed, using `/` separators.
///
/// ```
/// use flourish_core::slug::slug_for_path;
/// use std::path::Path;
///
/// assert_eq!(slug_for_path(Path::new("series/part-one.toml")), "series/part-one");
/// assert_eq!(slug_for_path(Path::new("thing.body.markdown")), "thing.body");
/// ```
pub fn slug_for_path(relative: &Path) -> String {
    let without_extension = relative.with_extension("");
    without_extension
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
