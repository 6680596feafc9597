//! Source documents.

use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Attribute holding the publication timestamp.
pub const PUBLISHED: &str = "published";

static MISSING: Value = Value::Missing;

/// Requested slug is not in the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document \"{slug}\" does not exist")]
pub struct DoesNotExist {
    pub slug: String,
}

impl DoesNotExist {
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document \"{slug}\" has no attribute \"{key}\"")]
pub struct MissingAttribute {
    pub slug: String,
    pub key: String,
}

/// A single parsed source record.
///
/// Documents are immutable once built. A rescan either keeps the same
/// instance (unchanged on disk) or replaces it wholesale.
#[derive(Debug)]
pub struct Document {
    slug: String,
    slug_value: Value,
    source_path: PathBuf,
    attachment_paths: Vec<PathBuf>,
    timestamp: SystemTime,
    attributes: BTreeMap<String, Value>,
    /// Last computed path, with the pattern it was computed from.
    path: Mutex<Option<(String, Option<String>)>>,
}

impl Document {
    pub fn new(
        slug: impl Into<String>,
        source_path: impl Into<PathBuf>,
        timestamp: SystemTime,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        let slug = slug.into();
        Self {
            slug_value: Value::String(slug.clone()),
            slug,
            source_path: source_path.into(),
            attachment_paths: Vec::new(),
            timestamp,
            attributes,
            path: Mutex::new(None),
        }
    }

    /// Record the attachment files that contributed attributes.
    pub fn with_attachment_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.attachment_paths = paths;
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Attachment files read into this document, in scan order.
    pub fn attachment_paths(&self) -> &[PathBuf] {
        &self.attachment_paths
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Look up an attribute, with `slug` always available. Absent keys give
    /// [`Value::Missing`].
    pub fn get(&self, key: &str) -> &Value {
        if key == "slug" {
            return &self.slug_value;
        }
        self.attributes.get(key).unwrap_or(&MISSING)
    }

    /// Like [`Document::get`], but absence is an error.
    pub fn require(&self, key: &str) -> Result<&Value, MissingAttribute> {
        match self.get(key) {
            Value::Missing => Err(MissingAttribute {
                slug: self.slug.clone(),
                key: key.to_string(),
            }),
            value => Ok(value),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        !self.get(key).is_missing()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).as_str()
    }

    pub fn datetime(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        self.get(key).as_datetime()
    }

    pub fn published(&self) -> Option<DateTime<FixedOffset>> {
        self.datetime(PUBLISHED)
    }

    /// Text of an attribute, or an empty string when absent.
    pub fn text_or_empty(&self, key: &str) -> String {
        self.get(key).to_string()
    }

    /// Canonical path under `pattern`. The result is kept until a different
    /// pattern is asked for.
    pub fn path_with(
        &self,
        pattern: &str,
        compute: impl FnOnce(&Document) -> Option<String>,
    ) -> Option<String> {
        let mut cached = self.path.lock();
        match cached.as_ref() {
            Some((computed_for, path)) if computed_for == pattern => path.clone(),
            _ => {
                let path = compute(self);
                *cached = Some((pattern.to_string(), path.clone()));
                path
            }
        }
    }

    /// Attributes plus `slug` as a JSON object, for template contexts.
    pub fn to_context(&self) -> Map<String, JsonValue> {
        let mut context: Map<String, JsonValue> = self
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        context.insert("slug".to_string(), JsonValue::String(self.slug.clone()));
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Document {
        let mut attributes = BTreeMap::new();
        attributes.insert("title".to_string(), Value::from("A basic page"));
        attributes.insert(
            "published".to_string(),
            Value::from(Utc.with_ymd_and_hms(2015, 12, 25, 12, 30, 0).unwrap()),
        );
        Document::new("basic-page", "basic-page.toml", SystemTime::UNIX_EPOCH, attributes)
    }

    #[test]
    fn test_missing_attribute_is_value() {
        let doc = sample();
        assert!(doc.get("nope").is_missing());
        assert!(!doc.has("nope"));
        assert_eq!(doc.text_or_empty("body"), "");
    }

    #[test]
    fn test_require_errors() {
        let doc = sample();
        assert_eq!(doc.require("title").unwrap(), &Value::from("A basic page"));
        let err = doc.require("updated").unwrap_err();
        assert_eq!(err.key, "updated");
        assert_eq!(err.slug, "basic-page");
    }

    #[test]
    fn test_slug_is_an_attribute() {
        let doc = sample();
        assert_eq!(doc.get("slug"), &Value::from("basic-page"));
        assert_eq!(doc.to_context()["slug"], "basic-page");
        assert_eq!(doc.to_context()["published"], "2015-12-25T12:30:00+00:00");
    }

    #[test]
    fn test_path_is_computed_once_per_pattern() {
        let doc = sample();
        let mut calls = 0;
        let mut compute = |d: &Document| {
            calls += 1;
            Some(format!("/{}", d.slug()))
        };
        assert_eq!(
            doc.path_with("/#slug", &mut compute).as_deref(),
            Some("/basic-page")
        );
        assert_eq!(
            doc.path_with("/#slug", |_| None).as_deref(),
            Some("/basic-page")
        );
        assert_eq!(calls, 1);

        assert_eq!(
            doc.path_with("/posts/#slug", |d| Some(format!("/posts/{}", d.slug())))
                .as_deref(),
            Some("/posts/basic-page")
        );
        assert_eq!(doc.path_with("/#year/#slug", |_| None), None);
    }
}
