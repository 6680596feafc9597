//! Site and route configuration.
//!
//! `_site.toml` holds flat site-wide settings; `generate.toml` lists the
//! routes to generate as `[[paths]]` tables.

use crate::query::QueryError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const SITE_CONFIG_FILE: &str = "_site.toml";
pub const ROUTES_FILE: &str = "generate.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required key \"{0}\" in _site.toml")]
    MissingKey(String),

    #[error("Key \"{key}\" in _site.toml must be {expected}")]
    InvalidKey { key: String, expected: &'static str },

    #[error("Route \"{route}\": filter \"{key}\" must be a plain value or list")]
    InvalidFilter { route: String, key: String },

    #[error("Route \"{route}\": {source}")]
    InvalidCondition {
        route: String,
        #[source]
        source: QueryError,
    },

    #[error("Route \"{route}\": unknown generator kind \"{kind}\"")]
    UnknownKind { route: String, kind: String },
}

/// Site-wide settings from `_site.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub author: String,
    pub title: String,
    pub base_url: String,
    /// Whether documents published in the future are generated.
    pub future: Option<bool>,
    /// Every other key, kept for templates.
    pub extra: BTreeMap<String, Value>,
}

impl SiteConfig {
    /// Load `_site.toml` from a source directory. A missing file is treated
    /// as empty, which then fails on the first required key.
    pub fn from_source_dir(source_dir: &Path) -> Result<Self, ConfigError> {
        let path = source_dir.join(SITE_CONFIG_FILE);
        if !path.exists() {
            return Self::from_table(toml::Table::new());
        }
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::from_table(contents.parse::<toml::Table>()?)
    }

    pub fn from_table(mut table: toml::Table) -> Result<Self, ConfigError> {
        let author = take_required(&mut table, "author")?;
        let title = take_required(&mut table, "title")?;
        let base_url = take_required(&mut table, "base_url")?;

        let future = match table.remove("future") {
            Some(toml::Value::Boolean(future)) => Some(future),
            Some(_) => {
                return Err(ConfigError::InvalidKey {
                    key: "future".to_string(),
                    expected: "a boolean",
                })
            }
            None => None,
        };

        let extra = table
            .into_iter()
            .filter_map(|(key, value)| Value::from_toml(value).map(|v| (key, v)))
            .collect();

        Ok(Self {
            author,
            title,
            base_url: normalize_base_url(&base_url),
            future,
            extra,
        })
    }

    /// Look up any key, including the well-known ones.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "author" => Some(Value::from(&self.author)),
            "title" => Some(Value::from(&self.title)),
            "base_url" => Some(Value::from(&self.base_url)),
            "future" => self.future.map(Value::Boolean),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// The flat mapping handed to templates as `site`.
    pub fn to_context(&self) -> JsonValue {
        let mut context: Map<String, JsonValue> = self
            .extra
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        context.insert("author".to_string(), self.author.clone().into());
        context.insert("title".to_string(), self.title.clone().into());
        context.insert("base_url".to_string(), self.base_url.clone().into());
        if let Some(future) = self.future {
            context.insert("future".to_string(), future.into());
        }
        JsonValue::Object(context)
    }
}

fn take_required(table: &mut toml::Table, key: &str) -> Result<String, ConfigError> {
    match table.remove(key) {
        Some(toml::Value::String(value)) => Ok(value),
        Some(_) => Err(ConfigError::InvalidKey {
            key: key.to_string(),
            expected: "a string",
        }),
        None => Err(ConfigError::MissingKey(key.to_string())),
    }
}

/// Strip a trailing slash so paths (which start with `/`) join cleanly.
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// One `[[paths]]` entry in `generate.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub name: String,
    #[serde(alias = "path")]
    pub pattern: String,
    pub kind: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
    #[serde(default)]
    pub filter: toml::Table,
    #[serde(default)]
    pub exclude: toml::Table,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub context: toml::Table,
}

#[derive(Debug, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    paths: Vec<RouteConfig>,
}

impl RouteConfig {
    /// Load routes from `generate.toml` in a source directory. A missing
    /// file yields no routes.
    pub fn from_source_dir(source_dir: &Path) -> Result<Vec<Self>, ConfigError> {
        let path = source_dir.join(ROUTES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Vec<Self>, ConfigError> {
        let file: RoutesFile = toml::from_str(contents)?;
        Ok(file.paths)
    }

    /// The route's extra template context as JSON.
    pub fn context_json(&self) -> Map<String, JsonValue> {
        self.context
            .iter()
            .map(|(key, value)| (key.clone(), toml_to_json(value)))
            .collect()
    }
}

/// Convert TOML to JSON, writing datetimes as RFC 3339 strings.
pub fn toml_to_json(value: &toml::Value) -> JsonValue {
    match value {
        toml::Value::Table(table) => JsonValue::Object(
            table
                .iter()
                .map(|(key, value)| (key.clone(), toml_to_json(value)))
                .collect(),
        ),
        toml::Value::Array(items) => JsonValue::Array(items.iter().map(toml_to_json).collect()),
        other => Value::from_toml(other.clone())
            .map(|v| v.to_json())
            .unwrap_or(JsonValue::Null),
    }
}
