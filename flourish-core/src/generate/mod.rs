//! The generator layer.
//!
//! A [`Route`] pairs a [`PathPattern`] with plain configuration (filters,
//! ordering, limit, template) and a [`GeneratorKind`] supplying the few
//! behaviours that genuinely differ between detail pages, indexes,
//! paginated indexes, calendars and feeds. [`crate::Site`] drives routes:
//! it enumerates token sets, asks the kind for the pages each one yields,
//! builds their contexts and hands them to a [`Renderer`].

mod export;
mod feed;
mod kinds;

pub use export::CsvKind;
pub use feed::AtomKind;
pub use kinds::{CalendarKind, CalendarScale, IndexKind, PageKind, PaginatedKind, StaticKind};

use crate::config::{ConfigError, RouteConfig};
use crate::document::Document;
use crate::paginator::PageSummary;
use crate::path::{PathError, PathPattern, TokenSet};
use crate::query::{Condition, Operator, Query, QueryError};
use crate::site::Site;
use crate::value::Value;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to render template {template}: {message}")]
    Failed { template: String, message: String },

    #[error("Failed to serialize context: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Failed to render {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: RenderError,
    },

    #[error("No template to render {0}")]
    MissingTemplate(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a template name and a context into output text.
pub trait Renderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &JsonValue) -> Result<String, RenderError>,
{
    fn render(&self, template: &str, context: &JsonValue) -> Result<String, RenderError> {
        self(template, context)
    }
}

/// One output file's worth of documents, before rendering.
#[derive(Debug, Clone)]
pub struct PageOutput {
    pub path: String,
    pub documents: Vec<Arc<Document>>,
    /// Set for paginated routes.
    pub pagination: Option<Pagination>,
}

impl PageOutput {
    pub fn new(path: impl Into<String>, documents: Vec<Arc<Document>>) -> Self {
        Self {
            path: path.into(),
            documents,
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub count: usize,
    pub per_page: usize,
    pub num_pages: usize,
    pub page_range: Vec<usize>,
    pub current_page: PageSummary,
}

/// What would be rendered for a path, without rendering it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub path: String,
    pub template_name: Option<String>,
    pub context: JsonValue,
}

/// The behaviour that varies between generator kinds. Everything else about
/// a route is [`Route`] data.
pub trait GeneratorKind: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Appended to output filenames that lack it.
    fn file_extension(&self) -> &'static str {
        ".html"
    }

    fn default_template(&self) -> Option<&'static str> {
        None
    }

    /// Whether output goes through a [`Renderer`] template.
    fn uses_template(&self) -> bool {
        true
    }

    fn default_order_by(&self) -> &'static [&'static str] {
        &[]
    }

    fn default_limit(&self) -> Option<usize> {
        None
    }

    /// `_site.toml` keys this kind cannot work without.
    fn required_config_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether a route of this kind writes `page-N` siblings of its path.
    fn paginates(&self) -> bool {
        false
    }

    /// The documents for one token set, or `None` for kinds that use none.
    fn select(
        &self,
        site: &Site,
        route: &Route,
        tokens: &TokenSet,
    ) -> Result<Option<Query>, GenerateError> {
        Ok(Some(route.selection(&route.sources(&site.sources()), tokens)))
    }

    /// Split a selection into output pages. Most kinds write one.
    fn pages(&self, _route: &Route, path: &str, selection: Option<Query>) -> Vec<PageOutput> {
        let documents = selection.map(|query| query.to_vec()).unwrap_or_default();
        vec![PageOutput::new(path, documents)]
    }

    fn template_name(&self, route: &Route, _page: &PageOutput) -> Option<String> {
        route.template_name()
    }

    fn extend_context(
        &self,
        _site: &Site,
        _route: &Route,
        _page: &PageOutput,
        _tokens: &TokenSet,
        _context: &mut Map<String, JsonValue>,
    ) {
    }

    fn render(
        &self,
        _site: &Site,
        _route: &Route,
        page: &PageOutput,
        context: &JsonValue,
        template: Option<&str>,
        renderer: &dyn Renderer,
    ) -> Result<String, GenerateError> {
        let template =
            template.ok_or_else(|| GenerateError::MissingTemplate(page.path.clone()))?;
        renderer
            .render(template, context)
            .map_err(|source| GenerateError::Render {
                path: page.path.clone(),
                source,
            })
    }
}

/// Look up a built-in kind by its configuration name.
pub fn kind_for_name(name: &str) -> Option<Arc<dyn GeneratorKind>> {
    let kind: Arc<dyn GeneratorKind> = match name {
        "static" => Arc::new(StaticKind),
        "page" => Arc::new(PageKind),
        "index" => Arc::new(IndexKind),
        "paginated" => Arc::new(PaginatedKind),
        "calendar_year" => Arc::new(CalendarKind::new(CalendarScale::Year)),
        "calendar_month" => Arc::new(CalendarKind::new(CalendarScale::Month)),
        "calendar_day" => Arc::new(CalendarKind::new(CalendarScale::Day)),
        "atom" => Arc::new(AtomKind),
        "csv" => Arc::new(CsvKind),
        _ => return None,
    };
    Some(kind)
}

/// A named path pattern plus the configuration of what it generates.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: PathPattern,
    kind: Arc<dyn GeneratorKind>,
    template: Option<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    per_page: Option<usize>,
    filters: Vec<Condition>,
    excludes: Vec<Condition>,
    fields: Vec<String>,
    context: Map<String, JsonValue>,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<PathPattern>,
        kind: Arc<dyn GeneratorKind>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            kind,
            template: None,
            order_by: Vec::new(),
            limit: None,
            per_page: None,
            filters: Vec::new(),
            excludes: Vec::new(),
            fields: Vec::new(),
            context: Map::new(),
        }
    }

    pub fn from_config(config: &RouteConfig) -> Result<Self, ConfigError> {
        let kind = kind_for_name(&config.kind).ok_or_else(|| ConfigError::UnknownKind {
            route: config.name.clone(),
            kind: config.kind.clone(),
        })?;

        let mut route = Route::new(&config.name, config.pattern.as_str(), kind);
        route.template = config.template.clone();
        route.order_by = config.order_by.clone();
        route.limit = config.limit;
        route.per_page = config.per_page;
        route.filters = conditions_from_table(&config.name, &config.filter)?;
        route.excludes = conditions_from_table(&config.name, &config.exclude)?;
        route.fields = config.fields.clone();
        route.context = config.context_json();
        Ok(route)
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn with_filter(mut self, condition: Condition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn with_exclude(mut self, condition: Condition) -> Self {
        self.excludes.push(condition);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn kind(&self) -> &dyn GeneratorKind {
        self.kind.as_ref()
    }

    pub fn template_name(&self) -> Option<String> {
        self.template
            .clone()
            .or_else(|| self.kind.default_template().map(str::to_string))
    }

    pub fn order_by(&self) -> Vec<String> {
        if self.order_by.is_empty() {
            return self
                .kind
                .default_order_by()
                .iter()
                .map(|field| field.to_string())
                .collect();
        }
        self.order_by.clone()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit.or_else(|| self.kind.default_limit())
    }

    pub fn per_page(&self) -> Option<usize> {
        self.per_page
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn context(&self) -> &Map<String, JsonValue> {
        &self.context
    }

    /// `sources` narrowed by this route's filters and exclusions.
    pub fn sources(&self, sources: &Query) -> Query {
        let filtered = sources.filter_all(self.filters.iter().cloned());
        self.excludes
            .iter()
            .fold(filtered, |query, condition| query.exclude_by(condition))
    }

    /// Documents for one token set: each token becomes an equality filter,
    /// then ordering and limit apply.
    pub fn selection(&self, sources: &Query, tokens: &TokenSet) -> Query {
        let mut selection = sources.filter_all(
            tokens
                .iter()
                .map(|(field, value)| Condition::new(field, Operator::Eq, value.clone())),
        );
        let order_by = self.order_by();
        if !order_by.is_empty() {
            selection = selection.order_by(order_by);
        }
        if let Some(limit) = self.limit() {
            selection = selection.limit(limit);
        }
        selection
    }

    /// Where a page of this route lands under `output_dir`.
    pub fn output_filename(&self, output_dir: &Path, path: &str) -> PathBuf {
        output_filename(output_dir, path, self.kind.file_extension())
    }
}

fn conditions_from_table(
    route: &str,
    table: &toml::Table,
) -> Result<Vec<Condition>, ConfigError> {
    table
        .iter()
        .map(|(key, value)| {
            let value =
                Value::from_toml(value.clone()).ok_or_else(|| ConfigError::InvalidFilter {
                    route: route.to_string(),
                    key: key.clone(),
                })?;
            Condition::parse(key, value).map_err(|source| ConfigError::InvalidCondition {
                route: route.to_string(),
                source,
            })
        })
        .collect()
}

/// Output file for a resolved path: a trailing `/` gains `index.html`, and
/// the kind's extension is appended when missing.
///
/// ```
/// use flourish_core::generate::output_filename;
/// use std::path::Path;
///
/// let out = Path::new("output");
/// assert_eq!(output_filename(out, "/", ".html"), out.join("index.html"));
/// assert_eq!(output_filename(out, "/basic-page", ".html"), out.join("basic-page.html"));
/// assert_eq!(output_filename(out, "/index.atom", ".atom"), out.join("index.atom"));
/// ```
pub fn output_filename(output_dir: &Path, path: &str, extension: &str) -> PathBuf {
    let mut relative = path.trim_start_matches('/').to_string();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str("index.html");
    }
    if !relative.ends_with(extension) {
        relative.push_str(extension);
    }
    output_dir.join(relative)
}

/// Whether a page path answers a requested path, exactly or under a
/// trailing wildcard.
pub(crate) fn answers(page_path: &str, candidate: &str) -> bool {
    match candidate.strip_suffix(crate::path::WILDCARD) {
        Some(prefix) => page_path.starts_with(prefix),
        None => page_path == candidate,
    }
}
