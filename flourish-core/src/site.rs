//! The site: configuration, documents and routes, and the generation loop
//! that ties them together.

use crate::config::{ConfigError, RouteConfig, SiteConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::{DoesNotExist, Document};
use crate::generate::{answers, GenerateError, PageOutput, Recipe, Renderer, Route};
use crate::path::{TokenSet, WILDCARD};
use crate::query::Query;
use crate::store::{DocumentStore, ScanSummary, StoreError};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Name of the route that gives every document its canonical path.
pub const SOURCE_ROUTE: &str = "source";

static PAGE_SUFFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn page_suffix_regex() -> &'static Regex {
    PAGE_SUFFIX_REGEX
        .get_or_init(|| Regex::new(r"^(.*/)page-\d+$").expect("valid page suffix regex"))
}

/// Extra template context computed from the whole site.
pub type GlobalContext = Box<dyn Fn(&Site) -> JsonValue + Send + Sync>;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("{kind} route \"{route}\" requires an entry \"{key}\" in _site.toml")]
    MissingKey {
        route: String,
        kind: String,
        key: String,
    },

    #[error("{kind} route \"{route}\" needs a template")]
    MissingTemplate { route: String, kind: String },

    #[error("No route named \"{0}\"")]
    UnknownRoute(String),
}

/// One file written by generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub route: String,
    pub path: String,
    pub filename: PathBuf,
}

pub struct Site {
    output_dir: PathBuf,
    config: SiteConfig,
    store: DocumentStore,
    routes: Vec<Route>,
    global_context: Option<GlobalContext>,
    future: Option<bool>,
}

impl Site {
    /// Load `_site.toml`, scan the source directory and register the routes
    /// in `generate.toml`.
    pub fn open(
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, SiteError> {
        let source_dir = source_dir.into();
        let mut store = DocumentStore::unscanned(&source_dir, Diagnostics::new())?;
        let config = SiteConfig::from_source_dir(&source_dir)?;
        store.rescan()?;

        let mut site = Site::new(config, store, output_dir);
        for route in RouteConfig::from_source_dir(&source_dir)? {
            site.add_route(Route::from_config(&route)?)?;
        }
        tracing::info!(
            documents = site.store.len(),
            routes = site.routes.len(),
            "Loaded {}",
            source_dir.display()
        );
        Ok(site)
    }

    pub fn new(
        config: SiteConfig,
        store: DocumentStore,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
            store,
            routes: Vec::new(),
            global_context: None,
            future: None,
        }
    }

    /// Override the `future` setting from `_site.toml`.
    pub fn with_future(mut self, future: Option<bool>) -> Self {
        self.future = future;
        self
    }

    pub fn with_global_context<F>(mut self, global_context: F) -> Self
    where
        F: Fn(&Site) -> JsonValue + Send + Sync + 'static,
    {
        self.global_context = Some(Box::new(global_context));
        self
    }

    /// Register a route, replacing any route of the same name.
    pub fn add_route(&mut self, route: Route) -> Result<(), SiteError> {
        let kind = route.kind();
        for key in kind.required_config_keys() {
            if self.config.get(key).is_none() {
                return Err(SiteError::MissingKey {
                    route: route.name().to_string(),
                    kind: kind.name().to_string(),
                    key: key.to_string(),
                });
            }
        }
        if kind.uses_template() && route.template_name().is_none() {
            return Err(SiteError::MissingTemplate {
                route: route.name().to_string(),
                kind: kind.name().to_string(),
            });
        }

        match self.routes.iter_mut().find(|r| r.name() == route.name()) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
        Ok(())
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.store.diagnostics()
    }

    pub fn source_dir(&self) -> &Path {
        self.store.source_dir()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, name: &str) -> Result<&Route, SiteError> {
        self.routes
            .iter()
            .find(|route| route.name() == name)
            .ok_or_else(|| SiteError::UnknownRoute(name.to_string()))
    }

    /// Whether documents published in the future are included.
    pub fn includes_future(&self) -> bool {
        self.future.or(self.config.future).unwrap_or(true)
    }

    /// Every document, honouring the `future` setting.
    pub fn sources(&self) -> Query {
        let sources = self.store.query();
        if self.includes_future() {
            sources
        } else {
            sources.exclude_future()
        }
    }

    pub fn get(&self, slug: &str) -> Result<Arc<Document>, DoesNotExist> {
        self.store.get(slug)
    }

    /// [`Site::get`] for templates: a missing slug is a diagnostic.
    pub fn lookup(&self, slug: &str) -> Option<Arc<Document>> {
        match self.get(slug) {
            Ok(document) => Some(document),
            Err(_) => {
                self.diagnostics().push(Diagnostic::warning(
                    "lookup.missing",
                    format!("Cannot get \"{slug}\" as it does not exist"),
                ));
                None
            }
        }
    }

    /// Canonical path of a document under the current `source` route.
    pub fn document_path(&self, document: &Document) -> Option<String> {
        let route = self.route(SOURCE_ROUTE).ok()?;
        let diagnostics = self.diagnostics();
        document.path_with(route.pattern().as_str(), |doc| {
            route.pattern().document_path(doc, diagnostics)
        })
    }

    pub fn absolute_path(&self, document: &Document) -> Option<String> {
        self.document_path(document)
            .map(|path| format!("{}{}", self.config.base_url, path))
    }

    /// A document's attributes plus `path` and `absolute_path`.
    pub fn document_context(&self, document: &Document) -> JsonValue {
        let mut context = document.to_context();
        if let Some(path) = self.document_path(document) {
            context.insert(
                "absolute_path".to_string(),
                format!("{}{}", self.config.base_url, path).into(),
            );
            context.insert("path".to_string(), path.into());
        }
        JsonValue::Object(context)
    }

    pub fn resolve_path(&self, name: &str, tokens: &TokenSet) -> Result<String, SiteError> {
        let route = self.route(name)?;
        Ok(route
            .pattern()
            .resolve(tokens)
            .map_err(GenerateError::from)?)
    }

    pub fn all_valid_filters_for_path(&self, name: &str) -> Result<Vec<TokenSet>, SiteError> {
        let route = self.route(name)?;
        Ok(self.valid_filters(route))
    }

    fn valid_filters(&self, route: &Route) -> Vec<TokenSet> {
        route
            .pattern()
            .all_valid_filters(&route.sources(&self.sources()))
    }

    /// Every `(route name, tokens)` pair able to produce `candidate`. A
    /// trailing `?` on the candidate also matches paths beneath it.
    pub fn handlers_for_path(&self, candidate: &str) -> Vec<(String, TokenSet)> {
        let mut handlers = Vec::new();
        for route in &self.routes {
            let sources = route.sources(&self.sources());
            let mut matches = route.pattern().can_generate(candidate, &sources);
            if matches.is_empty() && route.kind().paginates() {
                if let Some(base) = page_suffix_regex()
                    .captures(candidate)
                    .and_then(|captures| captures.get(1))
                {
                    matches = route.pattern().can_generate(base.as_str(), &sources);
                }
            }
            handlers.extend(
                matches
                    .into_iter()
                    .map(|tokens| (route.name().to_string(), tokens)),
            );
        }
        handlers
    }

    /// Every path a route writes, including extra pages.
    pub fn route_paths(&self, name: &str) -> Result<Vec<String>, SiteError> {
        let route = self.route(name)?;
        let mut paths = Vec::new();
        for tokens in self.valid_filters(route) {
            for page in self.build_pages(route, &tokens)? {
                paths.push(page.path);
            }
        }
        Ok(paths)
    }

    /// Every path every route writes, in route order.
    pub fn all_paths(&self) -> Result<Vec<(String, String)>, SiteError> {
        let mut paths = Vec::new();
        for route in &self.routes {
            for path in self.route_paths(route.name())? {
                paths.push((route.name().to_string(), path));
            }
        }
        Ok(paths)
    }

    /// Regenerate everything: empty the output directory, run every route
    /// and copy the assets across.
    pub fn generate_site(&self, renderer: &dyn Renderer) -> Result<Vec<Generated>, SiteError> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir).map_err(|source| GenerateError::Io {
                path: self.output_dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| GenerateError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut generated = Vec::new();
        for route in &self.routes {
            generated.extend(self.generate_route(route.name(), renderer)?);
        }
        let assets = self.copy_assets()?;

        tracing::info!(
            files = generated.len(),
            assets = assets.len(),
            "Generated {}",
            self.output_dir.display()
        );
        Ok(generated)
    }

    pub fn generate_route(
        &self,
        name: &str,
        renderer: &dyn Renderer,
    ) -> Result<Vec<Generated>, SiteError> {
        let route = self.route(name)?;
        let mut generated = Vec::new();
        for tokens in self.valid_filters(route) {
            for page in self.build_pages(route, &tokens)? {
                generated.push(self.write_page(route, &page, &tokens, renderer)?);
            }
        }
        tracing::debug!(route = name, files = generated.len(), "Generated route");
        Ok(generated)
    }

    /// Generate only what answers `candidate`, such as `/tags/first/` or
    /// `/2016/?`.
    pub fn generate_path(
        &self,
        candidate: &str,
        renderer: &dyn Renderer,
    ) -> Result<Vec<Generated>, SiteError> {
        let mut generated = Vec::new();
        for (name, tokens) in self.handlers_for_path(candidate) {
            let route = self.route(&name)?;
            for page in self.build_pages(route, &tokens)? {
                if answers(&page.path, candidate) {
                    generated.push(self.write_page(route, &page, &tokens, renderer)?);
                }
            }
        }
        if generated.is_empty() {
            tracing::warn!("Nothing generates {candidate}");
        }
        Ok(generated)
    }

    /// The path, template name and context that would render `candidate`.
    pub fn recipe(&self, candidate: &str) -> Result<Option<Recipe>, SiteError> {
        let exact = candidate.trim_end_matches(WILDCARD);
        for (name, tokens) in self.handlers_for_path(candidate) {
            let route = self.route(&name)?;
            let pages = self.build_pages(route, &tokens)?;
            let page = pages
                .iter()
                .find(|page| page.path == exact)
                .or_else(|| pages.iter().find(|page| answers(&page.path, candidate)));
            if let Some(page) = page {
                return Ok(Some(Recipe {
                    path: page.path.clone(),
                    template_name: route.kind().template_name(route, page),
                    context: self.context(route, page, &tokens),
                }));
            }
        }
        Ok(None)
    }

    /// Re-read the source directory.
    pub fn rescan(&mut self) -> Result<ScanSummary, StoreError> {
        self.store.rescan()
    }

    /// Copy every asset into the output directory, keeping its relative path.
    pub fn copy_assets(&self) -> Result<Vec<PathBuf>, GenerateError> {
        let mut copied = Vec::new();
        for asset in self.store.assets() {
            let source = self.source_dir().join(asset);
            let destination = self.output_dir.join(asset);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(&source, &destination).map_err(|err| GenerateError::Io {
                path: destination.clone(),
                source: err,
            })?;
            tracing::debug!("++ {}", destination.display());
            copied.push(destination);
        }
        Ok(copied)
    }

    fn build_pages(
        &self,
        route: &Route,
        tokens: &TokenSet,
    ) -> Result<Vec<PageOutput>, GenerateError> {
        let path = route.pattern().resolve(tokens)?;
        let selection = route.kind().select(self, route, tokens)?;
        Ok(route.kind().pages(route, &path, selection))
    }

    fn context(&self, route: &Route, page: &PageOutput, tokens: &TokenSet) -> JsonValue {
        let mut context = Map::new();
        context.insert("site".to_string(), self.config.to_context());
        context.insert(
            "global".to_string(),
            self.global_context
                .as_ref()
                .map_or(JsonValue::Null, |global| global(self)),
        );
        context.insert(
            "tokens".to_string(),
            JsonValue::Object(
                tokens
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        );
        context.extend(route.context().clone());
        context.insert("current_path".to_string(), page.path.clone().into());
        context.insert(
            "sources".to_string(),
            JsonValue::Array(
                page.documents
                    .iter()
                    .map(|document| self.document_context(document))
                    .collect(),
            ),
        );
        route
            .kind()
            .extend_context(self, route, page, tokens, &mut context);
        JsonValue::Object(context)
    }

    fn write_page(
        &self,
        route: &Route,
        page: &PageOutput,
        tokens: &TokenSet,
        renderer: &dyn Renderer,
    ) -> Result<Generated, GenerateError> {
        let kind = route.kind();
        let context = self.context(route, page, tokens);
        let template = kind.template_name(route, page);
        let rendered = kind.render(self, route, page, &context, template.as_deref(), renderer)?;

        let filename = route.output_filename(&self.output_dir, &page.path);
        if let Some(parent) = filename.parent() {
            fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&filename, rendered).map_err(|source| GenerateError::Io {
            path: filename.clone(),
            source,
        })?;
        tracing::debug!("-> {}", filename.display());

        Ok(Generated {
            route: route.name().to_string(),
            path: page.path.clone(),
            filename,
        })
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("source_dir", &self.source_dir())
            .field("output_dir", &self.output_dir)
            .field("routes", &self.routes.len())
            .field("future", &self.includes_future())
            .finish()
    }
}
