//! # flourish-core
//!
//! Core library for the flourish static site generator.
//!
//! Source documents are scanned into a [`DocumentStore`], queried through
//! the lazy, immutable [`Query`] view, matched against [`PathPattern`]s to
//! discover every path a route can produce, and finally handed to a
//! [`Renderer`] by the generator layer driven from [`Site`].

pub mod calendar;
pub mod config;
pub mod diagnostics;
pub mod dirtrie;
pub mod document;
pub mod frontmatter;
pub mod generate;
pub mod markdown;
pub mod paginator;
pub mod path;
pub mod query;
pub mod site;
pub mod slug;
pub mod store;
pub mod value;

pub use config::{ConfigError, RouteConfig, SiteConfig};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use dirtrie::{DirTrie, NotPath, TrieNode};
pub use document::{DoesNotExist, Document};
pub use generate::{GenerateError, GeneratorKind, Recipe, RenderError, Renderer, Route};
pub use paginator::{NoPage, Page, PageSummary, Paginator};
pub use path::{PathError, PathPattern, TokenSet};
pub use query::{Condition, Operator, Query, QueryError};
pub use site::{Generated, Site, SiteError};
pub use store::{DocumentStore, ScanSummary, StoreError};
pub use value::Value;
