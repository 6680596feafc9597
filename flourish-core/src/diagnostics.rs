//! Non-fatal diagnostics.
//!
//! Per-document and per-path anomalies never abort generation. They are
//! logged through `tracing` and collected here so callers can report them
//! once a run completes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub slug: Option<String>,
    pub source_path: Option<PathBuf>,
}

impl Diagnostic {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: DiagnosticSeverity::Warning,
            slug: None,
            source_path: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// Shared sink for diagnostics raised while scanning, querying and generating.
///
/// Clones share the same underlying buffer, so a store, every query derived
/// from it and the owning site all report into one place.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Warning => {
                tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message)
            }
            DiagnosticSeverity::Info => {
                tracing::info!(code = %diagnostic.code, "{}", diagnostic.message)
            }
        }
        self.inner.lock().push(diagnostic);
    }

    pub fn warn(&self, code: &str, message: impl Into<String>) {
        self.push(Diagnostic::warning(code, message));
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn with_code(&self, code: &str) -> Vec<Diagnostic> {
        self.inner
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }
}
