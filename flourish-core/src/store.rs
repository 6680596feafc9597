//! The document store: a slug-indexed collection rebuilt from the source
//! directory.
//!
//! Files are visited the way a directory walk reads them: a directory's own
//! files first, alphabetically, then each subdirectory in turn. That order is
//! the natural (unsorted) order of every query.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::{DoesNotExist, Document};
use crate::frontmatter::{parse_frontmatter, FrontmatterError};
use crate::markdown::MarkdownProcessor;
use crate::query::Query;
use crate::slug::{is_valid_slug, slug_for_path};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// Files in the source root that configure the site rather than describe
/// content.
pub const RESERVED_FILES: &[&str] = &["_site.toml", "generate.toml"];

const MARKDOWN_SUFFIX: &str = "_markdown";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The source directory \"{0}\" must exist")]
    MissingSourceDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("\"{path}\": {source}")]
    Frontmatter {
        path: PathBuf,
        source: FrontmatterError,
    },

    #[error("Invalid TOML in \"{path}\": {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid JSON in \"{path}\": {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("\"{0}\" must contain a JSON object")]
    JsonNotObject(PathBuf),

    #[error("Invalid CSV in \"{path}\": {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Ordered documents plus a slug index into them.
#[derive(Debug, Default)]
pub(crate) struct Collection {
    documents: Vec<Arc<Document>>,
    index: HashMap<String, usize>,
}

impl Collection {
    pub(crate) fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub(crate) fn get(&self, slug: &str) -> Option<&Arc<Document>> {
        self.index.get(slug).map(|&i| &self.documents[i])
    }

    /// Insert a document, replacing (in place) any existing one with the same
    /// slug. The replaced document is returned.
    pub(crate) fn insert(&mut self, document: Arc<Document>) -> Option<Arc<Document>> {
        match self.index.get(document.slug()) {
            Some(&i) => Some(std::mem::replace(&mut self.documents[i], document)),
            None => {
                self.index
                    .insert(document.slug().to_string(), self.documents.len());
                self.documents.push(document);
                None
            }
        }
    }
}

pub(crate) type SharedCollection = Arc<RwLock<Collection>>;

/// Counts from one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub changed: usize,
    pub retained: usize,
    pub removed: usize,
    pub assets: usize,
}

/// Formats holding exactly one document per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Single(FileFormat),
    /// CSV, one document per row.
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentFormat {
    Markdown,
    Html,
}

#[derive(Debug, Clone)]
struct Attachment {
    key: String,
    format: AttachmentFormat,
    path: PathBuf,
}

#[derive(Debug)]
enum SourceFile {
    Reserved,
    Document(SourceKind),
    Attachment { slug: String, attachment: Attachment },
    Asset,
}

fn classify(relative: &Path) -> SourceFile {
    let name = relative.to_string_lossy().replace('\\', "/");
    if RESERVED_FILES.contains(&name.as_str()) {
        return SourceFile::Reserved;
    }

    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = file_name.split('.').collect();
    let extension = if parts.len() > 1 { parts[parts.len() - 1] } else { "" };

    let attachment_format = match extension {
        "markdown" => Some(AttachmentFormat::Markdown),
        "html" => Some(AttachmentFormat::Html),
        _ => None,
    };
    if let (Some(format), 3) = (attachment_format, parts.len()) {
        return SourceFile::Attachment {
            slug: slug_for_path(&relative.with_file_name(parts[0])),
            attachment: Attachment {
                key: parts[1].to_string(),
                format,
                path: relative.to_path_buf(),
            },
        };
    }

    match extension {
        "toml" => SourceFile::Document(SourceKind::Single(FileFormat::Toml)),
        "markdown" if parts.len() == 2 => {
            SourceFile::Document(SourceKind::Single(FileFormat::Markdown))
        }
        "json" => SourceFile::Document(SourceKind::Single(FileFormat::Json)),
        "csv" => SourceFile::Document(SourceKind::Rows),
        _ => SourceFile::Asset,
    }
}

/// Relative paths of every file under `root`, in walk order.
fn walk_source_dir(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

fn modified(path: &Path) -> Result<SystemTime, StoreError> {
    Ok(fs::metadata(path)?.modified()?)
}

/// Authoritative slug-to-document collection for one source directory.
pub struct DocumentStore {
    source_dir: PathBuf,
    collection: SharedCollection,
    assets: Vec<PathBuf>,
    processor: MarkdownProcessor,
    diagnostics: Diagnostics,
}

impl DocumentStore {
    /// Open and scan a source directory.
    pub fn open(source_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with(source_dir, Diagnostics::new())
    }

    /// Open and scan, reporting into an existing diagnostics sink.
    pub fn open_with(
        source_dir: impl Into<PathBuf>,
        diagnostics: Diagnostics,
    ) -> Result<Self, StoreError> {
        let mut store = Self::unscanned(source_dir, diagnostics)?;
        store.rescan()?;
        Ok(store)
    }

    /// A store for `source_dir` that has not read any files yet.
    pub fn unscanned(
        source_dir: impl Into<PathBuf>,
        diagnostics: Diagnostics,
    ) -> Result<Self, StoreError> {
        let source_dir = source_dir.into();
        if !source_dir.is_dir() {
            return Err(StoreError::MissingSourceDir(source_dir));
        }
        Ok(Self {
            source_dir,
            collection: Arc::new(RwLock::new(Collection::default())),
            assets: Vec::new(),
            processor: MarkdownProcessor::new(),
            diagnostics,
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Copy-through files, relative to the source directory.
    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.collection.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every document, in store order.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.collection.read().documents.clone()
    }

    pub fn get(&self, slug: &str) -> Result<Arc<Document>, DoesNotExist> {
        self.collection
            .read()
            .get(slug)
            .cloned()
            .ok_or_else(|| DoesNotExist::new(slug))
    }

    /// Unfiltered query over the live collection.
    pub fn query(&self) -> Query {
        Query::new(self.collection.clone(), self.diagnostics.clone())
    }

    /// Rebuild the collection from disk.
    ///
    /// Documents whose files (and attachments) are unchanged keep their
    /// existing instance; deleted files drop their documents.
    pub fn rescan(&mut self) -> Result<ScanSummary, StoreError> {
        let files = walk_source_dir(&self.source_dir);
        let shared = self.collection.clone();
        let previous = shared.read();

        let mut attachments: BTreeMap<String, Vec<Attachment>> = BTreeMap::new();
        let mut sources = Vec::new();
        let mut assets = Vec::new();
        for relative in files {
            match classify(&relative) {
                SourceFile::Reserved => {}
                SourceFile::Document(kind) => sources.push((relative, kind)),
                SourceFile::Attachment { slug, attachment } => {
                    attachments.entry(slug).or_default().push(attachment)
                }
                SourceFile::Asset => assets.push(relative),
            }
        }

        let mut summary = ScanSummary {
            assets: assets.len(),
            ..ScanSummary::default()
        };
        let mut next = Collection::default();
        for (relative, kind) in sources {
            let documents = match kind {
                SourceKind::Rows => self.load_csv(&relative, &attachments, &previous)?,
                SourceKind::Single(format) => {
                    let slug = slug_for_path(&relative);
                    let own = attachments.get(&slug).map(Vec::as_slice).unwrap_or(&[]);
                    vec![self.load_file(&relative, format, slug, own, &previous)?]
                }
            };

            for document in documents {
                match previous.get(document.slug()) {
                    Some(old) if Arc::ptr_eq(old, &document) => summary.retained += 1,
                    Some(_) => summary.changed += 1,
                    None => summary.added += 1,
                }
                if let Some(replaced) = next.insert(document.clone()) {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            "slug.collision",
                            format!(
                                "Existing source \"{}\" has been overridden by \"{}\"",
                                replaced.slug(),
                                document.source_path().display()
                            ),
                        )
                        .with_slug(document.slug())
                        .with_source(document.source_path()),
                    );
                }
            }
        }

        for (slug, orphans) in &attachments {
            if next.get(slug).is_some() {
                continue;
            }
            for orphan in orphans {
                self.diagnostics.push(
                    Diagnostic::warning(
                        "attachment.orphan",
                        format!(
                            "\"{}\" has no document \"{}\" to attach to",
                            orphan.path.display(),
                            slug
                        ),
                    )
                    .with_slug(slug.as_str())
                    .with_source(&orphan.path),
                );
            }
        }

        summary.removed = previous
            .documents
            .iter()
            .filter(|doc| next.get(doc.slug()).is_none())
            .count();
        drop(previous);

        *self.collection.write() = next;
        self.assets = assets;

        tracing::info!(
            added = summary.added,
            changed = summary.changed,
            retained = summary.retained,
            removed = summary.removed,
            "Scanned {}",
            self.source_dir.display()
        );
        Ok(summary)
    }

    fn load_file(
        &self,
        relative: &Path,
        format: FileFormat,
        slug: String,
        attachments: &[Attachment],
        previous: &Collection,
    ) -> Result<Arc<Document>, StoreError> {
        let path = self.source_dir.join(relative);
        let timestamp = self.newest(modified(&path)?, attachments)?;
        if let Some(existing) = reusable(previous, &slug, relative, timestamp, attachments) {
            return Ok(existing);
        }

        tracing::debug!("Reading {}", relative.display());
        let content = fs::read_to_string(&path)?;
        let mut attributes = match format {
            FileFormat::Toml => {
                let table = content
                    .parse::<toml::Table>()
                    .map_err(|source| StoreError::Toml {
                        path: relative.to_path_buf(),
                        source,
                    })?;
                self.table_attributes(table, &slug)
            }
            FileFormat::Markdown => {
                let (table, body) =
                    parse_frontmatter(&content).map_err(|source| StoreError::Frontmatter {
                        path: relative.to_path_buf(),
                        source,
                    })?;
                let mut attributes = self.table_attributes(table, &slug);
                attributes.insert("body_markdown".to_string(), Value::String(body));
                attributes
            }
            FileFormat::Json => self.json_attributes(relative, &content, &slug)?,
        };

        self.apply_attachments(&slug, &mut attributes, attachments)?;
        Ok(build_document(slug, relative, timestamp, attributes, attachments))
    }

    /// The later of `timestamp` and every attachment's modification time.
    fn newest(
        &self,
        timestamp: SystemTime,
        attachments: &[Attachment],
    ) -> Result<SystemTime, StoreError> {
        let mut newest = timestamp;
        for attachment in attachments {
            newest = newest.max(modified(&self.source_dir.join(&attachment.path))?);
        }
        Ok(newest)
    }

    fn load_csv(
        &self,
        relative: &Path,
        attachments: &BTreeMap<String, Vec<Attachment>>,
        previous: &Collection,
    ) -> Result<Vec<Arc<Document>>, StoreError> {
        let path = self.source_dir.join(relative);
        let file_timestamp = modified(&path)?;
        let csv_error = |source| StoreError::Csv {
            path: relative.to_path_buf(),
            source,
        };

        tracing::debug!("Reading rows from {}", relative.display());
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        let slug_column = headers.iter().position(|h| h == "slug");

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let Some(raw_slug) = slug_column.and_then(|i| record.get(i)) else {
                self.diagnostics.push(
                    Diagnostic::warning(
                        "csv.missing_slug",
                        format!("row {} of \"{}\" has no slug", row + 1, relative.display()),
                    )
                    .with_source(relative),
                );
                continue;
            };
            if !is_valid_slug(raw_slug) {
                self.diagnostics.push(
                    Diagnostic::warning(
                        "csv.invalid_slug",
                        format!(
                            "row {} of \"{}\" has an invalid slug \"{}\"",
                            row + 1,
                            relative.display(),
                            raw_slug
                        ),
                    )
                    .with_source(relative),
                );
                continue;
            }
            let slug = raw_slug.trim_start_matches('/').to_string();
            let own = attachments.get(&slug).map(Vec::as_slice).unwrap_or(&[]);
            let timestamp = self.newest(file_timestamp, own)?;
            if let Some(existing) = reusable(previous, &slug, relative, timestamp, own) {
                documents.push(existing);
                continue;
            }

            let mut attributes = BTreeMap::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if header == "slug" || cell.is_empty() {
                    continue;
                }
                attributes.insert(header.to_string(), Value::from_text(cell.to_string()));
            }
            self.apply_attachments(&slug, &mut attributes, own)?;
            documents.push(build_document(slug, relative, timestamp, attributes, own));
        }
        Ok(documents)
    }

    fn table_attributes(&self, table: toml::Table, slug: &str) -> BTreeMap<String, Value> {
        let mut attributes = BTreeMap::new();
        for (key, value) in table {
            match Value::from_toml(value) {
                Some(value) => {
                    attributes.insert(key, value);
                }
                None => self.nested_value(slug, &key),
            }
        }
        attributes
    }

    fn json_attributes(
        &self,
        relative: &Path,
        content: &str,
        slug: &str,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let parsed: serde_json::Value =
            serde_json::from_str(content).map_err(|source| StoreError::Json {
                path: relative.to_path_buf(),
                source,
            })?;
        let serde_json::Value::Object(object) = parsed else {
            return Err(StoreError::JsonNotObject(relative.to_path_buf()));
        };

        let mut attributes = BTreeMap::new();
        for (key, value) in object {
            match Value::from_json(value) {
                Some(Value::Missing) => {}
                Some(value) => {
                    attributes.insert(key, value);
                }
                None => self.nested_value(slug, &key),
            }
        }
        Ok(attributes)
    }

    fn nested_value(&self, slug: &str, key: &str) {
        self.diagnostics.push(
            Diagnostic::warning(
                "attribute.nested",
                format!("\"{key}\" in {slug} is a nested table and was skipped"),
            )
            .with_slug(slug),
        );
    }

    /// Layer attachments over the parsed attributes: Markdown attachments,
    /// then conversion of every `*_markdown` key, then raw HTML attachments.
    fn apply_attachments(
        &self,
        slug: &str,
        attributes: &mut BTreeMap<String, Value>,
        attachments: &[Attachment],
    ) -> Result<(), StoreError> {
        for attachment in attachments
            .iter()
            .filter(|a| a.format == AttachmentFormat::Markdown)
        {
            let key = format!("{}{}", attachment.key, MARKDOWN_SUFFIX);
            let content = fs::read_to_string(self.source_dir.join(&attachment.path))?;
            if attributes.contains_key(&key) {
                self.overridden(slug, &key, "attachment file");
            }
            attributes.insert(key, Value::String(content));
        }

        let converted: Vec<(String, String)> = attributes
            .iter()
            .filter_map(|(key, value)| {
                let dest = key.strip_suffix(MARKDOWN_SUFFIX)?;
                Some((dest.to_string(), self.processor.convert(value.as_str()?)))
            })
            .collect();
        for (dest, html) in converted {
            if attributes.contains_key(&dest) {
                self.overridden(slug, &dest, "Markdown conversion");
            }
            attributes.insert(dest, Value::String(html));
        }

        for attachment in attachments
            .iter()
            .filter(|a| a.format == AttachmentFormat::Html)
        {
            let content = fs::read_to_string(self.source_dir.join(&attachment.path))?;
            if attributes.contains_key(&attachment.key) {
                self.overridden(slug, &attachment.key, "attachment file");
            }
            attributes.insert(attachment.key.clone(), Value::String(content));
        }
        Ok(())
    }

    fn overridden(&self, slug: &str, key: &str, by: &str) {
        self.diagnostics.push(
            Diagnostic::warning(
                "attribute.override",
                format!("\"{key}\" in {slug} overridden by {by}."),
            )
            .with_slug(slug),
        );
    }
}

/// The previous instance of `slug`, if its source file, attachment set and
/// newest modification time are all unchanged.
fn reusable(
    previous: &Collection,
    slug: &str,
    relative: &Path,
    timestamp: SystemTime,
    attachments: &[Attachment],
) -> Option<Arc<Document>> {
    let existing = previous.get(slug)?;
    let same_attachments = existing
        .attachment_paths()
        .iter()
        .eq(attachments.iter().map(|attachment| &attachment.path));
    (existing.source_path() == relative && existing.timestamp() == timestamp && same_attachments)
        .then(|| existing.clone())
}

fn build_document(
    slug: String,
    relative: &Path,
    timestamp: SystemTime,
    attributes: BTreeMap<String, Value>,
    attachments: &[Attachment],
) -> Arc<Document> {
    let attachment_paths = attachments
        .iter()
        .map(|attachment| attachment.path.clone())
        .collect();
    Arc::new(
        Document::new(slug, relative, timestamp, attributes)
            .with_attachment_paths(attachment_paths),
    )
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("source_dir", &self.source_dir)
            .field("documents", &self.len())
            .field("assets", &self.assets.len())
            .finish()
    }
}
