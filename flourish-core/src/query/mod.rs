//! Lazy, immutable queries over the document store.
//!
//! A [`Query`] holds conditions, an ordering and an optional slice, never
//! results. Every chained call returns a new query; iterating evaluates
//! against the live collection:
//!
//! 1. filter and exclude conditions,
//! 2. future exclusion (when enabled),
//! 3. ordering, one stable sort pass per key,
//! 4. the slice.

mod filter;

pub use filter::{Condition, Operator};
pub(crate) use filter::field_value;

use crate::calendar::{publication_dates, YearDates};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::{DoesNotExist, Document, PUBLISHED};
use crate::store::SharedCollection;
use crate::value::Value;
use chrono::Utc;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

const FOREIGN_KEY_SUFFIX: &str = "_fkey";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown filter operator \"{0}\"")]
    UnknownOperator(String),

    #[error("Index {index} out of range for {len} documents")]
    IndexOutOfRange { index: isize, len: usize },
}

/// One ordering key; a leading `-` sorts descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: key.to_string(),
                descending: false,
            },
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Absolute bounds over the filtered, ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slice {
    start: usize,
    stop: Option<usize>,
}

#[derive(Clone)]
pub struct Query {
    collection: SharedCollection,
    diagnostics: Diagnostics,
    conditions: Vec<Condition>,
    ordering: Vec<OrderKey>,
    slice: Option<Slice>,
    future: bool,
}

impl Query {
    pub(crate) fn new(collection: SharedCollection, diagnostics: Diagnostics) -> Self {
        Self {
            collection,
            diagnostics,
            conditions: Vec::new(),
            ordering: Vec::new(),
            slice: None,
            future: true,
        }
    }

    /// The query itself, as the root of a chain.
    pub fn all(&self) -> Query {
        self.clone()
    }

    /// Add a condition written as a lookup key (`field` or `field__op`).
    pub fn filter(&self, key: &str, value: impl Into<Value>) -> Result<Query, QueryError> {
        Ok(self.filter_by(Condition::parse(key, value)?))
    }

    pub fn filter_by(&self, condition: Condition) -> Query {
        let mut clone = self.clone();
        clone.conditions.push(condition);
        clone
    }

    /// Add several conditions at once.
    pub fn filter_all(&self, conditions: impl IntoIterator<Item = Condition>) -> Query {
        let mut clone = self.clone();
        clone.conditions.extend(conditions);
        clone
    }

    /// Add the inverse of a condition: `exclude("x", v)` is `filter("x__neq", v)`.
    pub fn exclude(&self, key: &str, value: impl Into<Value>) -> Result<Query, QueryError> {
        Ok(self.exclude_by(&Condition::parse(key, value)?))
    }

    pub fn exclude_by(&self, condition: &Condition) -> Query {
        self.filter_by(condition.inverted())
    }

    /// Replace the ordering. Later keys dominate; earlier keys break ties.
    pub fn order_by<I, S>(&self, fields: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clone = self.clone();
        clone.ordering = fields
            .into_iter()
            .map(|field| OrderKey::parse(field.as_ref()))
            .collect();
        clone
    }

    /// Drop documents published after the moment of iteration.
    pub fn exclude_future(&self) -> Query {
        let mut clone = self.clone();
        clone.future = false;
        clone
    }

    pub fn include_future(&self) -> Query {
        let mut clone = self.clone();
        clone.future = true;
        clone
    }

    pub fn includes_future(&self) -> bool {
        self.future
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[OrderKey] {
        &self.ordering
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Exact slug lookup against the whole store, ignoring this query's
    /// conditions.
    pub fn get(&self, slug: &str) -> Result<Arc<Document>, DoesNotExist> {
        self.collection
            .read()
            .get(slug)
            .cloned()
            .ok_or_else(|| DoesNotExist::new(slug))
    }

    pub fn count(&self) -> usize {
        if self.slice.is_none() {
            return self.filtered().len();
        }
        self.evaluate().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The document at `index`; negative indices count from the end.
    pub fn at(&self, index: isize) -> Result<Arc<Document>, QueryError> {
        let documents = self.evaluate();
        let len = documents.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(QueryError::IndexOutOfRange { index, len });
        }
        Ok(documents[resolved as usize].clone())
    }

    pub fn first(&self) -> Option<Arc<Document>> {
        self.evaluate().into_iter().next()
    }

    /// A lazily applied `[start:stop]` slice of this query.
    ///
    /// Negative bounds are resolved against `count()` now. Slicing an already
    /// sliced query narrows the existing window.
    pub fn slice(&self, start: Option<isize>, stop: Option<isize>) -> Query {
        let needs_len = matches!(start, Some(s) if s < 0) || matches!(stop, Some(s) if s < 0);
        let len = if needs_len { self.count() } else { 0 };
        let resolve = |bound: isize| -> usize {
            if bound < 0 {
                (len as isize + bound).max(0) as usize
            } else {
                bound as usize
            }
        };
        let start = start.map(resolve).unwrap_or(0);
        let stop = stop.map(resolve);

        let slice = match self.slice {
            None => Slice { start, stop },
            Some(existing) => {
                let offset = existing.start;
                let stop = match (stop, existing.stop) {
                    (Some(stop), Some(limit)) => Some((offset + stop).min(limit)),
                    (Some(stop), None) => Some(offset + stop),
                    (None, limit) => limit,
                };
                Slice {
                    start: offset + start,
                    stop,
                }
            }
        };

        let mut clone = self.clone();
        clone.slice = Some(slice);
        clone
    }

    /// The first `n` documents.
    pub fn limit(&self, n: usize) -> Query {
        self.slice(None, Some(n as isize))
    }

    pub fn iter(&self) -> std::vec::IntoIter<Arc<Document>> {
        self.evaluate().into_iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<Document>> {
        self.evaluate()
    }

    /// Slugs in evaluation order.
    pub fn slugs(&self) -> Vec<String> {
        self.iter().map(|doc| doc.slug().to_string()).collect()
    }

    /// Dereference `<key>_fkey` on `document`. Lookup ignores this query's
    /// conditions; a document without the key yields `Ok(None)`.
    pub fn foreign(
        &self,
        document: &Document,
        key: &str,
    ) -> Result<Option<Arc<Document>>, DoesNotExist> {
        match document.get(&format!("{key}{FOREIGN_KEY_SUFFIX}")).as_str() {
            Some(slug) => self.get(slug).map(Some),
            None => Ok(None),
        }
    }

    /// Documents in this view whose `<key>_fkey` points at `document`.
    pub fn reverse(&self, document: &Document, key: &str) -> Query {
        self.filter_by(Condition::new(
            format!("{key}{FOREIGN_KEY_SUFFIX}"),
            Operator::Eq,
            document.slug(),
        ))
    }

    /// Other documents in this view sharing at least one value of `key`.
    pub fn related(&self, document: &Document, key: &str) -> Vec<Arc<Document>> {
        let wanted: Vec<Value> = match document.get(key) {
            Value::Missing => return Vec::new(),
            Value::List(items) => items.iter().cloned().map(Value::String).collect(),
            value => vec![value.clone()],
        };
        self.iter()
            .filter(|other| other.slug() != document.slug())
            .filter(|other| {
                let value = other.get(key);
                wanted.iter().any(|w| value.equals_or_contains(w))
            })
            .collect()
    }

    /// Distinct values `field` takes across this view, in value order.
    /// List fields contribute each element; `year`, `month` and `day` read
    /// the publication timestamp. Values of different types never merge,
    /// even when they would print the same.
    pub fn distinct_values(&self, field: &str) -> Vec<Value> {
        let mut values = Vec::new();
        for document in self.filtered() {
            match field_value(&document, field).into_owned() {
                Value::Missing => {}
                Value::List(items) => values.extend(items.into_iter().map(Value::String)),
                value => values.push(value),
            }
        }
        values.sort_by(|a, b| {
            a.sort_class()
                .cmp(&b.sort_class())
                .then_with(|| total_order(a, b))
        });
        values.dedup();
        values
    }

    /// Year, month and day tree of publication timestamps in this view.
    pub fn publication_dates(&self) -> Vec<YearDates> {
        publication_dates(self.iter().filter_map(|doc| doc.published()))
    }

    /// Conditions and future exclusion, in store order.
    fn filtered(&self) -> Vec<Arc<Document>> {
        let now = Utc::now();
        let collection = self.collection.read();
        collection
            .documents()
            .iter()
            .filter(|doc| self.conditions.iter().all(|c| c.matches(doc)))
            .filter(|doc| {
                self.future
                    || doc
                        .datetime(PUBLISHED)
                        .map_or(true, |published| published <= now)
            })
            .cloned()
            .collect()
    }

    fn evaluate(&self) -> Vec<Arc<Document>> {
        let mut documents = self.filtered();
        for key in &self.ordering {
            self.sort_pass(&mut documents, key);
        }

        if let Some(slice) = self.slice {
            let len = documents.len();
            let stop = slice.stop.unwrap_or(len).min(len);
            let start = slice.start.min(stop);
            documents.truncate(stop);
            documents.drain(..start);
        }
        documents
    }

    /// One stable sort by a single key. Documents lacking the key, or keys of
    /// mixed types, leave the order untouched.
    fn sort_pass(&self, documents: &mut [Arc<Document>], key: &OrderKey) {
        let mut class = None;
        for doc in documents.iter() {
            let Some(this) = doc.get(&key.field).sort_class() else {
                self.diagnostics.push(Diagnostic::warning(
                    "sort.missing_attribute",
                    format!(
                        "sorting sources by \"{key}\" failed: not all sources have that attribute"
                    ),
                ));
                return;
            };
            if *class.get_or_insert(this) != this {
                self.diagnostics.push(Diagnostic::warning(
                    "sort.mixed_types",
                    format!("sorting sources by \"{key}\" failed: values have mixed types"),
                ));
                return;
            }
        }

        documents.sort_by(|a, b| {
            let ordering = total_order(a.get(&key.field), b.get(&key.field));
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Total order within one sort class.
fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Integer(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Integer(y)) => x.total_cmp(&(*y as f64)),
        _ => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

impl IntoIterator for &Query {
    type Item = Arc<Document>;
    type IntoIter = std::vec::IntoIter<Arc<Document>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("conditions", &self.conditions)
            .field("ordering", &self.ordering)
            .field("slice", &self.slice)
            .field("future", &self.future)
            .finish()
    }
}
