//! HTML generator kinds.

use super::{GenerateError, GeneratorKind, PageOutput, Pagination, Route};
use crate::document::{Document, PUBLISHED};
use crate::paginator::Paginator;
use crate::path::TokenSet;
use crate::query::Query;
use crate::site::Site;
use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

const DEFAULT_PER_PAGE: usize = 10;

/// A page built from configuration alone, with no documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticKind;

impl GeneratorKind for StaticKind {
    fn name(&self) -> &'static str {
        "static"
    }

    fn select(
        &self,
        _site: &Site,
        _route: &Route,
        _tokens: &TokenSet,
    ) -> Result<Option<Query>, GenerateError> {
        Ok(None)
    }
}

/// One document per output, usually keyed on `#slug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageKind;

impl GeneratorKind for PageKind {
    fn name(&self) -> &'static str {
        "page"
    }

    fn default_template(&self) -> Option<&'static str> {
        Some("page.html")
    }

    fn pages(&self, _route: &Route, path: &str, selection: Option<Query>) -> Vec<PageOutput> {
        match selection.and_then(|query| query.first()) {
            Some(document) => vec![PageOutput::new(path, vec![document])],
            None => Vec::new(),
        }
    }

    /// The document's own `template`, else `<page_type>.html`, else the
    /// route's template.
    fn template_name(&self, route: &Route, page: &PageOutput) -> Option<String> {
        if let Some(document) = page.documents.first() {
            if let Some(template) = document.str("template") {
                return Some(template.to_string());
            }
            if let Some(page_type) = document.str("page_type") {
                return Some(format!("{page_type}.html"));
            }
        }
        route.template_name()
    }

    fn extend_context(
        &self,
        site: &Site,
        _route: &Route,
        page: &PageOutput,
        _tokens: &TokenSet,
        context: &mut Map<String, JsonValue>,
    ) {
        let Some(document) = page.documents.first() else {
            return;
        };
        let JsonValue::Object(attributes) = site.document_context(document) else {
            return;
        };
        context.insert("page".to_string(), JsonValue::Object(attributes.clone()));
        context.extend(attributes);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexKind;

impl GeneratorKind for IndexKind {
    fn name(&self) -> &'static str {
        "index"
    }

    fn default_template(&self) -> Option<&'static str> {
        Some("index.html")
    }

    fn extend_context(
        &self,
        site: &Site,
        _route: &Route,
        page: &PageOutput,
        _tokens: &TokenSet,
        context: &mut Map<String, JsonValue>,
    ) {
        context.insert("pages".to_string(), documents_context(site, &page.documents));
    }
}

/// An index split over `page-N` paths, `per_page` documents at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginatedKind;

impl GeneratorKind for PaginatedKind {
    fn name(&self) -> &'static str {
        "paginated"
    }

    fn default_template(&self) -> Option<&'static str> {
        Some("index.html")
    }

    fn paginates(&self) -> bool {
        true
    }

    fn pages(&self, route: &Route, path: &str, selection: Option<Query>) -> Vec<PageOutput> {
        let documents = selection.map(|query| query.to_vec()).unwrap_or_default();
        let paginator = Paginator::new(
            documents,
            route.per_page().unwrap_or(DEFAULT_PER_PAGE),
            path,
        );
        paginator
            .pages()
            .into_iter()
            .map(|page| PageOutput {
                path: page.path(),
                pagination: Some(Pagination {
                    count: paginator.count(),
                    per_page: paginator.per_page(),
                    num_pages: paginator.num_pages(),
                    page_range: paginator.page_range().collect(),
                    current_page: page.summary(),
                }),
                documents: page.object_list,
            })
            .collect()
    }

    fn extend_context(
        &self,
        site: &Site,
        _route: &Route,
        page: &PageOutput,
        _tokens: &TokenSet,
        context: &mut Map<String, JsonValue>,
    ) {
        context.insert("pages".to_string(), documents_context(site, &page.documents));
        if let Some(pagination) = &page.pagination {
            if let Ok(current) = serde_json::to_value(&pagination.current_page) {
                context.insert("current_page".to_string(), current);
            }
            if let Ok(pagination) = serde_json::to_value(pagination) {
                context.insert("pagination".to_string(), pagination);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarScale {
    Year,
    Month,
    Day,
}

/// An index of one year, month or day of publications, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct CalendarKind {
    scale: CalendarScale,
}

impl CalendarKind {
    pub fn new(scale: CalendarScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> CalendarScale {
        self.scale
    }
}

impl GeneratorKind for CalendarKind {
    fn name(&self) -> &'static str {
        match self.scale {
            CalendarScale::Year => "calendar_year",
            CalendarScale::Month => "calendar_month",
            CalendarScale::Day => "calendar_day",
        }
    }

    fn default_template(&self) -> Option<&'static str> {
        Some(match self.scale {
            CalendarScale::Year => "calendar_year.html",
            CalendarScale::Month => "calendar_month.html",
            CalendarScale::Day => "calendar_day.html",
        })
    }

    fn default_order_by(&self) -> &'static [&'static str] {
        &[PUBLISHED]
    }

    fn extend_context(
        &self,
        site: &Site,
        _route: &Route,
        page: &PageOutput,
        tokens: &TokenSet,
        context: &mut Map<String, JsonValue>,
    ) {
        context.insert("pages".to_string(), documents_context(site, &page.documents));

        let year = token_number(tokens, "year");
        let month = token_number(tokens, "month");
        let day = token_number(tokens, "day");
        let dates = crate::calendar::publication_dates(
            page.documents.iter().filter_map(|doc| doc.published()),
        );

        match self.scale {
            CalendarScale::Year => {
                if let Some(date) = year.and_then(|y| NaiveDate::from_ymd_opt(y as i32, 1, 1)) {
                    context.insert("year".to_string(), date_json(date));
                }
                if let Some(first) = dates.first() {
                    insert_serialized(context, "publication_dates", &first.months);
                }
            }
            CalendarScale::Month => {
                let date = year
                    .zip(month)
                    .and_then(|(y, m)| NaiveDate::from_ymd_opt(y as i32, m, 1));
                if let Some(date) = date {
                    context.insert("month".to_string(), date_json(date));
                }
                if let Some(first) = dates.first().and_then(|year| year.months.first()) {
                    insert_serialized(context, "publication_dates", &first.days);
                }
            }
            CalendarScale::Day => {
                let date = year
                    .zip(month)
                    .zip(day)
                    .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y as i32, m, d));
                if let Some(date) = date {
                    context.insert("day".to_string(), date_json(date));
                }
            }
        }
    }
}

fn token_number(tokens: &TokenSet, name: &str) -> Option<u32> {
    tokens.get(name)?.as_token()?.parse().ok()
}

fn date_json(date: NaiveDate) -> JsonValue {
    JsonValue::String(date.format("%Y-%m-%d").to_string())
}

fn insert_serialized<T: serde::Serialize>(
    context: &mut Map<String, JsonValue>,
    key: &str,
    value: &T,
) {
    if let Ok(value) = serde_json::to_value(value) {
        context.insert(key.to_string(), value);
    }
}

/// Template contexts for a list of documents.
pub(crate) fn documents_context(site: &Site, documents: &[Arc<Document>]) -> JsonValue {
    JsonValue::Array(
        documents
            .iter()
            .map(|document| site.document_context(document))
            .collect(),
    )
}
