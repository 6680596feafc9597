//! Askama template definitions, filled from generator contexts.

use askama::Template;
use chrono::{DateTime, Datelike, NaiveDate};
use flourish_core::calendar::{month_name, ordinal};
use serde_json::Value as JsonValue;

/// Site-wide values shown on every page.
#[derive(Debug, Clone, Default)]
pub struct SiteInfo {
    pub title: String,
    pub author: String,
    pub base_url: String,
    /// Publication span such as `2015–2016`, from the global context.
    pub copyright: Option<String>,
}

impl SiteInfo {
    pub fn from_context(context: &JsonValue) -> Self {
        let site = &context["site"];
        Self {
            title: text(site, "title"),
            author: text(site, "author"),
            base_url: text(site, "base_url"),
            copyright: optional_text(&context["global"], "copyright"),
        }
    }
}

/// A document in a listing.
#[derive(Debug, Clone)]
pub struct PageEntry {
    pub title: String,
    pub path: String,
    pub date: Option<String>,
    pub summary: Option<String>,
}

impl PageEntry {
    pub fn from_context(page: &JsonValue) -> Self {
        Self {
            title: title_of(page),
            path: text(page, "path"),
            date: display_date(page, "published"),
            summary: optional_text(page, "summary"),
        }
    }

    fn list(context: &JsonValue) -> Vec<PageEntry> {
        context["pages"]
            .as_array()
            .map(|pages| pages.iter().map(PageEntry::from_context).collect())
            .unwrap_or_default()
    }
}

/// A link from a calendar archive to the next level down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLink {
    pub label: String,
    pub href: String,
}

/// Single document page
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub site: SiteInfo,
    pub title: String,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub author: String,
    pub tags: Vec<String>,
    /// Already HTML.
    pub content: String,
}

impl PageTemplate {
    pub fn from_context(context: &JsonValue) -> Self {
        let site = SiteInfo::from_context(context);
        let author = optional_text(context, "author").unwrap_or_else(|| site.author.clone());
        Self {
            title: title_of(context),
            date: display_date(context, "published"),
            updated: display_date(context, "updated"),
            author,
            tags: context["tag"]
                .as_array()
                .map(|tags| {
                    tags.iter()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            content: text(context, "body"),
            site,
        }
    }
}

/// Listing page, optionally one page of several
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub site: SiteInfo,
    pub title: String,
    pub pages: Vec<PageEntry>,
    pub previous_path: Option<String>,
    pub next_path: Option<String>,
    /// "Page 2 of 3", when there is more than one page.
    pub page_label: Option<String>,
}

impl IndexTemplate {
    pub fn from_context(context: &JsonValue) -> Self {
        let site = SiteInfo::from_context(context);
        let current = &context["current_page"];
        let page_label = match (current["number"].as_u64(), current["num_pages"].as_u64()) {
            (Some(number), Some(total)) if total > 1 => Some(format!("Page {number} of {total}")),
            _ => None,
        };
        Self {
            title: optional_text(context, "title").unwrap_or_else(|| site.title.clone()),
            pages: PageEntry::list(context),
            previous_path: optional_text(current, "previous_path"),
            next_path: optional_text(current, "next_path"),
            page_label,
            site,
        }
    }
}

/// Year, month and day archives share one layout.
#[derive(Template)]
#[template(path = "calendar.html")]
pub struct CalendarTemplate {
    pub site: SiteInfo,
    pub heading: String,
    pub pages: Vec<PageEntry>,
    pub links: Vec<ArchiveLink>,
}

impl CalendarTemplate {
    /// `2016`, linking to each month with publications.
    pub fn year(context: &JsonValue) -> Self {
        let heading = context_date(context, "year")
            .map(|date| date.year().to_string())
            .unwrap_or_default();
        let links = context["publication_dates"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|month| parse_date(month["month"].as_str()?))
            .map(|date| ArchiveLink {
                label: month_name(date.month()).unwrap_or_default().to_string(),
                href: format!("{:02}/", date.month()),
            })
            .collect();
        Self::build(context, heading, links)
    }

    /// `June 2016`, linking to each day with publications.
    pub fn month(context: &JsonValue) -> Self {
        let heading = context_date(context, "month")
            .map(|date| month_heading(&date))
            .unwrap_or_default();
        let links = context["publication_dates"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|day| parse_date(day.as_str()?))
            .map(|date| ArchiveLink {
                label: format!("{}{}", date.day(), ordinal(date.day())),
                href: format!("{:02}/", date.day()),
            })
            .collect();
        Self::build(context, heading, links)
    }

    /// `4th June 2016`.
    pub fn day(context: &JsonValue) -> Self {
        let heading = context_date(context, "day")
            .map(|date| format!("{}{} {}", date.day(), ordinal(date.day()), month_heading(&date)))
            .unwrap_or_default();
        Self::build(context, heading, Vec::new())
    }

    fn build(context: &JsonValue, heading: String, links: Vec<ArchiveLink>) -> Self {
        Self {
            site: SiteInfo::from_context(context),
            heading,
            pages: PageEntry::list(context),
            links,
        }
    }
}

fn text(context: &JsonValue, key: &str) -> String {
    optional_text(context, key).unwrap_or_default()
}

fn optional_text(context: &JsonValue, key: &str) -> Option<String> {
    match context.get(key)? {
        JsonValue::String(value) if !value.is_empty() => Some(value.clone()),
        JsonValue::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// The document's title, falling back to its slug.
fn title_of(context: &JsonValue) -> String {
    optional_text(context, "title").unwrap_or_else(|| text(context, "slug"))
}

/// A timestamp attribute as `25 December 2015`.
fn display_date(context: &JsonValue, key: &str) -> Option<String> {
    let timestamp = DateTime::parse_from_rfc3339(context.get(key)?.as_str()?).ok()?;
    Some(format!("{} {}", timestamp.day(), month_heading(&timestamp)))
}

fn context_date(context: &JsonValue, key: &str) -> Option<NaiveDate> {
    parse_date(context.get(key)?.as_str()?)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn month_heading(date: &impl Datelike) -> String {
    format!(
        "{} {}",
        month_name(date.month()).unwrap_or_default(),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site() -> JsonValue {
        json!({
            "title": "Flourish Test Site",
            "author": "Wendy Testaburger",
            "base_url": "http://localhost:8000",
        })
    }

    #[test]
    fn test_page_from_context() {
        let context = json!({
            "site": site(),
            "title": "Thing two",
            "published": "2016-06-04T12:30:00+00:00",
            "author": "Eric Cartman",
            "tag": ["first", "second"],
            "body": "<p>Hello</p>",
        });
        let page = PageTemplate::from_context(&context);
        assert_eq!(page.title, "Thing two");
        assert_eq!(page.date.as_deref(), Some("4 June 2016"));
        assert_eq!(page.updated, None);
        assert_eq!(page.author, "Eric Cartman");
        assert_eq!(page.tags, vec!["first", "second"]);
        assert_eq!(page.content, "<p>Hello</p>");
    }

    #[test]
    fn test_page_falls_back_to_site_author_and_slug() {
        let context = json!({ "site": site(), "slug": "nothing" });
        let page = PageTemplate::from_context(&context);
        assert_eq!(page.title, "nothing");
        assert_eq!(page.author, "Wendy Testaburger");
        assert!(page.tags.is_empty());
    }

    #[test]
    fn test_index_page_label() {
        let context = json!({
            "site": site(),
            "pages": [{ "title": "A", "path": "/a" }],
            "current_page": {
                "number": 2,
                "num_pages": 3,
                "previous_path": "/",
                "next_path": "/page-3",
            },
        });
        let index = IndexTemplate::from_context(&context);
        assert_eq!(index.title, "Flourish Test Site");
        assert_eq!(index.page_label.as_deref(), Some("Page 2 of 3"));
        assert_eq!(index.previous_path.as_deref(), Some("/"));
        assert_eq!(index.pages.len(), 1);

        let single = IndexTemplate::from_context(&json!({ "site": site() }));
        assert_eq!(single.page_label, None);
        assert!(single.pages.is_empty());
    }

    #[test]
    fn test_calendar_headings_and_links() {
        let year = CalendarTemplate::year(&json!({
            "site": site(),
            "year": "2016-01-01",
            "publication_dates": [
                { "month": "2016-02-01", "days": ["2016-02-29"] },
                { "month": "2016-06-01", "days": ["2016-06-04", "2016-06-06"] },
            ],
        }));
        assert_eq!(year.heading, "2016");
        assert_eq!(
            year.links,
            vec![
                ArchiveLink {
                    label: "February".to_string(),
                    href: "02/".to_string()
                },
                ArchiveLink {
                    label: "June".to_string(),
                    href: "06/".to_string()
                },
            ]
        );

        let month = CalendarTemplate::month(&json!({
            "site": site(),
            "month": "2016-06-01",
            "publication_dates": ["2016-06-04", "2016-06-06"],
        }));
        assert_eq!(month.heading, "June 2016");
        assert_eq!(month.links[0].label, "4th");
        assert_eq!(month.links[1].href, "06/");

        let day = CalendarTemplate::day(&json!({ "site": site(), "day": "2016-06-02" }));
        assert_eq!(day.heading, "2nd June 2016");
        assert!(day.links.is_empty());
    }
}
