//! Atom feeds.

use super::{GenerateError, GeneratorKind, PageOutput, Renderer, Route};
use crate::document::PUBLISHED;
use crate::path::TokenSet;
use crate::query::{Condition, Operator, Query};
use crate::site::Site;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

const FEED_LIMIT: usize = 20;

/// Already-published documents, newest first, written as Atom XML.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomKind;

impl GeneratorKind for AtomKind {
    fn name(&self) -> &'static str {
        "atom"
    }

    fn file_extension(&self) -> &'static str {
        ".atom"
    }

    fn uses_template(&self) -> bool {
        false
    }

    fn default_order_by(&self) -> &'static [&'static str] {
        &["-published"]
    }

    fn default_limit(&self) -> Option<usize> {
        Some(FEED_LIMIT)
    }

    fn required_config_keys(&self) -> &'static [&'static str] {
        &["author", "base_url", "title"]
    }

    fn select(
        &self,
        site: &Site,
        route: &Route,
        tokens: &TokenSet,
    ) -> Result<Option<Query>, GenerateError> {
        let published = route.sources(&site.sources()).filter_by(Condition::new(
            PUBLISHED,
            Operator::Lt,
            Utc::now(),
        ));
        Ok(Some(route.selection(&published, tokens)))
    }

    fn render(
        &self,
        site: &Site,
        _route: &Route,
        page: &PageOutput,
        _context: &JsonValue,
        _template: Option<&str>,
        _renderer: &dyn Renderer,
    ) -> Result<String, GenerateError> {
        let config = site.config();
        let feed_url = format!("{}{}", config.base_url, page.path);
        let mut last_updated = DateTime::<Utc>::default().fixed_offset();

        let mut entries = String::new();
        for document in &page.documents {
            let (Some(published), Some(link)) =
                (document.published(), site.absolute_path(document))
            else {
                continue;
            };
            let updated = document.datetime("updated").unwrap_or(published);
            last_updated = last_updated.max(published).max(updated);

            let author = document.str("author").unwrap_or(&config.author);
            entries.push_str(&format!(
                r#"  <entry>
    <id>{link}</id>
    <title>{title}</title>
    <updated>{updated}</updated>
    <author>
      <name>{author}</name>
    </author>
    <content type="html">{content}</content>
    <link href="{link}" rel="alternate"/>
    <published>{published}</published>
  </entry>
"#,
                link = escape_xml(&link),
                title = escape_xml(&document.text_or_empty("title")),
                updated = timestamp(updated),
                author = escape_xml(author),
                content = escape_xml(&document.text_or_empty("body")),
                published = timestamp(published),
            ));
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>{feed_url}</id>
  <title>{title}</title>
  <updated>{updated}</updated>
  <author>
    <name>{author}</name>
  </author>
  <link href="{feed_url}" rel="self"/>
  <link href="{base_url}" rel="alternate"/>
{entries}</feed>
"#,
            feed_url = escape_xml(&feed_url),
            title = escape_xml(&config.title),
            updated = timestamp(last_updated),
            author = escape_xml(&config.author),
            base_url = escape_xml(&config.base_url),
            entries = entries,
        ))
    }
}

fn timestamp(value: DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
