//! [`Renderer`] implementations.

use crate::templates::{CalendarTemplate, IndexTemplate, PageTemplate};
use askama::Template;
use flourish_core::{RenderError, Renderer};
use serde_json::{json, Value as JsonValue};

/// Renders the built-in Askama templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl BuiltinRenderer {
    /// Template names this renderer answers to.
    pub const TEMPLATES: &'static [&'static str] = &[
        "page.html",
        "index.html",
        "calendar_year.html",
        "calendar_month.html",
        "calendar_day.html",
    ];

    pub fn new() -> Self {
        Self
    }
}

impl Renderer for BuiltinRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String, RenderError> {
        let rendered = match template {
            "page.html" => PageTemplate::from_context(context).render(),
            "index.html" => IndexTemplate::from_context(context).render(),
            "calendar_year.html" => CalendarTemplate::year(context).render(),
            "calendar_month.html" => CalendarTemplate::month(context).render(),
            "calendar_day.html" => CalendarTemplate::day(context).render(),
            other => return Err(RenderError::TemplateNotFound(other.to_string())),
        };
        rendered.map_err(|err| RenderError::Failed {
            template: template.to_string(),
            message: err.to_string(),
        })
    }
}

/// Writes the template name and context as pretty JSON instead of HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String, RenderError> {
        tracing::debug!(template, "Writing context as JSON");
        let mut output = serde_json::to_string_pretty(&json!({
            "template": template,
            "context": context,
        }))?;
        output.push('\n');
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> JsonValue {
        json!({
            "title": "Flourish Test Site",
            "author": "Wendy Testaburger",
            "base_url": "http://localhost:8000",
        })
    }

    #[test]
    fn test_render_page() {
        let context = json!({
            "site": site(),
            "global": { "copyright": "2015\u{2013}2016" },
            "title": "Tom & Jerry",
            "published": "2015-12-25T12:30:00+00:00",
            "tag": ["cartoons"],
            "body": "<p>Chase.</p>",
        });
        let html = BuiltinRenderer.render("page.html", &context).unwrap();

        assert!(html.contains("Jerry</h1>"));
        assert!(!html.contains("Tom & Jerry"));
        assert!(html.contains("<p>Chase.</p>"));
        assert!(html.contains("<time>25 December 2015</time>"));
        assert!(html.contains("<li>cartoons</li>"));
        assert!(html.contains("&copy; 2015\u{2013}2016 Wendy Testaburger"));
    }

    #[test]
    fn test_render_paginated_index() {
        let context = json!({
            "site": site(),
            "pages": [
                {
                    "title": "Part one",
                    "path": "/series/part-one",
                    "published": "2016-06-06T12:30:00+00:00",
                },
            ],
            "current_page": { "number": 1, "num_pages": 2, "next_path": "/page-2" },
        });
        let html = BuiltinRenderer.render("index.html", &context).unwrap();

        assert!(html.contains("<a href=\"/series/part-one\">Part one</a>"));
        assert!(html.contains("<span>Page 1 of 2</span>"));
        assert!(html.contains("rel=\"next\" href=\"/page-2\""));
        assert!(!html.contains("rel=\"prev\""));
    }

    #[test]
    fn test_render_calendar_month() {
        let context = json!({
            "site": site(),
            "month": "2016-06-01",
            "publication_dates": ["2016-06-04"],
            "pages": [],
        });
        let html = BuiltinRenderer.render("calendar_month.html", &context).unwrap();
        assert!(html.contains("<h1>June 2016</h1>"));
        assert!(html.contains("<a href=\"04/\">4th</a>"));
    }

    #[test]
    fn test_unknown_template() {
        let err = BuiltinRenderer.render("article.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "article.html"));
    }

    #[test]
    fn test_json_renderer() {
        let output = JsonRenderer
            .render("page.html", &json!({ "title": "Thing one" }))
            .unwrap();
        insta::assert_snapshot!(output, @r#"
        {
          "context": {
            "title": "Thing one"
          },
          "template": "page.html"
        }
        "#);
    }
}
