//! CSV exports.

use super::{GenerateError, GeneratorKind, PageOutput, Renderer, Route};
use crate::document::Document;
use crate::site::Site;
use crate::value::Value;
use chrono::SecondsFormat;
use serde_json::Value as JsonValue;
use std::sync::Arc;

const DEFAULT_FIELDS: &[&str] = &["title", "published"];

/// The selected documents as CSV, one row each.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvKind;

impl GeneratorKind for CsvKind {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn file_extension(&self) -> &'static str {
        ".csv"
    }

    fn uses_template(&self) -> bool {
        false
    }

    fn render(
        &self,
        _site: &Site,
        route: &Route,
        page: &PageOutput,
        _context: &JsonValue,
        _template: Option<&str>,
        _renderer: &dyn Renderer,
    ) -> Result<String, GenerateError> {
        let fields: Vec<&str> = if route.fields().is_empty() {
            DEFAULT_FIELDS.to_vec()
        } else {
            route.fields().iter().map(String::as_str).collect()
        };
        write_rows(&fields, &page.documents).map_err(|source| GenerateError::Io {
            path: page.path.clone().into(),
            source,
        })
    }
}

fn write_rows(fields: &[&str], documents: &[Arc<Document>]) -> Result<String, std::io::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    for document in documents {
        writer.write_record(fields.iter().map(|field| cell(document.get(field))))?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Lists are sorted and joined with `:`; UTC timestamps end in `Z`.
fn cell(value: &Value) -> String {
    match value {
        Value::List(items) => {
            let mut items = items.clone();
            items.sort();
            items.join(":")
        }
        Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::time::SystemTime;

    fn doc(slug: &str, attributes: Vec<(&str, Value)>) -> Arc<Document> {
        let attributes: BTreeMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Arc::new(Document::new(
            slug,
            format!("{slug}.toml"),
            SystemTime::UNIX_EPOCH,
            attributes,
        ))
    }

    #[test]
    fn test_export_rows() {
        let documents = vec![
            doc(
                "basic-page",
                vec![
                    ("title", "A basic page".into()),
                    (
                        "published",
                        Utc.with_ymd_and_hms(2015, 12, 25, 12, 30, 0).unwrap().into(),
                    ),
                    ("tag", vec!["basic-page", "basic"].into()),
                ],
            ),
            doc(
                "nothing",
                vec![("title", "Nothing, really".into())],
            ),
        ];

        let output = write_rows(&["slug", "title", "published", "tag"], &documents).unwrap();
        insta::assert_snapshot!(output, @r#"
        slug,title,published,tag
        basic-page,A basic page,2015-12-25T12:30:00Z,basic:basic-page
        nothing,"Nothing, really",,
        "#);
    }

    #[test]
    fn test_cells() {
        assert_eq!(cell(&Value::Missing), "");
        assert_eq!(cell(&Value::from(vec!["b", "a"])), "a:b");
        assert_eq!(cell(&Value::Integer(3)), "3");
    }
}
