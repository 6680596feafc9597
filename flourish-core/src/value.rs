//! Typed attribute values.
//!
//! Every document attribute is one of a small set of variants. Accessors on
//! [`crate::Document`] hand back [`Value::Missing`] for absent keys instead of
//! failing, so filtering and sorting code can treat "absent" as a value.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    List(Vec<String>),
    #[default]
    Missing,
}

fn iso8601_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})$")
            .expect("valid timestamp regex")
    })
}

/// Parse an ISO-8601 timestamp string as found in JSON and CSV sources.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if !iso8601_regex().is_match(text) {
        return None;
    }
    DateTime::parse_from_rfc3339(&text.replacen(' ', "T", 1)).ok()
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Text used when a value is substituted into a path. Lists and missing
    /// values have no single textual form.
    pub fn as_token(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(dt.to_rfc3339()),
            Value::List(_) | Value::Missing => None,
        }
    }

    /// Equality, or membership when `self` is a list.
    pub fn equals_or_contains(&self, test: &Value) -> bool {
        match (self, test) {
            (Value::Missing, _) => false,
            (Value::List(items), Value::String(s)) => items.iter().any(|item| item == s),
            (Value::List(_), Value::List(_)) => self == test,
            (Value::List(_), _) => false,
            _ => self.compare(test) == Some(Ordering::Equal),
        }
    }

    /// Ordering between two values of the same class. Values of different
    /// classes, and missing values, are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Substring test on a string, or on any element of a list.
    pub fn contains_text(&self, test: &Value) -> bool {
        let Some(needle) = test.as_str() else {
            return false;
        };
        match self {
            Value::String(s) => s.contains(needle),
            Value::List(items) => items.iter().any(|item| item.contains(needle)),
            _ => false,
        }
    }

    /// Membership of `self` in the collection `test`. A string collection is
    /// searched as text.
    pub fn is_in(&self, test: &Value) -> bool {
        match (self, test) {
            (Value::Missing, _) => false,
            (_, Value::List(items)) => match self.as_token() {
                Some(token) if !matches!(self, Value::DateTime(_)) => {
                    items.iter().any(|item| *item == token)
                }
                _ => false,
            },
            (Value::String(s), Value::String(haystack)) => haystack.contains(s.as_str()),
            _ => false,
        }
    }

    /// Rank used to decide whether a set of values can be totally ordered.
    /// Integers and floats share a rank.
    pub(crate) fn sort_class(&self) -> Option<u8> {
        match self {
            Value::String(_) => Some(0),
            Value::Integer(_) | Value::Float(_) => Some(1),
            Value::Boolean(_) => Some(2),
            Value::DateTime(_) => Some(3),
            Value::List(_) => Some(4),
            Value::Missing => None,
        }
    }

    /// Convert a parsed TOML value. Tables have no attribute form and yield
    /// `None`.
    pub fn from_toml(value: toml::Value) -> Option<Value> {
        match value {
            toml::Value::String(s) => Some(Value::String(s)),
            toml::Value::Integer(i) => Some(Value::Integer(i)),
            toml::Value::Float(f) => Some(Value::Float(f)),
            toml::Value::Boolean(b) => Some(Value::Boolean(b)),
            toml::Value::Datetime(dt) => Some(match toml_datetime(&dt) {
                Some(converted) => Value::DateTime(converted),
                None => Value::String(dt.to_string()),
            }),
            toml::Value::Array(items) => Some(Value::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        toml::Value::String(s) => Some(s),
                        toml::Value::Table(_) => None,
                        other => Value::from_toml(other).and_then(|v| v.as_token()),
                    })
                    .collect(),
            )),
            toml::Value::Table(_) => None,
        }
    }

    /// Convert a parsed JSON value. Objects yield `None`; `null` is missing.
    pub fn from_json(value: serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => Some(Value::Missing),
            serde_json::Value::Bool(b) => Some(Value::Boolean(b)),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            serde_json::Value::String(s) => Some(Value::from_text(s)),
            serde_json::Value::Array(items) => Some(Value::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s),
                        serde_json::Value::Object(_) | serde_json::Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect(),
            )),
            serde_json::Value::Object(_) => None,
        }
    }

    /// A plain text cell, promoted to a timestamp when it looks like one.
    pub fn from_text(text: String) -> Value {
        match parse_timestamp(&text) {
            Some(dt) => Value::DateTime(dt),
            None => Value::String(text),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn toml_datetime(dt: &toml::value::Datetime) -> Option<DateTime<FixedOffset>> {
    let date = dt.date?;
    let date = NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())?;
    let time = match dt.time {
        Some(t) => NaiveTime::from_hms_nano_opt(
            t.hour.into(),
            t.minute.into(),
            t.second.into(),
            t.nanosecond,
        )?,
        None => NaiveTime::MIN,
    };
    // local datetimes and bare dates are read as UTC
    let offset = match dt.offset {
        Some(toml::value::Offset::Custom { minutes }) => {
            FixedOffset::east_opt(i32::from(minutes) * 60)?
        }
        Some(toml::value::Offset::Z) | None => FixedOffset::east_opt(0)?,
    };
    offset.from_local_datetime(&date.and_time(time)).single()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Value::List(items) => f.write_str(&items.join(", ")),
            Value::Missing => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Missing => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt.fixed_offset())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(items: [&str; N]) -> Self {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> Value {
        Value::from(Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    #[test]
    fn test_list_membership() {
        let tags = Value::from(vec!["first", "second"]);
        assert!(tags.equals_or_contains(&Value::from("first")));
        assert!(!tags.equals_or_contains(&Value::from("third")));
        assert!(!Value::Missing.equals_or_contains(&Value::from("first")));
    }

    #[test]
    fn test_cross_class_comparison_is_none() {
        assert_eq!(Value::from("a").compare(&Value::from(1)), None);
        assert_eq!(Value::from(1).compare(&Value::from(1.5)), Some(Ordering::Less));
        assert_eq!(Value::Missing.compare(&Value::Missing), None);
        assert_eq!(
            Value::from(f64::NAN).compare(&Value::from(1.0)),
            None,
            "NaN never orders"
        );
    }

    #[test]
    fn test_contains_text() {
        assert!(Value::from("Hello World").contains_text(&Value::from("World")));
        assert!(Value::from(vec!["alpha", "beta"]).contains_text(&Value::from("et")));
        assert!(!Value::from(12).contains_text(&Value::from("1")));
    }

    #[test]
    fn test_is_in() {
        let options = Value::from(vec!["basic-page", "nothing"]);
        assert!(Value::from("nothing").is_in(&options));
        assert!(!Value::from("thing-one").is_in(&options));
        assert!(Value::from("ell").is_in(&Value::from("hello")));
        assert!(!Value::Missing.is_in(&options));
    }

    #[test]
    fn test_toml_datetime_offsets() {
        let doc: toml::Table =
            toml::from_str("a = 2016-06-04T12:30:00Z\nb = 2016-06-04\nc = 2016-06-04T13:30:00+01:00")
                .unwrap();
        let a = Value::from_toml(doc["a"].clone()).unwrap();
        let b = Value::from_toml(doc["b"].clone()).unwrap();
        let c = Value::from_toml(doc["c"].clone()).unwrap();

        assert_eq!(a, utc(2016, 6, 4, 12, 30));
        assert_eq!(b, utc(2016, 6, 4, 0, 0));
        assert_eq!(a.compare(&c), Some(Ordering::Equal));
    }

    #[test]
    fn test_toml_table_is_skipped() {
        let doc: toml::Table = toml::from_str("[nested]\nkey = 1").unwrap();
        assert_eq!(Value::from_toml(doc["nested"].clone()), None);
    }

    #[test]
    fn test_json_timestamps() {
        let value = Value::from_json(serde_json::json!("2016-06-04T12:30:00Z")).unwrap();
        assert_eq!(value, utc(2016, 6, 4, 12, 30));

        let spaced = Value::from_json(serde_json::json!("2016-06-04 12:30:00Z")).unwrap();
        assert_eq!(spaced, utc(2016, 6, 4, 12, 30));

        let plain = Value::from_json(serde_json::json!("2016-06-04")).unwrap();
        assert_eq!(plain, Value::from("2016-06-04"));
    }

    #[test]
    fn test_serialize_to_json() {
        assert_eq!(utc(2016, 6, 4, 12, 30).to_json(), serde_json::json!("2016-06-04T12:30:00+00:00"));
        assert_eq!(Value::Missing.to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::from(vec!["a", "b"]).to_json(),
            serde_json::json!(["a", "b"])
        );
    }
}
