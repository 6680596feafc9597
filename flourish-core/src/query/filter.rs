//! Filter conditions and the operator table.

use super::QueryError;
use crate::document::{Document, PUBLISHED};
use crate::value::Value;
use chrono::Datelike;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Field names that read a component of the publication timestamp.
const DATE_FIELDS: &[&str] = &["year", "month", "day"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal, or a member of a list-valued field.
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Substring of a string, or of any element of a list.
    Contains,
    Excludes,
    /// The field's value is a member of the test collection.
    In,
    NotIn,
    Set,
    Unset,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Contains => "contains",
            Operator::Excludes => "excludes",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Set => "set",
            Operator::Unset => "unset",
        }
    }

    /// The operator selecting exactly the documents this one rejects.
    pub fn inverse(self) -> Operator {
        match self {
            Operator::Eq => Operator::Neq,
            Operator::Neq => Operator::Eq,
            Operator::Lt => Operator::Gte,
            Operator::Lte => Operator::Gt,
            Operator::Gt => Operator::Lte,
            Operator::Gte => Operator::Lt,
            Operator::Contains => Operator::Excludes,
            Operator::Excludes => Operator::Contains,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::Set => Operator::Unset,
            Operator::Unset => Operator::Set,
        }
    }

    pub fn evaluate(self, value: &Value, test: &Value) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::Eq => value.equals_or_contains(test),
            Operator::Neq => !value.equals_or_contains(test),
            Operator::Lt => matches!(value.compare(test), Some(Less)),
            Operator::Lte => matches!(value.compare(test), Some(Less | Equal)),
            Operator::Gt => matches!(value.compare(test), Some(Greater)),
            Operator::Gte => matches!(value.compare(test), Some(Greater | Equal)),
            Operator::Contains => value.contains_text(test),
            Operator::Excludes => !value.contains_text(test),
            Operator::In => value.is_in(test),
            Operator::NotIn => !value.is_in(test),
            Operator::Set => !value.is_missing(),
            Operator::Unset => value.is_missing(),
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "contains" => Operator::Contains,
            "excludes" => Operator::Excludes,
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            "set" => Operator::Set,
            "unset" => Operator::Unset,
            other => return Err(QueryError::UnknownOperator(other.to_string())),
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parse a lookup key such as `tag`, `published__lt` or `series__set`.
    ///
    /// ```
    /// use flourish_core::{Condition, Operator};
    ///
    /// let condition = Condition::parse("published__lt", "2016").unwrap();
    /// assert_eq!(condition.field, "published");
    /// assert_eq!(condition.operator, Operator::Lt);
    ///
    /// assert!(Condition::parse("title__like", "x").is_err());
    /// ```
    pub fn parse(key: &str, value: impl Into<Value>) -> Result<Self, QueryError> {
        let (field, operator) = match key.split_once("__") {
            Some((field, operator)) => (field, operator.parse()?),
            None => (key, Operator::Eq),
        };
        Ok(Self::new(field, operator, value))
    }

    pub fn inverted(&self) -> Self {
        Self {
            field: self.field.clone(),
            operator: self.operator.inverse(),
            value: self.value.clone(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.operator
            .evaluate(&field_value(document, &self.field), &self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}={}", self.field, self.operator, self.value)
    }
}

/// The value a document presents for `field` during filtering.
///
/// `year`, `month` and `day` read the publication timestamp, zero-padded to
/// two digits, when the document has one.
pub(crate) fn field_value<'a>(document: &'a Document, field: &str) -> Cow<'a, Value> {
    if DATE_FIELDS.contains(&field) {
        if let Some(published) = document.datetime(PUBLISHED) {
            let component = match field {
                "year" => published.year() as u32,
                "month" => published.month(),
                _ => published.day(),
            };
            return Cow::Owned(Value::String(format!("{component:02}")));
        }
    }
    Cow::Borrowed(document.get(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_is_an_involution() {
        for name in [
            "eq", "neq", "lt", "lte", "gt", "gte", "contains", "excludes", "in", "notin", "set",
            "unset",
        ] {
            let op: Operator = name.parse().unwrap();
            assert_eq!(op.inverse().inverse(), op);
            assert_ne!(op.inverse(), op);
        }
    }

    #[test]
    fn test_parse_bare_key_is_eq() {
        let condition = Condition::parse("tag", "first").unwrap();
        assert_eq!(condition.operator, Operator::Eq);
        assert_eq!(condition.to_string(), "tag__eq=first");
    }

    #[test]
    fn test_unknown_operator() {
        let err = Condition::parse("title__startswith", "x").unwrap_err();
        assert!(matches!(err, QueryError::UnknownOperator(op) if op == "startswith"));
    }

    #[test]
    fn test_uncomparable_is_non_match() {
        let value = Value::from("2016");
        let test = Value::from(2016);
        for op in [Operator::Lt, Operator::Lte, Operator::Gt, Operator::Gte] {
            assert!(!op.evaluate(&value, &test));
        }
        assert!(!Operator::Lt.evaluate(&Value::Missing, &test));
    }

    #[test]
    fn test_missing_values() {
        let test = Value::from("x");
        assert!(!Operator::Eq.evaluate(&Value::Missing, &test));
        assert!(Operator::Neq.evaluate(&Value::Missing, &test));
        assert!(Operator::Excludes.evaluate(&Value::Missing, &test));
        assert!(Operator::Unset.evaluate(&Value::Missing, &test));
        assert!(!Operator::Set.evaluate(&Value::Missing, &test));
    }
}
