//! Path patterns with `#token` placeholders.
//!
//! A pattern such as `/#year/#month/` resolves to a concrete path from token
//! values, and in reverse enumerates every combination of token values the
//! documents in a query actually support.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::Document;
use crate::query::{field_value, Condition, Operator, Query};
use crate::value::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Token values bound for one path.
pub type TokenSet = BTreeMap<String, Value>;

/// Suffix on a requested path meaning "this path or anything under it".
pub const WILDCARD: char = '?';

/// Tokens rendered as two-digit numbers.
const PADDED_TOKENS: &[&str] = &["month", "day"];

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
static TOKEN_TEXT_REGEX: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"#(\w+)").expect("valid token regex"))
}

fn token_text_regex() -> &'static Regex {
    TOKEN_TEXT_REGEX
        .get_or_init(|| Regex::new(r"^[\w-]+").expect("valid token text regex"))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Cannot resolve \"{pattern}\": no value given for token \"{token}\"")]
    MissingToken { pattern: String, token: String },

    #[error("Cannot resolve \"{pattern}\": token \"{token}\" has no usable value")]
    NoValue { pattern: String, token: String },

    #[error("Cannot resolve \"{pattern}\": token \"{token}\" must be numeric, got \"{value}\"")]
    NotNumeric {
        pattern: String,
        token: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let mut segments = Vec::new();
        let mut last = 0;
        for captures in token_regex().captures_iter(&pattern) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            segments.push(Segment::Literal(pattern[last..whole.start()].to_string()));
            segments.push(Segment::Token(name.as_str().to_string()));
            last = whole.end();
        }
        segments.push(Segment::Literal(pattern[last..].to_string()));
        Self { pattern, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Token names in pattern order.
    pub fn arguments(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Token(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn literals(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Token(_) => None,
            })
            .collect()
    }

    /// Substitute every token. `month` and `day` are zero-padded.
    pub fn resolve(&self, tokens: &TokenSet) -> Result<String, PathError> {
        let mut resolved = String::with_capacity(self.pattern.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => resolved.push_str(text),
                Segment::Token(name) => {
                    let value = tokens.get(name).ok_or_else(|| PathError::MissingToken {
                        pattern: self.pattern.clone(),
                        token: name.clone(),
                    })?;
                    resolved.push_str(&self.token_text(name, value)?);
                }
            }
        }
        Ok(resolved)
    }

    fn token_text(&self, name: &str, value: &Value) -> Result<String, PathError> {
        let text = value.as_token().ok_or_else(|| PathError::NoValue {
            pattern: self.pattern.clone(),
            token: name.to_string(),
        })?;
        if !PADDED_TOKENS.contains(&name) {
            return Ok(text);
        }
        match text.parse::<u32>() {
            Ok(number) => Ok(format!("{number:02}")),
            Err(_) => Err(PathError::NotNumeric {
                pattern: self.pattern.clone(),
                token: name.to_string(),
                value: text,
            }),
        }
    }

    /// Every combination of token values supported by the documents in
    /// `query`, sorted by the first token.
    ///
    /// Each token's candidate values are drawn from the documents already
    /// matching the tokens bound before it, so only real combinations appear.
    pub fn all_valid_filters(&self, query: &Query) -> Vec<TokenSet> {
        let arguments = self.arguments();
        if arguments.is_empty() {
            return vec![TokenSet::new()];
        }
        valid_filters_for_tokens(query, &arguments)
    }

    /// The token sets whose resolved path is `candidate`, or starts with it
    /// when `candidate` ends in `?`.
    pub fn can_generate(&self, candidate: &str, query: &Query) -> Vec<TokenSet> {
        if !self.might_generate(candidate) {
            return Vec::new();
        }

        let prefix = candidate.strip_suffix(WILDCARD);
        self.all_valid_filters(query)
            .into_iter()
            .filter(|tokens| match self.resolve(tokens) {
                Ok(path) => path == candidate || prefix.is_some_and(|p| path.starts_with(p)),
                Err(_) => false,
            })
            .collect()
    }

    /// Cheap rejection: walk the candidate looking for each literal part of
    /// the pattern in turn, skipping a run of token-like text after each.
    fn might_generate(&self, candidate: &str) -> bool {
        let literals = self.literals();
        let (last, leading) = match literals.split_last() {
            Some(split) => split,
            None => return false,
        };

        let mut rest = candidate;
        for literal in leading {
            let Some(pos) = rest.find(literal) else {
                return false;
            };
            rest = &rest[pos + literal.len()..];
            if let Some(token) = token_text_regex().find(rest) {
                rest = &rest[token.end()..];
            }
        }

        match rest.strip_suffix(WILDCARD) {
            Some(partial) => last.contains(partial),
            None => rest.ends_with(last),
        }
    }

    /// Path of a single document, taking each token from its attributes (the
    /// first element of a list). A document lacking a value gets no path and
    /// a diagnostic.
    pub fn document_path(&self, document: &Document, diagnostics: &Diagnostics) -> Option<String> {
        let mut tokens = TokenSet::new();
        for argument in self.arguments() {
            let value = match field_value(document, argument).into_owned() {
                Value::List(items) => items.into_iter().next().map(Value::String),
                Value::Missing => None,
                value => Some(value),
            };
            let Some(value) = value else {
                diagnostics.push(
                    Diagnostic::warning(
                        "path.missing_value",
                        format!(
                            "cannot create URL for \"{}\": no value for \"{}\"",
                            document.slug(),
                            argument
                        ),
                    )
                    .with_slug(document.slug()),
                );
                return None;
            };
            tokens.insert(argument.to_string(), value);
        }

        match self.resolve(&tokens) {
            Ok(path) => Some(path),
            Err(err) => {
                diagnostics.push(
                    Diagnostic::warning("path.unresolvable", err.to_string())
                        .with_slug(document.slug()),
                );
                None
            }
        }
    }
}

fn valid_filters_for_tokens(query: &Query, tokens: &[&str]) -> Vec<TokenSet> {
    let Some((first, remaining)) = tokens.split_first() else {
        return vec![TokenSet::new()];
    };

    let mut filters = Vec::new();
    for value in query.distinct_values(first) {
        if remaining.is_empty() {
            filters.push(TokenSet::from([(first.to_string(), value)]));
            continue;
        }

        let narrowed = query.filter_by(Condition::new(*first, Operator::Eq, value.clone()));
        for mut tokens in valid_filters_for_tokens(&narrowed, remaining) {
            tokens.insert(first.to_string(), value.clone());
            filters.push(tokens);
        }
    }
    filters
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        PathPattern::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pairs: &[(&str, &str)]) -> TokenSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_arguments() {
        assert!(PathPattern::new("/").arguments().is_empty());
        assert_eq!(PathPattern::new("/#slug").arguments(), vec!["slug"]);
        assert_eq!(
            PathPattern::new("/#year/#month/#day/").arguments(),
            vec!["year", "month", "day"]
        );
        assert_eq!(PathPattern::new("/css/#slug.css").arguments(), vec!["slug"]);
    }

    #[test]
    fn test_resolve() {
        let pattern = PathPattern::new("/tags/#tag/#slug");
        assert_eq!(
            pattern
                .resolve(&tokens(&[("tag", "first"), ("slug", "series/part-one")]))
                .unwrap(),
            "/tags/first/series/part-one"
        );
    }

    #[test]
    fn test_resolve_pads_month_and_day() {
        let pattern = PathPattern::new("/#year/#month/#day/");
        let mut set = tokens(&[("year", "2016"), ("day", "4")]);
        set.insert("month".to_string(), Value::from(6));
        assert_eq!(pattern.resolve(&set).unwrap(), "/2016/06/04/");

        let bad = tokens(&[("year", "2016"), ("month", "june"), ("day", "4")]);
        assert!(matches!(
            pattern.resolve(&bad),
            Err(PathError::NotNumeric { token, .. }) if token == "month"
        ));
    }

    #[test]
    fn test_resolve_missing_token() {
        let pattern = PathPattern::new("/#slug");
        assert_eq!(
            pattern.resolve(&TokenSet::new()).unwrap_err(),
            PathError::MissingToken {
                pattern: "/#slug".to_string(),
                token: "slug".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_none_value() {
        let pattern = PathPattern::new("/#slug");
        let mut set = TokenSet::new();
        set.insert("slug".to_string(), Value::Missing);
        assert!(matches!(
            pattern.resolve(&set),
            Err(PathError::NoValue { .. })
        ));
    }

    #[test]
    fn test_numeric_tokens_enumerate_in_numeric_order() {
        use crate::store::Collection;
        use parking_lot::RwLock;
        use std::sync::Arc;
        use std::time::SystemTime;

        let mut collection = Collection::default();
        for (slug, part) in [("c", 10), ("a", 2), ("b", 9)] {
            collection.insert(Arc::new(Document::new(
                slug,
                format!("{slug}.toml"),
                SystemTime::UNIX_EPOCH,
                [("part".to_string(), Value::from(part))].into(),
            )));
        }
        let query = Query::new(Arc::new(RwLock::new(collection)), Diagnostics::new());

        let pattern = PathPattern::new("/parts/#part");
        let paths: Vec<String> = pattern
            .all_valid_filters(&query)
            .iter()
            .map(|tokens| pattern.resolve(tokens).unwrap())
            .collect();
        assert_eq!(paths, vec!["/parts/2", "/parts/9", "/parts/10"]);
    }

    #[test]
    fn test_prefilter_rejects_without_enumerating() {
        let pattern = PathPattern::new("/tags/#tag/index.atom");
        assert!(pattern.might_generate("/tags/first/index.atom"));
        assert!(pattern.might_generate("/tags/?"));
        assert!(!pattern.might_generate("/2016/06/"));
        assert!(!pattern.might_generate("/tags/first/"));

        let homepage = PathPattern::new("/");
        assert!(homepage.might_generate("/"));
        assert!(homepage.might_generate("/?"));
        assert!(!homepage.might_generate("/index.atom"));
    }
}
