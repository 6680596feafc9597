//! TOML front matter in Markdown sources.
//!
//! A Markdown file may open with a `---` line; everything up to the next
//! `---` line is TOML, the rest is the Markdown body.

use thiserror::Error;

const DELIMITER: &str = "---\n";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("no end marker for the front matter")]
    Unterminated,

    #[error("Invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Split content into the raw front matter block (if any) and the body.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return Ok((None, content));
    };

    if let Some(body) = rest.strip_prefix(DELIMITER) {
        return Ok((Some(""), body));
    }

    match rest.find("\n---\n") {
        Some(end) => Ok((Some(&rest[..end + 1]), &rest[end + 1 + DELIMITER.len()..])),
        None => Err(FrontmatterError::Unterminated),
    }
}

/// Parse front matter into a TOML table, returning it with the body.
///
/// Content without front matter yields an empty table and the full content.
///
/// # Example
///
/// ```
/// use flourish_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle = \"My Post\"\n---\n# Hello World\n";
///
/// let (table, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(table["title"].as_str(), Some("My Post"));
/// assert_eq!(body, "# Hello World\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(toml::Table, String), FrontmatterError> {
    let (block, body) = split_frontmatter(content)?;
    let table = match block {
        Some(block) => block.parse::<toml::Table>()?,
        None => toml::Table::new(),
    };
    Ok((table, body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_frontmatter() {
        let content = r#"---
title = "Series, part two"
tag = ["series", "second"]
---
The body, in *Markdown*.
"#;

        let (table, body) = parse_frontmatter(content).unwrap();
        assert_eq!(table["title"].as_str(), Some("Series, part two"));
        assert_eq!(table["tag"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(body, "The body, in *Markdown*.\n");
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "Just a body.\n";
        let (table, body) = parse_frontmatter(content).unwrap();
        assert!(table.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_frontmatter() {
        let (table, body) = parse_frontmatter("---\n---\nbody\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(body, "body\n");
    }

    #[test]
    fn test_unterminated_frontmatter() {
        let content = "---\ntitle = \"oops\"\nno end here\n";
        assert!(matches!(
            parse_frontmatter(content),
            Err(FrontmatterError::Unterminated)
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let content = "---\ntitle = \n---\nbody\n";
        assert!(matches!(
            parse_frontmatter(content),
            Err(FrontmatterError::TomlError(_))
        ));
    }
}
