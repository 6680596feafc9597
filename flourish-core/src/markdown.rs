//! Markdown to HTML conversion with a bounded fragment cache.

use lru::LruCache;
use parking_lot::Mutex;
use pulldown_cmark::{html, Options, Parser};
use std::num::NonZeroUsize;

const FRAGMENT_CACHE_CAPACITY: usize = 512;

/// Markdown processor owning the cache of converted fragments.
///
/// One processor lives for one generation run; it is dropped with the store
/// that owns it.
pub struct MarkdownProcessor {
    options: Options,
    cache: Mutex<LruCache<String, String>>,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        Self::with_capacity(FRAGMENT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            options,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Convert Markdown to HTML, reusing a previous conversion of identical
    /// content.
    pub fn convert(&self, markdown: &str) -> String {
        if let Some(hit) = self.cache.lock().get(markdown) {
            return hit.clone();
        }

        let parser = Parser::new_ext(markdown, self.options);
        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);

        self.cache.lock().put(markdown.to_string(), html_output.clone());
        html_output
    }

    pub fn cached_fragments(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownProcessor")
            .field("cached_fragments", &self.cached_fragments())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_basic() {
        let processor = MarkdownProcessor::new();
        let html = processor.convert("A *basic* page.");
        assert_eq!(html, "<p>A <em>basic</em> page.</p>\n");
    }

    #[test]
    fn test_identical_content_is_cached_once() {
        let processor = MarkdownProcessor::new();
        let first = processor.convert("# Heading");
        let second = processor.convert("# Heading");
        assert_eq!(first, second);
        assert_eq!(processor.cached_fragments(), 1);
    }

    #[test]
    fn test_distinct_content_never_shares_an_entry() {
        let processor = MarkdownProcessor::new();
        let inputs = ["*a*", "*b*", "*a* ", "**a**"];
        let html: Vec<String> = inputs.iter().map(|md| processor.convert(md)).collect();
        assert_eq!(processor.cached_fragments(), inputs.len());
        for (input, converted) in inputs.iter().zip(&html) {
            assert_eq!(&processor.convert(input), converted);
        }
        assert_eq!(html[1], "<p><em>b</em></p>\n");
        assert_eq!(html[3], "<p><strong>a</strong></p>\n");
        assert_eq!(processor.cached_fragments(), inputs.len());
    }

    #[test]
    fn test_cache_is_bounded() {
        let processor = MarkdownProcessor::with_capacity(2);
        processor.convert("one");
        processor.convert("two");
        processor.convert("three");
        assert_eq!(processor.cached_fragments(), 2);
    }
}
