// ABOUTME: Chapter body extraction: selector cascade, then a link-density gated block scan.
// ABOUTME: Returns normalized text, or None when no block is long enough to be the body.

//! Chapter content extraction.
//!
//! 1. Selector cascade over `content_selectors`; the first matched element
//!    with more than [`SELECTOR_MIN_CHARS`] characters wins.
//! 2. Density fallback over `div`/`article`/`section` blocks (keyword-classed
//!    ones when any exist, all of them otherwise): the first block with more
//!    than [`DENSITY_MIN_CHARS`] characters and fewer than
//!    [`DENSITY_MAX_LINKS`] descendant links wins.
//! 3. The winner's text is normalized into an [`ExtractedText`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::extractors::compiled::get_or_compile;
use crate::extractors::select::{cascade, char_len, trimmed_text};
use crate::page::Page;
use crate::patterns::Patterns;

/// Minimum characters (exclusive) for a selector-matched body.
pub const SELECTOR_MIN_CHARS: usize = 200;
/// Minimum characters (exclusive) for a density-fallback body.
pub const DENSITY_MIN_CHARS: usize = 500;
/// Density-fallback blocks must have fewer descendant links than this.
pub const DENSITY_MAX_LINKS: usize = 10;

const BLOCK_SELECTOR: &str = "div, article, section";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Chapter body text with whitespace runs turned into single newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Normalizes raw element text.
    pub fn normalize(raw: &str) -> Self {
        let collapsed = WHITESPACE_RUN.replace_all(raw.trim(), "\n");
        let paragraphs = BLANK_LINES.replace_all(&collapsed, "\n\n");
        Self(paragraphs.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the main text of a chapter page.
pub fn extract_content(page: &Page, patterns: &Patterns) -> Option<ExtractedText> {
    let raw = cascade(page, &patterns.content_selectors, |css, el| {
        let text = trimmed_text(&el);
        if char_len(&text) <= SELECTOR_MIN_CHARS {
            return None;
        }
        tracing::debug!(selector = css, chars = char_len(&text), "content from selector");
        Some(text)
    })
    .or_else(|| densest_block(page, patterns))?;

    Some(ExtractedText::normalize(&raw))
}

fn densest_block(page: &Page, patterns: &Patterns) -> Option<String> {
    let blocks = page.select_all(BLOCK_SELECTOR);
    let keyed: Vec<ElementRef<'_>> = blocks
        .iter()
        .filter(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| patterns.content_class_re.is_match(class))
        })
        .copied()
        .collect();
    let candidates = if keyed.is_empty() { blocks } else { keyed };

    candidates.iter().find_map(|el| {
        let text = trimmed_text(el);
        if char_len(&text) <= DENSITY_MIN_CHARS {
            return None;
        }
        let links = count_links(el);
        if links >= DENSITY_MAX_LINKS {
            return None;
        }
        tracing::debug!(chars = char_len(&text), links, "content from density fallback");
        Some(text)
    })
}

fn count_links(el: &ElementRef<'_>) -> usize {
    match get_or_compile("a") {
        Some(sel) => el.select(&sel).count(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Option<String> {
        let page = Page::parse(html, "http://example.com/8_8426/1.html");
        extract_content(&page, &Patterns::builtin()).map(ExtractedText::into_string)
    }

    fn prose(chars: usize) -> String {
        "字".repeat(chars)
    }

    fn links(n: usize) -> String {
        (0..n).map(|i| format!(r#"<a href="/{i}.html">L</a>"#)).collect()
    }

    #[test]
    fn selector_match_above_threshold_is_accepted() {
        let body = prose(201);
        let html = format!(r#"<html><body><div id="content">  {body}  </div></body></html>"#);
        assert_eq!(extract(&html), Some(body));
    }

    #[test]
    fn short_selector_match_falls_through_to_next_selector() {
        let body = prose(250);
        let html = format!(
            r#"<html><body><div id="content">short</div><div class="content">{body}</div></body></html>"#
        );
        assert_eq!(extract(&html), Some(body));
    }

    #[test]
    fn exactly_threshold_is_rejected() {
        let html = format!(r#"<html><body><div id="content">{}</div></body></html>"#, prose(200));
        assert_eq!(extract(&html), None);
    }

    #[test]
    fn density_gate_rejects_link_heavy_block() {
        let html = format!(
            r#"<html><body><section class="prose"><p>{}</p>{}</section></body></html>"#,
            prose(600),
            links(12)
        );
        assert_eq!(extract(&html), None);
    }

    #[test]
    fn density_gate_accepts_block_with_few_links() {
        let html = format!(
            r#"<html><body><section class="prose"><p>{}</p>{}</section></body></html>"#,
            prose(600),
            links(2)
        );
        let text = extract(&html).expect("block with 2 links should pass");
        assert!(text.starts_with(&prose(600)));
    }

    #[test]
    fn density_fallback_requires_more_than_500_chars() {
        let html = format!(
            r#"<html><body><section class="prose">{}</section></body></html>"#,
            prose(500)
        );
        assert_eq!(extract(&html), None);
    }

    #[test]
    fn density_fallback_prefers_keyword_classed_blocks() {
        // The unclassed div comes first but is ignored because a keyword-classed block exists.
        let html = format!(
            r#"<html><body><div>{}</div><article class="ReadArea">{}</article></body></html>"#,
            "a".repeat(700),
            "b".repeat(700)
        );
        assert_eq!(extract(&html), Some("b".repeat(700)));
    }

    #[test]
    fn density_fallback_skips_navigation_then_takes_body() {
        let html = format!(
            r#"<html><body><div class="nav">{}{}</div><div class="main">{}</div></body></html>"#,
            prose(520),
            links(10),
            prose(520)
        );
        assert_eq!(extract(&html), Some(prose(520)));
    }

    #[test]
    fn missing_content_returns_none() {
        assert_eq!(extract("<html><body><p>hi</p></body></html>"), None);
    }

    #[test]
    fn normalization_collapses_whitespace_into_newlines() {
        let text = ExtractedText::normalize("  第一段 \u{3000}\n\n\n\t第二段\r\n  第三段  ");
        assert_eq!(text.as_str(), "第一段\n第二段\n第三段");
    }

    #[test]
    fn normalization_of_selector_text() {
        let body = format!("{}\n\n\n\n{}", prose(120), prose(120));
        let html = format!(r#"<html><body><div id="content">{body}</div></body></html>"#);
        assert_eq!(extract(&html), Some(format!("{}\n{}", prose(120), prose(120))));
    }
}
