// ABOUTME: Selector cascade primitives shared by the title, chapter and content extractors.
// ABOUTME: Walks selectors in priority order and stops at the first accepted candidate.

//! Selector cascade utilities.
//!
//! Key behaviors:
//! - Selectors are tried in order; the first one whose candidate is accepted wins.
//! - Only the first element a selector matches is considered.
//! - Invalid selectors match nothing and are skipped.
//! - Lengths are counted in characters, not bytes.

use scraper::ElementRef;

use crate::page::{element_text, Page};

/// Runs a selector cascade over `page`.
///
/// For each selector, the first matching element is handed to `accept`
/// together with the selector string. Returns the first `Some` produced.
pub fn cascade<'a, T>(
    page: &'a Page,
    selectors: &[String],
    mut accept: impl FnMut(&str, ElementRef<'a>) -> Option<T>,
) -> Option<T> {
    selectors.iter().find_map(|css| {
        let el = page.select_first(css)?;
        accept(css, el)
    })
}

/// Element text with leading and trailing whitespace removed.
pub fn trimmed_text(el: &ElementRef<'_>) -> String {
    element_text(el).trim().to_string()
}

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Value of `attr` on `el`, trimmed; empty values count as missing.
pub fn attr_trimmed<'a>(el: &ElementRef<'a>, attr: &str) -> Option<&'a str> {
    el.value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html>
        <head><title>Test Page</title></head>
        <body>
            <h1>  Main   Title  </h1>
            <div class="empty"></div>
            <p class="intro">Hello world</p>
            <a href="  /1.html ">one</a>
            <a href="">two</a>
        </body>
        </html>
    "#;

    fn selectors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_accepted_selector_wins() {
        let page = Page::parse(SAMPLE_HTML, "http://example.com/");
        let found = cascade(&page, &selectors(&["h1", "p.intro"]), |css, el| {
            Some((css.to_string(), trimmed_text(&el)))
        });
        assert_eq!(found, Some(("h1".to_string(), "Main   Title".to_string())));
    }

    #[test]
    fn rejected_candidates_fall_through() {
        let page = Page::parse(SAMPLE_HTML, "http://example.com/");
        let found = cascade(&page, &selectors(&["div.empty", "[[[bad", "p.intro"]), |_, el| {
            let text = trimmed_text(&el);
            (!text.is_empty()).then_some(text)
        });
        assert_eq!(found.as_deref(), Some("Hello world"));
    }

    #[test]
    fn no_match_returns_none() {
        let page = Page::parse(SAMPLE_HTML, "http://example.com/");
        let found: Option<String> =
            cascade(&page, &selectors(&["article", "section"]), |_, el| {
                Some(trimmed_text(&el))
            });
        assert!(found.is_none());
    }

    #[test]
    fn attr_trimmed_skips_empty_values() {
        let page = Page::parse(SAMPLE_HTML, "http://example.com/");
        let hrefs: Vec<Option<&str>> = page
            .select_all("a")
            .iter()
            .map(|a| attr_trimmed(a, "href"))
            .collect();
        assert_eq!(hrefs, vec![Some("/1.html"), None]);
    }

    #[test]
    fn char_len_counts_characters() {
        assert_eq!(char_len("第一章"), 3);
        assert_eq!(char_len("abc"), 3);
    }
}
