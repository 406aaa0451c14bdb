// ABOUTME: Page: an immutable parsed HTML document paired with the URL it was served from.
// ABOUTME: The only view of a fetched page the extraction engine ever sees.

use scraper::{ElementRef, Html};

use crate::extractors::compiled::get_or_compile;
use crate::url_norm::strip_fragment;

/// A parsed HTML page and its resolved URL.
pub struct Page {
    html: Html,
    url: String,
}

impl Page {
    /// Parses `html` as a full document served from `url`.
    pub fn parse(html: &str, url: impl Into<String>) -> Self {
        Self {
            html: Html::parse_document(html),
            url: url.into(),
        }
    }

    /// The URL the page was served from (after redirects).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The page URL without its fragment; the base for resolving links.
    pub fn base_url(&self) -> &str {
        strip_fragment(&self.url)
    }

    /// All elements matching `css`, in document order. Invalid selectors match nothing.
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        let Some(sel) = get_or_compile(css) else {
            return Vec::new();
        };
        let found: Vec<_> = self.html.select(&sel).collect();
        found
    }

    /// The first element matching `css`.
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = get_or_compile(css)?;
        let first = self.html.select(&sel).next();
        first
    }

    /// Trimmed text of the `<title>` element.
    pub fn title_text(&self) -> Option<String> {
        self.select_first("title")
            .map(|el| element_text(&el).trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Full descendant text of an element, concatenated without separators.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect()
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("url", &self.url).finish()
    }
}
