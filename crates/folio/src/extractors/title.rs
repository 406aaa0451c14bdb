// ABOUTME: Title resolution: finds a novel's name through a selector cascade with fallbacks.
// ABOUTME: Total by construction; always yields a sanitized, non-empty NovelName.

//! Novel title resolution.
//!
//! Strategy ladder, first success wins:
//! 1. selector cascade over `title_selectors`, rejecting site chrome and
//!    repairing "Title + site name" composites;
//! 2. the `<title>` element, minus separator-delimited site names;
//! 3. a synthetic `Untitled_<id>` built from the book id in the source URL.

use std::fmt;

use serde::Serialize;

use crate::extractors::select::{cascade, char_len, trimmed_text};
use crate::page::Page;
use crate::patterns::Patterns;

/// Characters that cannot appear in a file name on common filesystems.
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Separators that join titles and site names in page chrome.
const SEPARATORS: &[char] = &['-', '_', '|'];

/// A sanitized, non-empty novel name, safe to use as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NovelName(String);

impl NovelName {
    /// Strips reserved characters; `None` if nothing is left.
    pub fn sanitized(raw: &str) -> Option<Self> {
        let cleaned: String = raw.chars().filter(|c| !RESERVED_CHARS.contains(c)).collect();
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned.to_string()))
        }
    }

    /// Name used when nothing on the page or in the URL identifies the book.
    pub fn untitled(book_id: Option<&str>) -> Self {
        book_id
            .and_then(|id| Self::sanitized(&format!("Untitled_{}", id)))
            .unwrap_or_else(|| Self("Untitled".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NovelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NovelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolves the novel name for a listing page.
pub fn resolve_title(page: &Page, source_url: &str, patterns: &Patterns) -> NovelName {
    if let Some(name) = cascade(page, &patterns.title_selectors, |css, el| {
        let name = accept_candidate(&trimmed_text(&el), patterns)?;
        tracing::debug!(selector = css, title = %name, "title from selector");
        Some(name)
    }) {
        return name;
    }

    if let Some(name) = from_title_tag(page, patterns) {
        tracing::debug!(title = %name, "title from <title> tag");
        return name;
    }

    let name = NovelName::untitled(patterns.book_id(source_url).as_deref());
    tracing::debug!(title = %name, "title synthesized from URL");
    name
}

fn accept_candidate(text: &str, patterns: &Patterns) -> Option<NovelName> {
    if char_len(text) <= 1 || patterns.is_title_stop_word(text) {
        return None;
    }
    let repaired = repair_composite(text, patterns);
    if repaired.is_empty() || patterns.is_title_stop_word(repaired) {
        return None;
    }
    NovelName::sanitized(repaired)
}

/// Cuts a stop word out of "Title - Site Name" style text.
///
/// Uses the first stop word (in list order) the text contains. Keeps the part
/// before it, or the part after it when nothing precedes it.
fn repair_composite<'t>(text: &'t str, patterns: &Patterns) -> &'t str {
    let Some(stop) = patterns
        .title_stop_words
        .iter()
        .find(|w| !w.is_empty() && text.contains(w.as_str()))
    else {
        return text;
    };

    let mut parts = text.split(stop.as_str());
    let left = trim_chrome(parts.next().unwrap_or_default());
    if !left.is_empty() {
        return left;
    }
    trim_chrome(parts.next().unwrap_or_default())
}

fn trim_chrome(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
}

/// Takes the book name from `<title>`.
///
/// Leading segments that are site chrome are skipped, everything after the
/// next separator is dropped, and the first meaningful word is kept.
fn from_title_tag(page: &Page, patterns: &Patterns) -> Option<NovelName> {
    let raw = page.title_text()?;
    let segment = raw
        .split(SEPARATORS)
        .map(str::trim)
        .find(|s| !s.is_empty() && !patterns.is_title_stop_word(s))?;

    segment
        .split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|tok| char_len(tok) > 1 && !patterns.is_title_stop_word(tok))
        .find_map(NovelName::sanitized)
}
