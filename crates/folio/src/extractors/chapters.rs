// ABOUTME: Chapter list extraction: selector cascade with a generic anchor-scanning fallback.
// ABOUTME: Produces an ordered list of chapters, unique by resolved URL, first occurrence wins.

use std::collections::HashSet;

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::extractors::select::{attr_trimmed, char_len, trimmed_text};
use crate::page::Page;
use crate::patterns::Patterns;
use crate::url_norm::resolve;

/// Exclusive threshold: a selector must match more than this many anchors to
/// count as a chapter listing. Lone navigation links ("next chapter") stay at or below it.
pub const LISTING_ANCHOR_THRESHOLD: usize = 3;

/// Exclusive bounds on anchor text length for the parent-container heuristic.
const CONTAINER_TEXT_MIN: usize = 2;
const CONTAINER_TEXT_MAX: usize = 50;

/// A linked chapter. Two refs are equal when their URLs are.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub title: String,
    pub url: String,
}

impl PartialEq for ChapterRef {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl std::hash::Hash for ChapterRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// An anchor accepted by either phase, before URL resolution.
struct Candidate<'a> {
    title: String,
    href: Option<&'a str>,
}

impl<'a> Candidate<'a> {
    fn from_anchor(el: &ElementRef<'a>) -> Self {
        Self {
            title: trimmed_text(el),
            href: attr_trimmed(el, "href"),
        }
    }
}

/// Extracts the chapter list from a listing page.
///
/// An empty result means no listing was recognized.
pub fn extract_chapters(page: &Page, patterns: &Patterns) -> Vec<ChapterRef> {
    let candidates = match from_selectors(page, patterns) {
        Some(found) => found,
        None => from_all_anchors(page, patterns),
    };
    dedup_resolved(page.base_url(), candidates)
}

/// Phase A: the first selector matching more than [`LISTING_ANCHOR_THRESHOLD`] anchors.
fn from_selectors<'a>(page: &'a Page, patterns: &Patterns) -> Option<Vec<Candidate<'a>>> {
    patterns.chapter_selectors.iter().find_map(|css| {
        let anchors = page.select_all(css);
        if anchors.len() <= LISTING_ANCHOR_THRESHOLD {
            return None;
        }
        tracing::debug!(selector = %css, matches = anchors.len(), "chapter selector accepted");
        Some(anchors.iter().map(Candidate::from_anchor).collect())
    })
}

/// Phase B: every linked anchor that looks like a chapter by href, text or container.
fn from_all_anchors<'a>(page: &'a Page, patterns: &Patterns) -> Vec<Candidate<'a>> {
    let found: Vec<Candidate<'a>> = page
        .select_all("a[href]")
        .iter()
        .filter_map(|el| {
            let href = attr_trimmed(el, "href")?;
            let title = trimmed_text(el);
            if title.is_empty() || patterns.is_nav_stop_word(&title) {
                return None;
            }
            let is_chapter = patterns.href_looks_like_chapter(href)
                || patterns.text_looks_like_chapter(&title)
                || in_listing_container(el, &title, patterns);
            is_chapter.then_some(Candidate {
                title,
                href: Some(href),
            })
        })
        .collect();

    if !found.is_empty() {
        tracing::debug!(matches = found.len(), "chapters found by generic anchor scan");
    }
    found
}

fn in_listing_container(el: &ElementRef<'_>, title: &str, patterns: &Patterns) -> bool {
    let len = char_len(title);
    if len <= CONTAINER_TEXT_MIN || len >= CONTAINER_TEXT_MAX {
        return false;
    }
    let Some(parent) = el.parent().and_then(ElementRef::wrap) else {
        return false;
    };
    ["class", "id"]
        .iter()
        .filter_map(|attr| parent.value().attr(attr))
        .any(|value| patterns.has_list_keyword(value))
}

/// Resolves hrefs and keeps the first occurrence of each URL, in document order.
fn dedup_resolved(base: &str, candidates: Vec<Candidate<'_>>) -> Vec<ChapterRef> {
    let mut seen = HashSet::new();
    let mut chapters = Vec::new();
    for c in candidates {
        let Some(href) = c.href else { continue };
        if c.title.is_empty() {
            continue;
        }
        let url = resolve(base, href);
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        chapters.push(ChapterRef {
            title: c.title,
            url,
        });
    }
    chapters
}
