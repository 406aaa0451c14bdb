// ABOUTME: Pre-compiled CSS selector cache for O(1) selector lookup.
// ABOUTME: Selector cascades run the same few dozen selectors on every page.

//! Selector caching for repeated DOM queries.
//!
//! Parsing a CSS selector costs more than matching it against a small page.
//! Every page a crawl visits runs the same cascades, so each selector string
//! is compiled once and reused for all subsequent queries.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use scraper::Selector;

/// Process-wide cache of compiled selectors. Invalid selectors are cached as `None`.
static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector, caching the result.
///
/// Returns `Some(Selector)` if the selector is valid, `None` if invalid.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Selector::parse(css).ok();
    let mut cache = SELECTOR_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    // Another thread may have inserted while we were compiling.
    if let Some(cached) = cache.get(css) {
        return cached.clone();
    }
    cache.insert(css.to_string(), compiled.clone());
    compiled
}

/// Precompiles a batch of selectors into the cache.
///
/// Returns the selectors that failed to parse, in input order.
pub fn precompile_selectors<I, S>(selectors: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut invalid = Vec::new();
    let mut cache = SELECTOR_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    for css in selectors {
        let css = css.as_ref();
        let entry = cache
            .entry(css.to_string())
            .or_insert_with(|| Selector::parse(css).ok());
        if entry.is_none() {
            invalid.push(css.to_string());
        }
    }
    invalid
}
