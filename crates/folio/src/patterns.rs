// ABOUTME: Pattern configuration: selector cascades, stop lists and regex sources as data.
// ABOUTME: Loads the embedded default set and optional JSON overrides, compiling regexes once.

//! Extraction pattern sets.
//!
//! The extraction engine is generic over a [`Patterns`] value. The default
//! set, tuned for Chinese web-novel mirrors, ships embedded as
//! `data/patterns.json`. A user-supplied JSON file can replace any subset of
//! its fields; omitted fields keep their built-in values.

use std::fs;
use std::path::Path;

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FolioError;
use crate::extractors::compiled::precompile_selectors;

/// Embedded JSON containing the default pattern set.
const BUILTIN_PATTERNS_JSON: &str = include_str!("../data/patterns.json");

static BUILTIN: Lazy<Patterns> = Lazy::new(|| {
    PatternSpec::builtin()
        .compile()
        .expect("builtin patterns must compile")
});

/// Serializable pattern definitions, exactly as they appear in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Title selectors, highest priority first.
    pub title_selectors: Vec<String>,
    /// Site chrome that must never be taken for a title.
    pub title_stop_words: Vec<String>,
    /// Regexes over the source URL; capture group 1 is the book id.
    pub book_id_patterns: Vec<String>,
    /// Chapter-list selectors, highest priority first.
    pub chapter_selectors: Vec<String>,
    /// Navigation anchor texts that are never chapters.
    pub nav_stop_words: Vec<String>,
    pub chapter_href_patterns: Vec<String>,
    pub chapter_text_patterns: Vec<String>,
    /// Keywords looked for in an anchor parent's class or id.
    pub parent_keywords: Vec<String>,
    /// Article-body selectors, highest priority first.
    pub content_selectors: Vec<String>,
    /// Class regex for density-fallback candidates.
    pub content_class_pattern: String,
}

impl PatternSpec {
    /// Parses the embedded default pattern set.
    ///
    /// # Panics
    ///
    /// Panics if the embedded JSON is malformed.
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_PATTERNS_JSON).expect("failed to parse builtin patterns")
    }

    /// Parses a JSON document layered over the built-in defaults.
    ///
    /// Top-level keys present in `json` replace the built-in value wholesale.
    pub fn from_json_over_builtin(json: &str) -> Result<Self, FolioError> {
        let overrides: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| FolioError::config("LoadPatterns", Some(e.into())))?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(FolioError::config(
                "LoadPatterns",
                Some(anyhow::anyhow!("pattern file must contain a JSON object")),
            ));
        };

        let mut merged = serde_json::to_value(Self::builtin())
            .map_err(|e| FolioError::config("LoadPatterns", Some(e.into())))?;
        if let serde_json::Value::Object(base) = &mut merged {
            for (key, value) in overrides {
                base.insert(key, value);
            }
        }
        serde_json::from_value(merged)
            .map_err(|e| FolioError::config("LoadPatterns", Some(e.into())))
    }

    /// Compiles the regex sources and warms the selector cache.
    pub fn compile(self) -> Result<Patterns, FolioError> {
        let invalid = precompile_selectors(
            self.title_selectors
                .iter()
                .chain(&self.chapter_selectors)
                .chain(&self.content_selectors),
        );
        if !invalid.is_empty() {
            tracing::warn!(selectors = ?invalid, "ignoring unparseable selectors");
        }

        let parent_keywords = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&self.parent_keywords)
            .map_err(|e| FolioError::config("CompilePatterns", Some(e.into())))?;

        Ok(Patterns {
            book_id_res: compile_all(&self.book_id_patterns)?,
            chapter_href_res: compile_all(&self.chapter_href_patterns)?,
            chapter_text_res: compile_all(&self.chapter_text_patterns)?,
            content_class_re: compile_one(&self.content_class_pattern)?,
            nav_stop_words: self
                .nav_stop_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            parent_keywords,
            title_selectors: self.title_selectors,
            title_stop_words: self.title_stop_words,
            chapter_selectors: self.chapter_selectors,
            content_selectors: self.content_selectors,
        })
    }
}

fn compile_one(src: &str) -> Result<Regex, FolioError> {
    Regex::new(src).map_err(|e| {
        FolioError::config(
            "CompilePatterns",
            Some(anyhow::anyhow!("bad regex {:?}: {}", src, e)),
        )
    })
}

fn compile_all(sources: &[String]) -> Result<Vec<Regex>, FolioError> {
    sources.iter().map(|s| compile_one(s)).collect()
}

/// A compiled, ready-to-match pattern set.
#[derive(Debug, Clone)]
pub struct Patterns {
    pub title_selectors: Vec<String>,
    pub title_stop_words: Vec<String>,
    pub book_id_res: Vec<Regex>,
    pub chapter_selectors: Vec<String>,
    /// Stored lowercased; compared case-insensitively.
    pub nav_stop_words: Vec<String>,
    pub chapter_href_res: Vec<Regex>,
    pub chapter_text_res: Vec<Regex>,
    pub parent_keywords: AhoCorasick,
    pub content_selectors: Vec<String>,
    pub content_class_re: Regex,
}

impl Patterns {
    /// The embedded default pattern set.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Loads a JSON pattern file layered over the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FolioError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| FolioError::io(path.display().to_string(), "LoadPatterns", e))?;
        PatternSpec::from_json_over_builtin(&json)?.compile()
    }

    /// True if `text` is exactly one of the title stop words.
    pub fn is_title_stop_word(&self, text: &str) -> bool {
        self.title_stop_words.iter().any(|w| w == text)
    }

    /// True if `text` is a navigation label such as "next chapter".
    pub fn is_nav_stop_word(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.nav_stop_words.iter().any(|w| *w == lowered)
    }

    pub fn href_looks_like_chapter(&self, href: &str) -> bool {
        self.chapter_href_res.iter().any(|re| re.is_match(href))
    }

    pub fn text_looks_like_chapter(&self, text: &str) -> bool {
        self.chapter_text_res.iter().any(|re| re.is_match(text))
    }

    /// True if a class or id value contains one of the list-container keywords.
    pub fn has_list_keyword(&self, attr: &str) -> bool {
        self.parent_keywords.is_match(attr)
    }

    /// First book id found in `url`, trying each id pattern in order.
    pub fn book_id(&self, url: &str) -> Option<String> {
        self.book_id_res.iter().find_map(|re| {
            re.captures(url)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::builtin()
    }
}
