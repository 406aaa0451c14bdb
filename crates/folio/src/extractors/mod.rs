// ABOUTME: Heuristic extraction engine for listing and chapter pages.
// ABOUTME: Title, chapter-list and body extractors built on shared selector cascades.

//! Extraction strategies.
//!
//! Every extractor is a pure function over a [`Page`](crate::page::Page) and a
//! [`Patterns`](crate::patterns::Patterns) set. None of them perform I/O.
//!
//! Submodules:
//! - `title`: novel name resolution.
//! - `chapters`: chapter list extraction.
//! - `content`: chapter body extraction.
//! - `select`: selector cascade primitives.
//! - `compiled`: compiled selector cache.

pub mod chapters;
pub mod compiled;
pub mod content;
pub mod select;
pub mod title;
