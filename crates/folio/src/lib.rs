// ABOUTME: Main library entry point for Folio, a heuristic web-novel downloader.
// ABOUTME: Re-exports the public API: Spider, SpiderBuilder, extractors, Patterns, FolioError.

//! Folio - heuristic extraction of serialized novels from listing pages.
//!
//! Given the table-of-contents URL of a web novel, Folio resolves the novel's
//! name, finds its chapter links, fetches every chapter, pulls out the body
//! text and writes the whole thing to `<output_dir>/<name>.txt`. No
//! per-site rules are involved: every step is a cascade over a configurable
//! [`Patterns`] set.
//!
//! # Example
//!
//! ```no_run
//! use folio::{FolioError, Spider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), FolioError> {
//!     let spider = Spider::builder().output_dir("novels").build()?;
//!     let report = spider.run("https://example.com/book/123/").await?;
//!     println!("{} chapters, {} failed", report.chapters_total, report.chapters_failed);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extractors;
pub mod options;
pub mod page;
pub mod patterns;
pub mod resource;
pub mod sink;
pub mod spider;
pub mod url_norm;

pub use crate::error::{ErrorCode, FolioError};
pub use crate::extractors::chapters::{extract_chapters, ChapterRef};
pub use crate::extractors::content::{extract_content, ExtractedText};
pub use crate::extractors::title::{resolve_title, NovelName};
pub use crate::options::{Options, SpiderBuilder};
pub use crate::page::Page;
pub use crate::patterns::{PatternSpec, Patterns};
pub use crate::resource::{HttpRenderer, Renderer};
pub use crate::sink::{TextSink, PLACEHOLDER};
pub use crate::spider::{read_listing, DownloadReport, Novel, Spider};
pub use crate::url_norm::resolve;
