// ABOUTME: Orchestrator: listing page -> title and chapters -> each chapter body -> text sink.
// ABOUTME: Sequential by design; chapter failures become placeholders, listing failures abort.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::FolioError;
use crate::extractors::chapters::{extract_chapters, ChapterRef};
use crate::extractors::content::{extract_content, ExtractedText};
use crate::extractors::title::{resolve_title, NovelName};
use crate::options::{Options, SpiderBuilder};
use crate::page::Page;
use crate::patterns::Patterns;
use crate::resource::{HttpRenderer, Renderer};
use crate::sink::TextSink;

/// A resolved listing: the novel's name and its chapters in reading order.
#[derive(Debug, Clone, Serialize)]
pub struct Novel {
    pub name: NovelName,
    pub source_url: String,
    pub chapters: Vec<ChapterRef>,
}

/// Outcome of downloading a novel's chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub path: Option<PathBuf>,
    pub chapters_total: usize,
    pub chapters_failed: usize,
}

/// Builds a [`Novel`] from an already-rendered listing page.
///
/// Fails with a `NoChapters` error when the page has no recognizable listing.
pub fn read_listing(
    page: &Page,
    source_url: &str,
    patterns: &Patterns,
) -> Result<Novel, FolioError> {
    let name = resolve_title(page, source_url, patterns);
    let chapters = extract_chapters(page, patterns);
    if chapters.is_empty() {
        return Err(FolioError::no_chapters(
            source_url,
            page.title_text().as_deref(),
        ));
    }
    Ok(Novel {
        name,
        source_url: source_url.to_string(),
        chapters,
    })
}

/// Drives a renderer through a novel's listing and chapter pages.
pub struct Spider<R: Renderer> {
    opts: Options,
    patterns: Patterns,
    renderer: R,
}

impl Spider<HttpRenderer> {
    /// Create a new SpiderBuilder for configuring the spider.
    pub fn builder() -> SpiderBuilder {
        SpiderBuilder::new()
    }
}

impl<R: Renderer> Spider<R> {
    /// Create a Spider from options and a renderer.
    pub fn new(opts: Options, renderer: R) -> Self {
        let patterns = opts.patterns.clone().unwrap_or_else(Patterns::builtin);
        Self {
            opts,
            patterns,
            renderer,
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    /// Renders the listing page and resolves its title and chapter list.
    pub async fn resolve_novel(&self, book_url: &str) -> Result<Novel, FolioError> {
        let page = self
            .renderer
            .render(book_url, self.opts.listing_timeout)
            .await?;
        let novel = read_listing(&page, book_url, &self.patterns)?;
        tracing::info!(
            name = %novel.name,
            chapters = novel.chapters.len(),
            "resolved novel"
        );
        Ok(novel)
    }

    /// Renders one chapter page and extracts its body.
    ///
    /// Render failures are logged and reported as missing content.
    pub async fn fetch_chapter(&self, chapter: &ChapterRef) -> Option<ExtractedText> {
        match self
            .renderer
            .render(&chapter.url, self.opts.chapter_timeout)
            .await
        {
            Ok(page) => {
                let body = extract_content(&page, &self.patterns);
                if body.is_none() {
                    tracing::warn!(url = %chapter.url, "no chapter content found");
                }
                body
            }
            Err(e) => {
                tracing::warn!(url = %chapter.url, error = %e, "chapter fetch failed");
                None
            }
        }
    }

    /// Writes the header and every chapter, in listing order, to `sink`.
    pub async fn download<W: Write>(
        &self,
        novel: &Novel,
        sink: &mut TextSink<W>,
    ) -> Result<DownloadReport, FolioError> {
        sink.write_header(&novel.name)?;

        let total = novel.chapters.len();
        let mut failed = 0;
        for (idx, chapter) in novel.chapters.iter().enumerate() {
            tracing::info!("[{}/{}] {}", idx + 1, total, chapter.title);
            let body = self.fetch_chapter(chapter).await;
            if body.is_none() {
                failed += 1;
            }
            sink.write_chapter(&chapter.title, body.as_ref())?;

            if idx + 1 < total && !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay).await;
            }
        }
        sink.flush()?;

        Ok(DownloadReport {
            path: sink.path().map(PathBuf::from),
            chapters_total: total,
            chapters_failed: failed,
        })
    }

    /// Resolves the listing, then downloads it to `<output_dir>/<name>.txt`.
    ///
    /// No file is created when the listing cannot be resolved.
    pub async fn run(&self, book_url: &str) -> Result<DownloadReport, FolioError> {
        let novel = self.resolve_novel(book_url).await?;
        let mut sink = TextSink::create(&self.opts.output_dir, &novel.name)?
            .with_placeholder(self.opts.placeholder.clone());
        if let Some(path) = sink.path() {
            tracing::info!(path = %path.display(), "writing novel");
        }
        self.download(&novel, &mut sink).await
    }
}
