// ABOUTME: Persistence sink writing a novel as a flat text stream.
// ABOUTME: Header, separator line, then each chapter's title and body or a placeholder.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::FolioError;
use crate::extractors::content::ExtractedText;
use crate::extractors::title::NovelName;

/// Default text written when a chapter body could not be extracted.
pub const PLACEHOLDER: &str = "[内容获取失败]";

const RULE_WIDTH: usize = 50;

/// Writes the novel text stream to any `Write`.
pub struct TextSink<W: Write> {
    out: W,
    placeholder: String,
    path: Option<PathBuf>,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            placeholder: PLACEHOLDER.to_string(),
            path: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// File the sink writes to, when it was opened with [`TextSink::create`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Novel name, a blank line, a rule of `=`, a blank line.
    pub fn write_header(&mut self, name: &NovelName) -> Result<(), FolioError> {
        write!(self.out, "{}\n\n{}\n\n", name, "=".repeat(RULE_WIDTH))
            .map_err(|e| self.io_error("WriteHeader", e))
    }

    /// One chapter: blank lines around the title, then the body or the placeholder.
    pub fn write_chapter(
        &mut self,
        title: &str,
        body: Option<&ExtractedText>,
    ) -> Result<(), FolioError> {
        let body = body.map(ExtractedText::as_str).unwrap_or(self.placeholder.as_str());
        write!(self.out, "\n\n{}\n\n{}\n", title, body)
            .map_err(|e| self.io_error("WriteChapter", e))
    }

    pub fn flush(&mut self) -> Result<(), FolioError> {
        self.out.flush().map_err(|e| self.io_error("Flush", e))
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn io_error(&self, op: &str, err: std::io::Error) -> FolioError {
        let target = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        FolioError::io(target, op, err)
    }
}

impl TextSink<BufWriter<File>> {
    /// Creates `dir` if needed and opens `<dir>/<name>.txt` for writing.
    pub fn create(dir: impl AsRef<Path>, name: &NovelName) -> Result<Self, FolioError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| FolioError::io(dir.display().to_string(), "CreateOutputDir", e))?;
        let path = dir.join(format!("{}.txt", name));
        let file = File::create(&path)
            .map_err(|e| FolioError::io(path.display().to_string(), "CreateOutputFile", e))?;
        Ok(Self {
            out: BufWriter::new(file),
            placeholder: PLACEHOLDER.to_string(),
            path: Some(path),
        })
    }
}
