// ABOUTME: Configuration for Folio: crawl timing, HTTP settings, output location and patterns.
// ABOUTME: SpiderBuilder provides a fluent API for constructing Spider instances.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FolioError;
use crate::patterns::Patterns;
use crate::resource::{HttpRenderer, Renderer};
use crate::sink::PLACEHOLDER;
use crate::spider::Spider;

/// Configuration options for a Spider.
#[derive(Debug, Clone)]
pub struct Options {
    /// Timeout for rendering the listing page.
    pub listing_timeout: Duration,
    /// Timeout for rendering each chapter page.
    pub chapter_timeout: Duration,
    /// Pause between consecutive chapter requests.
    pub request_delay: Duration,
    pub user_agent: String,
    /// Directory that receives `<name>.txt`.
    pub output_dir: PathBuf,
    pub allow_private_networks: bool,
    pub headers: HashMap<String, String>,
    /// Written in place of a chapter body that could not be extracted.
    pub placeholder: String,
    pub patterns: Option<Patterns>,
    pub http_client: Option<reqwest::Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            listing_timeout: Duration::from_secs(30),
            chapter_timeout: Duration::from_secs(20),
            request_delay: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (compatible; Folio/0.1)".to_string(),
            output_dir: PathBuf::from("novels"),
            allow_private_networks: false,
            headers: HashMap::new(),
            placeholder: PLACEHOLDER.to_string(),
            patterns: None,
            http_client: None,
        }
    }
}

/// Builder for constructing Spider instances with custom configuration.
#[derive(Debug, Clone)]
pub struct SpiderBuilder {
    opts: Options,
}

impl SpiderBuilder {
    /// Create a new SpiderBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the listing page timeout.
    pub fn listing_timeout(mut self, timeout: Duration) -> Self {
        self.opts.listing_timeout = timeout;
        self
    }

    /// Set the per-chapter timeout.
    pub fn chapter_timeout(mut self, timeout: Duration) -> Self {
        self.opts.chapter_timeout = timeout;
        self
    }

    /// Set the delay between chapter requests.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.opts.request_delay = delay;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.opts.output_dir = dir.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Set the text written for chapters whose body could not be extracted.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.opts.placeholder = placeholder.into();
        self
    }

    /// Use a custom pattern set instead of the built-in one.
    pub fn patterns(mut self, patterns: Patterns) -> Self {
        self.opts.patterns = Some(patterns);
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Build a Spider that fetches over HTTP.
    pub fn build(self) -> Result<Spider<HttpRenderer>, FolioError> {
        let renderer = HttpRenderer::new(&self.opts)?;
        Ok(Spider::new(self.opts, renderer))
    }

    /// Build a Spider around any renderer.
    pub fn build_with<R: Renderer>(self, renderer: R) -> Spider<R> {
        Spider::new(self.opts, renderer)
    }
}

impl Default for SpiderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
