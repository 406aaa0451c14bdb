// ABOUTME: Fetch service: the Renderer seam plus an HTTP implementation over reqwest.
// ABOUTME: Handles SSRF protection, timeouts, content-length limits and charset decoding.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};
use once_cell::sync::Lazy;
use url::Url;

use crate::error::FolioError;
use crate::options::Options;
use crate::page::Page;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// How many leading bytes are searched for a `<meta charset>` declaration.
const META_SNIFF_BYTES: usize = 2048;

static META_CHARSET_RE: Lazy<regex::bytes::Regex> = Lazy::new(|| {
    regex::bytes::Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-]+)"#).unwrap()
});

/// Produces a parsed page for a URL.
///
/// The extraction engine never calls this; the orchestrator does. Swap the
/// implementation to plug in a headless browser for script-rendered sites.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<Page, FolioError>;
}

/// Options for fetching a resource.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    pub timeout: Option<Duration>,
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decodes the body using the Content-Type charset, a `<meta>` charset, or detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Renders pages by plain HTTP GET; no scripts are executed.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
    fetch_opts: FetchOptions,
}

impl HttpRenderer {
    /// Builds a renderer from spider options.
    pub fn new(opts: &Options) -> Result<Self, FolioError> {
        let client = match &opts.http_client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .map_err(|e| FolioError::config("BuildHttpClient", Some(e.into())))?,
        };

        Ok(Self {
            client,
            fetch_opts: FetchOptions {
                headers: opts.headers.clone(),
                allow_private_networks: opts.allow_private_networks,
                timeout: None,
            },
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<Page, FolioError> {
        let opts = FetchOptions {
            timeout: Some(timeout),
            ..self.fetch_opts.clone()
        };
        let fetched = fetch(&self.client, url, &opts).await?;
        tracing::debug!(
            url,
            final_url = %fetched.final_url,
            bytes = fetched.body.len(),
            "fetched page"
        );
        Ok(Page::parse(&fetched.text(), fetched.final_url))
    }
}

/// Check if an IP address is in a private/reserved range.
pub fn is_private_ip(addr: &IpAddr) -> bool {
    static V4_RANGES: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
        [
            "0.0.0.0/8",
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "127.0.0.0/8",
            "169.254.0.0/16",
        ]
            .iter()
            .filter_map(|net| net.parse().ok())
            .collect()
    });
    static V6_RANGES: Lazy<Vec<Ipv6Net>> = Lazy::new(|| {
        ["fc00::/7", "fe80::/10"]
            .iter()
            .filter_map(|net| net.parse().ok())
            .collect()
    });

    match addr {
        IpAddr::V4(ip) => V4_RANGES.iter().any(|net| net.contains(ip)),
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            // ::ffff:a.b.c.d reaches the IPv4 host.
            Some(v4) => V4_RANGES.iter().any(|net| net.contains(&v4)),
            None => {
                ip.is_loopback()
                    || ip.is_unspecified()
                    || V6_RANGES.iter().any(|net| net.contains(ip))
            }
        },
    }
}

/// Runs a pre-request step under the request timeout, if one is set.
async fn within<T>(
    step: impl Future<Output = T>,
    timeout: Option<Duration>,
    url: &str,
) -> Result<T, FolioError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, step).await.map_err(|_| {
            FolioError::timeout(
                url,
                "Fetch",
                Some(anyhow::anyhow!("DNS lookup timed out after {:?}", limit)),
            )
        }),
        None => Ok(step.await),
    }
}

/// Rejects URLs whose host is, or resolves to, a private address.
async fn ensure_public_host(
    target: &Url,
    url: &str,
    timeout: Option<Duration>,
) -> Result<(), FolioError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let blocked = || {
        FolioError::ssrf(
            url,
            "Fetch",
            Some(anyhow::anyhow!("private IP addresses are not allowed")),
        )
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_private_ip(&ip) { Err(blocked()) } else { Ok(()) };
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = within(tokio::net::lookup_host((host, port)), timeout, url)
        .await?
        .map_err(|e| {
            FolioError::fetch(url, "Fetch", Some(anyhow::anyhow!("DNS lookup failed: {}", e)))
        })?;
    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(blocked());
        }
    }
    Ok(())
}

/// Decode body bytes to a String using charset from content-type header, meta tag, or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(extract_charset)
        .or_else(|| sniff_meta_charset(body));
    if let Some(charset) = declared {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Finds a `<meta charset>` or `http-equiv` charset near the top of the document.
fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let caps = META_CHARSET_RE.captures(head)?;
    let label = caps.get(1)?;
    Some(String::from_utf8_lossy(label.as_bytes()).to_lowercase())
}

/// Fetch a resource from the given URL.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, FolioError> {
    if url.is_empty() {
        return Err(FolioError::invalid_url(url, "Fetch", None));
    }

    let parsed_url = Url::parse(url).map_err(|e| {
        FolioError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(FolioError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    if !opts.allow_private_networks {
        ensure_public_host(&parsed_url, url, opts.timeout).await?;
    }

    let mut request = client.get(url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }
    if let Some(timeout) = opts.timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            FolioError::timeout(url, "Fetch", Some(e.into()))
        } else {
            FolioError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
        }
    })?;

    // Redirects may have landed somewhere private.
    if !opts.allow_private_networks {
        ensure_public_host(response.url(), url, opts.timeout).await?;
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(FolioError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    if !response.status().is_success() {
        return Err(FolioError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            FolioError::timeout(url, "Fetch", Some(e.into()))
        } else {
            FolioError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("failed to read body: {}", e)),
            )
        }
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(FolioError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    fn local_opts() -> FetchOptions {
        FetchOptions {
            allow_private_networks: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/plain; charset=utf-8")
                .body("hello");
        });

        let result = fetch(&create_test_client(), &server.url("/test"), &local_opts()).await;
        mock.assert();

        let result = result.expect("fetch should succeed");
        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "hello");
    }

    #[tokio::test]
    async fn fetch_non_200_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let result = fetch(&create_test_client(), &server.url("/notfound"), &local_opts()).await;
        mock.assert();

        let err = result.expect_err("should fail on 404");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn fetch_sends_custom_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/h").header("referer", "http://example.com/");
            then.status(200).body("ok");
        });

        let mut opts = local_opts();
        opts.headers
            .insert("referer".to_string(), "http://example.com/".to_string());
        let result = fetch(&create_test_client(), &server.url("/h"), &opts).await;
        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn fetch_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_secs(3)).body("late");
        });

        let opts = FetchOptions {
            timeout: Some(Duration::from_millis(200)),
            ..local_opts()
        };
        let err = fetch(&create_test_client(), &server.url("/slow"), &opts)
            .await
            .expect_err("should time out");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn invalid_urls_rejected() {
        let client = create_test_client();
        let opts = local_opts();
        assert!(fetch(&client, "", &opts).await.unwrap_err().is_invalid_url());
        assert!(fetch(&client, "not a url", &opts).await.unwrap_err().is_invalid_url());
        assert!(fetch(&client, "ftp://example.com/", &opts)
            .await
            .unwrap_err()
            .is_invalid_url());
    }

    #[test]
    fn max_content_length_constant() {
        assert_eq!(MAX_CONTENT_LENGTH, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn private_ip_block() {
        let server = MockServer::start();

        let opts = FetchOptions::default();
        let url = format!("http://127.0.0.1:{}/test", server.port());
        let result = fetch(&create_test_client(), &url, &opts).await;

        let err = result.expect_err("should fail on private IP");
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn renderer_returns_page_at_final_url() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/old");
            then.status(301).header("location", "/new/");
        });
        server.mock(|when, then| {
            when.method(GET).path("/new/");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body><h1>Moved</h1></body></html>");
        });

        let opts = Options {
            allow_private_networks: true,
            ..Options::default()
        };
        let renderer = HttpRenderer::new(&opts).unwrap();
        let page = renderer
            .render(&server.url("/old"), Duration::from_secs(5))
            .await
            .expect("render should succeed");
        assert_eq!(page.url(), server.url("/new/"));
        assert!(page.select_first("h1").is_some());
    }

    #[test]
    fn is_private_ip_v4() {
        assert!(is_private_ip(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"172.16.0.1".parse().unwrap()));
        assert!(is_private_ip(&"172.31.255.255".parse().unwrap()));
        assert!(is_private_ip(&"192.168.0.1".parse().unwrap()));
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"169.254.0.1".parse().unwrap()));

        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(is_private_ip(&"0.0.0.0".parse().unwrap()));
        assert!(!is_private_ip(&"172.32.0.1".parse().unwrap()));
    }

    #[test]
    fn is_private_ip_v6() {
        assert!(is_private_ip(&"::1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));
        assert!(!is_private_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn is_private_ip_checks_ipv4_mapped_v6() {
        assert!(is_private_ip(&"::ffff:127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"::ffff:10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"::ffff:192.168.1.1".parse().unwrap()));
        assert!(!is_private_ip(&"::ffff:8.8.8.8".parse().unwrap()));
        assert!(is_private_ip(&"::".parse().unwrap()));
    }

    #[tokio::test]
    async fn mapped_loopback_url_is_blocked() {
        let client = create_test_client();
        let err = fetch(&client, "http://[::ffff:127.0.0.1]/", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn dns_step_is_bounded_by_request_timeout() {
        let err = within(
            std::future::pending::<()>(),
            Some(Duration::from_millis(20)),
            "http://slow.example/",
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());

        let value = within(async { 7 }, None, "http://fast.example/").await.unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn extract_charset_reads_content_type() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=\"GBK\""),
            Some("gbk".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn decode_gbk_from_header() {
        let (encoded, _, _) = encoding_rs::GBK.encode("第一章 风起");
        let decoded = decode_body(&encoded, Some("text/html; charset=gbk"));
        assert_eq!(decoded, "第一章 风起");
    }

    #[test]
    fn decode_gbk_from_meta_tag() {
        let html = r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=gbk"></head><body>目录</body></html>"#;
        let (encoded, _, _) = encoding_rs::GBK.encode(html);
        let decoded = decode_body(&encoded, Some("text/html"));
        assert!(decoded.contains("目录"));
    }

    #[test]
    fn sniff_meta_charset_finds_label() {
        assert_eq!(
            sniff_meta_charset(br#"<meta charset="UTF-8">"#),
            Some("utf-8".to_string())
        );
        assert_eq!(sniff_meta_charset(b"<p>no meta</p>"), None);
    }
}
