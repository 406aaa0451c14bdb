// ABOUTME: URL normalization: resolves relative or partial hrefs against a base URL.
// ABOUTME: Lenient and total; malformed input degrades to best-effort concatenation.

//! URL normalization.
//!
//! Listing sites link chapters with every flavour of href: absolute URLs,
//! root-relative paths, `./` and `../` segments, bare file names. [`resolve`]
//! turns all of them into absolute URLs without ever failing.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Removes the `#fragment` part of a URL, if any.
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Returns true if `href` carries a URL scheme (`http:`, `https:`, `mailto:` ...).
pub fn has_scheme(href: &str) -> bool {
    SCHEME_RE.is_match(href)
}

/// Resolves `href` against `base`.
///
/// - Absolute hrefs are returned unchanged.
/// - `//host/path` borrows the base's scheme.
/// - `/path` is appended to the base's scheme and authority.
/// - Anything else is resolved relative to the base's directory.
///
/// Relative results are percent-encoded by `url`, so one page linked in
/// different forms resolves to one string.
///
/// The base is stripped of its fragment first.
pub fn resolve(base: &str, href: &str) -> String {
    let href = href.trim();
    if has_scheme(href) {
        return href.to_string();
    }

    let base = strip_fragment(base.trim());
    let parsed = match Url::parse(base) {
        Ok(u) => u,
        Err(_) => return concat_lenient(base, href),
    };

    // Every relative form goes through `join` so the result is encoded the same way.
    match parsed.join(href) {
        Ok(joined) => joined.to_string(),
        Err(_) => concat_lenient(base, href),
    }
}

fn concat_lenient(base: &str, href: &str) -> String {
    if href.starts_with('/') {
        return format!("{}{}", base.trim_end_matches('/'), href);
    }
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], href),
        None if base.is_empty() => href.to_string(),
        None => format!("{}/{}", base, href),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_href_is_unchanged() {
        let abs = "https://other.example.org/x/1.html";
        assert_eq!(resolve("http://example.com/book/8/", abs), abs);
    }

    #[test]
    fn resolution_is_idempotent_for_absolute_results() {
        let base = "http://example.com/book/8/";
        for href in ["./12.html", "/9/10.html", "13.html", "../index.html"] {
            let once = resolve(base, href);
            assert_eq!(resolve(base, &once), once);
        }
    }

    #[test]
    fn dot_relative_against_directory() {
        assert_eq!(
            resolve("http://example.com/book/8/", "./12.html"),
            "http://example.com/book/8/12.html"
        );
    }

    #[test]
    fn parent_segments_are_resolved() {
        assert_eq!(
            resolve("http://example.com/book/8/index.html", "../9/1.html"),
            "http://example.com/book/9/1.html"
        );
    }

    #[test]
    fn bare_relative_uses_base_directory() {
        assert_eq!(
            resolve("http://www.xbiqushu.com/8_8426/", "12345.html"),
            "http://www.xbiqushu.com/8_8426/12345.html"
        );
    }

    #[test]
    fn root_relative_uses_scheme_and_host() {
        assert_eq!(
            resolve("http://example.com:8080/book/8/", "/8_8426/1.html"),
            "http://example.com:8080/8_8426/1.html"
        );
    }

    #[test]
    fn scheme_relative_borrows_scheme() {
        assert_eq!(
            resolve("https://example.com/book/", "//cdn.example.com/1.html"),
            "https://cdn.example.com/1.html"
        );
    }

    #[test]
    fn non_ascii_paths_encode_the_same_in_every_relative_form() {
        let base = "http://www.xbiqushu.com/8_8426/";
        let expected = "http://www.xbiqushu.com/8_8426/%E7%AC%AC1%E7%AB%A0.html";
        assert_eq!(resolve(base, "第1章.html"), expected);
        assert_eq!(resolve(base, "/8_8426/第1章.html"), expected);
        assert_eq!(resolve(base, "//www.xbiqushu.com/8_8426/第1章.html"), expected);
    }

    #[test]
    fn base_fragment_is_ignored() {
        assert_eq!(
            resolve("https://www.57389b.sbs/#/book/1233/", "/chapter/1"),
            "https://www.57389b.sbs/chapter/1"
        );
        assert_eq!(
            resolve("https://www.57389b.sbs/list/#top", "2.html"),
            "https://www.57389b.sbs/list/2.html"
        );
    }

    #[test]
    fn malformed_base_degrades_to_concatenation() {
        assert_eq!(resolve("not a url/dir/", "1.html"), "not a url/dir/1.html");
        assert_eq!(resolve("not a url/", "/1.html"), "not a url/1.html");
        assert_eq!(resolve("", "1.html"), "1.html");
    }

    #[test]
    fn strip_fragment_removes_hash() {
        assert_eq!(strip_fragment("http://a.com/x#y"), "http://a.com/x");
        assert_eq!(strip_fragment("http://a.com/x"), "http://a.com/x");
    }
}
