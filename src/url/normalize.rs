use crate::UrlError;
use url::Url;

/// Canonicalizes a URL string for crawling and deduplication
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Require a host
/// 4. Lowercase scheme and host, drop the scheme's default port
/// 5. Empty path becomes /
/// 6. Remove fragment (everything after #)
///
/// Steps 4 and 5 are carried out by the `url` crate's WHATWG parser for the
/// special schemes; they are listed here because callers rely on them.
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - Failed to parse, or not a navigable web URL
///
/// # Examples
///
/// ```
/// use site_scanner::url::canonicalize_url;
///
/// let url = canonicalize_url("HTTP://Example.COM:80#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/");
/// ```
pub fn canonicalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Canonicalizes an already-parsed URL
///
/// See [`canonicalize_url`] for the rules applied.
pub fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    Ok(url)
}

/// Returns the deduplication key for a canonical URL
///
/// The key is the lowercased scheme, host (with non-default port), path and
/// query. Two URLs that differ only by letter case or fragment share a key.
///
/// # Examples
///
/// ```
/// use site_scanner::url::{canonicalize_url, dedup_key};
///
/// let a = canonicalize_url("https://example.com/About?x=1#team").unwrap();
/// let b = canonicalize_url("https://EXAMPLE.com/about?X=1").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let mut key = String::with_capacity(url.as_str().len());
    key.push_str(url.scheme());
    key.push_str("://");
    key.push_str(url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path());
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    key.to_lowercase()
}
