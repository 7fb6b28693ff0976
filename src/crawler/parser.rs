//! Link extraction
//!
//! This module parses fetched HTML and produces the list of navigable links:
//! - Every `<a href>` and `<area href>` resolved against the page's final URL
//! - Non-navigable schemes dropped (javascript:, mailto:, tel:, data:, ...)
//! - Fragments stripped and duplicates removed on the case-insensitive dedup key
//! - Output sorted so identical pages always yield identical link order

use crate::url::{canonicalize, dedup_key};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts all navigable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">`, including `rel="nofollow"`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same-page anchors)
/// - Anything that is not HTTP(S) after resolution
///
/// Links are not filtered by origin here; the crawler applies its scope.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page's final URL, used to resolve relative links
///
/// # Returns
///
/// Canonical absolute URLs, unique by dedup key, in lexicographic order
///
/// # Example
///
/// ```
/// use site_scanner::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/b">B</a><a href="/a#top">A</a><a href="/A">A again</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base);
///
/// let links: Vec<&str> = links.iter().map(|u| u.as_str()).collect();
/// assert_eq!(links, vec!["https://example.com/A", "https://example.com/b"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    extract_links_from_document(&document, base_url)
}

/// Same as [`extract_links`] for an already-parsed document
pub fn extract_links_from_document(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    let selector = match Selector::parse("a[href], area[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                links.push(absolute_url);
            }
        }
    }

    // Sort first so the surviving spelling of a duplicate is deterministic
    links.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut seen = HashSet::new();
    links.retain(|url| seen.insert(dedup_key(url)));
    links
}

/// Resolves a link href to a canonical absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    canonicalize(absolute_url).ok()
}
