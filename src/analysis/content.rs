//! Content extraction
//!
//! Pure functions from an HTML string to the structural and textual signals
//! the scoring engine consumes. No network access, no clock.

use crate::crawler::extract_links_from_document;
use crate::url::same_host;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Elements whose text never reaches the reader
const NON_VISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Signals derived from one page's HTML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Whitespace-separated words of visible body text
    pub word_count: usize,

    pub title: Option<String>,

    /// Title length in characters (0 when absent)
    pub title_length: usize,

    pub meta_description: Option<String>,

    /// Meta description length in characters (0 when absent)
    pub meta_description_length: usize,

    /// Heading counts, index 0 is `<h1>` through index 5 for `<h6>`
    pub headings: [usize; 6],

    pub images_total: usize,

    /// Images whose `alt` attribute is absent or whitespace-only
    pub images_missing_alt: usize,

    /// Unique links to the page's own host
    pub internal_links: usize,

    /// Unique links to any other host
    pub external_links: usize,

    /// Whether a `<link rel="canonical" href>` is present
    pub has_canonical: bool,
}

impl ContentSignals {
    /// Number of `<h1>` elements
    pub fn h1_count(&self) -> usize {
        self.headings[0]
    }
}

/// Extracts content signals from a page
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `page_url` - The page's final URL; decides which links are internal
///
/// # Example
///
/// ```
/// use site_scanner::analysis::extract_signals;
/// use url::Url;
///
/// let html = r#"<html><head><title>Home</title></head>
///     <body><h1>Welcome</h1><p>Hello there world</p><img src="a.png"></body></html>"#;
/// let signals = extract_signals(html, &Url::parse("https://example.com/").unwrap());
///
/// assert_eq!(signals.title.as_deref(), Some("Home"));
/// assert_eq!(signals.word_count, 4);
/// assert_eq!(signals.h1_count(), 1);
/// assert_eq!(signals.images_missing_alt, 1);
/// ```
pub fn extract_signals(html: &str, page_url: &Url) -> ContentSignals {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let meta_description = extract_meta_description(&document);
    let (images_total, images_missing_alt) = count_images(&document);

    let links = extract_links_from_document(&document, page_url);
    let internal_links = links.iter().filter(|l| same_host(l, page_url)).count();

    ContentSignals {
        word_count: count_visible_words(&document),
        title_length: title.as_deref().map_or(0, |t| t.chars().count()),
        title,
        meta_description_length: meta_description
            .as_deref()
            .map_or(0, |d| d.chars().count()),
        meta_description,
        headings: count_headings(&document),
        images_total,
        images_missing_alt,
        internal_links,
        external_links: links.len() - internal_links,
        has_canonical: has_canonical(&document),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let meta_selector = selector("meta[name][content]")?;

    document
        .select(&meta_selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn has_canonical(document: &Html) -> bool {
    let Some(link_selector) = selector("link[rel][href]") else {
        return false;
    };

    document.select(&link_selector).any(|el| {
        el.value().attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|r| r.eq_ignore_ascii_case("canonical"))
        })
    })
}

fn count_headings(document: &Html) -> [usize; 6] {
    let mut counts = [0; 6];
    for (level, count) in counts.iter_mut().enumerate() {
        if let Some(sel) = selector(&format!("h{}", level + 1)) {
            *count = document.select(&sel).count();
        }
    }
    counts
}

/// Returns (total images, images missing alt text)
fn count_images(document: &Html) -> (usize, usize) {
    let Some(img_selector) = selector("img") else {
        return (0, 0);
    };

    document
        .select(&img_selector)
        .fold((0, 0), |(total, missing), img| {
            let lacks_alt = img
                .value()
                .attr("alt")
                .map_or(true, |alt| alt.trim().is_empty());
            (total + 1, missing + usize::from(lacks_alt))
        })
}

fn count_visible_words(document: &Html) -> usize {
    let body = selector("body").and_then(|sel| document.select(&sel).next());
    count_words_in(body.unwrap_or_else(|| document.root_element()))
}

fn count_words_in(element: ElementRef<'_>) -> usize {
    let mut count = 0;
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            count += text.split_whitespace().count();
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !NON_VISIBLE_ELEMENTS.contains(&child_element.value().name()) {
                count += count_words_in(child_element);
            }
        }
    }
    count
}
