use crate::artifacts::ArtifactError;
use crate::crawler::PageRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read, Write};
use url::Url;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Longest sanitized host+path prefix kept in an entry name
const MAX_STEM_LENGTH: usize = 100;

/// Derives the archive entry name for a page
///
/// The name is the URL's host, path and query with every character outside
/// `[A-Za-z0-9._-]` replaced by `_`, cut to 100 characters, followed by the
/// first 8 hex digits of the SHA-256 of the full URL and `.html`. Distinct
/// URLs whose sanitized forms collide still get distinct names.
///
/// # Examples
///
/// ```
/// use site_scanner::artifacts::archive_entry_name;
/// use url::Url;
///
/// let name = archive_entry_name(&Url::parse("https://example.com/about/team").unwrap());
/// assert!(name.starts_with("example.com_about_team_"));
/// assert!(name.ends_with(".html"));
/// ```
pub fn archive_entry_name(url: &Url) -> String {
    let mut raw = String::new();
    raw.push_str(url.host_str().unwrap_or("unknown"));
    if let Some(port) = url.port() {
        raw.push('_');
        raw.push_str(&port.to_string());
    }
    raw.push_str(url.path());
    if let Some(query) = url.query() {
        raw.push('?');
        raw.push_str(query);
    }

    let stem: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LENGTH)
        .collect();
    let stem = stem.trim_end_matches('_');

    let digest = Sha256::digest(url.as_str().as_bytes());
    let suffix = &hex::encode(digest)[..8];

    format!("{}_{}.html", stem, suffix)
}

/// Builds a zip archive holding the HTML of every successfully fetched page
///
/// Entries appear in page order. Returns `ArtifactError::NoPages` if no page
/// has HTML.
pub fn build_html_archive(pages: &[PageRecord]) -> Result<Vec<u8>, ArtifactError> {
    let fetched: Vec<(&Url, &str)> = pages
        .iter()
        .filter(|p| p.is_success())
        .filter_map(|p| p.html.as_deref().map(|html| (&p.url, html)))
        .collect();

    if fetched.is_empty() {
        return Err(ArtifactError::NoPages);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (url, html) in fetched {
        writer
            .start_file(archive_entry_name(url), options)
            .map_err(|e| ArtifactError::Archive(e.to_string()))?;
        writer
            .write_all(html.as_bytes())
            .map_err(|e| ArtifactError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ArtifactError::Archive(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// One page's HTML as stored in an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedPage {
    pub url: Url,
    pub html: String,
}

/// Reads the HTML of `urls` back out of an archive built by [`build_html_archive`]
///
/// URLs without an entry (pages that failed to fetch) are skipped. The
/// result keeps the order of `urls`.
pub fn read_html_archive(
    archive: &[u8],
    urls: &[Url],
) -> Result<Vec<ArchivedPage>, ArtifactError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ArtifactError::Unreadable(e.to_string()))?;

    let mut pages = Vec::new();
    for url in urls {
        let mut entry = match zip.by_name(&archive_entry_name(url)) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(ArtifactError::Unreadable(e.to_string())),
        };

        let mut html = String::new();
        entry
            .read_to_string(&mut html)
            .map_err(|e| ArtifactError::Unreadable(e.to_string()))?;
        pages.push(ArchivedPage {
            url: url.clone(),
            html,
        });
    }

    Ok(pages)
}
