//! URL handling module for Site Scanner
//!
//! This module provides URL canonicalization, dedup keys, domain extraction,
//! wildcard matching, and the link-scope policy used by the crawler.

mod domain;
mod matcher;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_host, same_origin};
pub use matcher::matches_wildcard;
pub use normalize::{canonicalize, canonicalize_url, dedup_key};

/// Decides which discovered links a crawl may follow
///
/// A link is in scope when it shares the start URL's origin, or when its host
/// matches one of the configured `allowed-domains` patterns.
#[derive(Debug, Clone)]
pub struct LinkScope {
    origin: Url,
    allowed_domains: Vec<String>,
}

impl LinkScope {
    /// Creates a scope rooted at the given start URL
    pub fn new(origin: Url, allowed_domains: Vec<String>) -> Self {
        Self {
            origin,
            allowed_domains,
        }
    }

    /// Returns true if the crawler may follow `candidate`
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use site_scanner::url::LinkScope;
    ///
    /// let start = Url::parse("https://example.com/").unwrap();
    /// let scope = LinkScope::new(start, vec!["*.cdn.example.com".to_string()]);
    ///
    /// assert!(scope.allows(&Url::parse("https://example.com/about").unwrap()));
    /// assert!(scope.allows(&Url::parse("https://img.cdn.example.com/x").unwrap()));
    /// assert!(!scope.allows(&Url::parse("https://other.org/").unwrap()));
    /// ```
    pub fn allows(&self, candidate: &Url) -> bool {
        if same_origin(&self.origin, candidate) {
            return true;
        }

        match extract_domain(candidate) {
            Some(domain) => self
                .allowed_domains
                .iter()
                .any(|pattern| matches_wildcard(pattern, &domain)),
            None => false,
        }
    }
}
