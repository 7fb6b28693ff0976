//! Scoring engine
//!
//! Turns a crawl's page records into a `ScoreReport`. Every sub-score lives in
//! [0, 100]. The engine is a pure function of its input: identical page sets
//! produce bit-identical reports.
//!
//! # Content score (max 100)
//!
//! | Component      | Points | Rule                                                      |
//! |----------------|--------|-----------------------------------------------------------|
//! | Word count     | 40     | 30 × ratio up to the target, then 30 + 10 × (1 − 1/ratio) |
//! | Single `<h1>`  | 20     | exactly one; 10 when there are several                    |
//! | Any `<h2>`     | 10     | at least one second-level heading                         |
//! | Alt coverage   | 30     | share of images with alt text; full when there are none   |
//!
//! # SEO score (max 100)
//!
//! | Component            | Points | Rule                                    |
//! |----------------------|--------|-----------------------------------------|
//! | Title present        | 20     |                                         |
//! | Title length         | 15     | 10 to 60 characters                     |
//! | Meta description     | 15     |                                         |
//! | Description length   | 15     | 50 to 160 characters                    |
//! | Canonical link       | 15     |                                         |
//! | Internal links       | 20     | scaled up to `min-internal-links`       |
//!
//! # Performance score (max 100)
//!
//! 60 points for latency and 40 for payload size. Each part is full at or
//! under its threshold and scales with threshold / actual above it.
//!
//! # Aggregation
//!
//! Sub-scores are averaged over successfully fetched pages. The aggregate is
//! the weighted sum of those means using the configured weights (default
//! content 40%, SEO 30%, performance 30%), clamped to [0, 100]. All published
//! numbers are rounded to two decimals. No successful page means a zero
//! aggregate with `no_data` set.

use crate::analysis::content::{extract_signals, ContentSignals};
use crate::config::ScoringConfig;
use crate::crawler::{FetchError, PageRecord};
use crate::lookup::DomainInfo;
use crate::url::{dedup_key, same_host};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const WORD_LINEAR_POINTS: f64 = 30.0;
const WORD_BONUS_POINTS: f64 = 10.0;
const SINGLE_H1_POINTS: f64 = 20.0;
const MULTIPLE_H1_POINTS: f64 = 10.0;
const H2_POINTS: f64 = 10.0;
const ALT_POINTS: f64 = 30.0;

const TITLE_POINTS: f64 = 20.0;
const TITLE_LENGTH_POINTS: f64 = 15.0;
const TITLE_LENGTH_RANGE: (usize, usize) = (10, 60);
const META_POINTS: f64 = 15.0;
const META_LENGTH_POINTS: f64 = 15.0;
const META_LENGTH_RANGE: (usize, usize) = (50, 160);
const CANONICAL_POINTS: f64 = 15.0;
const INTERNAL_LINK_POINTS: f64 = 20.0;

const LATENCY_POINTS: f64 = 60.0;
const SIZE_POINTS: f64 = 40.0;

/// Sub-scores of one page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub content: f64,
    pub seo: f64,
    pub performance: f64,
    pub aggregate: f64,
}

/// Per-page breakdown entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScore {
    pub url: String,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub content_length: u64,

    /// Present when the fetch failed; such pages carry no scores
    pub error: Option<FetchError>,

    pub signals: Option<ContentSignals>,
    pub scores: Option<SubScores>,
}

/// Unique link counts across every fetched page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub total: usize,

    /// Links to the start page's host
    pub internal: usize,

    pub external: usize,
}

/// Final scan report attached to a completed Job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub content_score: f64,
    pub seo_score: f64,
    pub performance_score: f64,
    pub aggregate_score: f64,

    /// True when no page was fetched successfully; the zero aggregate then
    /// means "nothing to score" rather than "poor site"
    pub no_data: bool,

    pub pages_crawled: usize,
    pub pages_scored: usize,
    pub pages: Vec<PageScore>,
    pub links: LinkSummary,

    /// Registry and network metadata, filled by the lookup collaborator
    pub domain: Option<DomainInfo>,
}

/// Computes scores from page records
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Scores a crawl's page set
    ///
    /// # Arguments
    ///
    /// * `pages` - Page records in visitation order; the first is the start page
    ///
    /// # Returns
    ///
    /// A report with `domain` left empty
    pub fn score(&self, pages: &[PageRecord]) -> ScoreReport {
        let mut breakdown = Vec::with_capacity(pages.len());
        let mut totals = (0.0, 0.0, 0.0);
        let mut scored = 0usize;

        for page in pages {
            let entry = self.score_page(page);
            if let Some(s) = &entry.scores {
                totals.0 += s.content;
                totals.1 += s.seo;
                totals.2 += s.performance;
                scored += 1;
            }
            breakdown.push(entry);
        }

        let links = summarize_links(pages);

        if scored == 0 {
            return ScoreReport {
                content_score: 0.0,
                seo_score: 0.0,
                performance_score: 0.0,
                aggregate_score: 0.0,
                no_data: true,
                pages_crawled: pages.len(),
                pages_scored: 0,
                pages: breakdown,
                links,
                domain: None,
            };
        }

        let n = scored as f64;
        let content = totals.0 / n;
        let seo = totals.1 / n;
        let performance = totals.2 / n;

        ScoreReport {
            content_score: round2(content),
            seo_score: round2(seo),
            performance_score: round2(performance),
            aggregate_score: round2(self.weighted(content, seo, performance)),
            no_data: false,
            pages_crawled: pages.len(),
            pages_scored: scored,
            pages: breakdown,
            links,
            domain: None,
        }
    }

    fn score_page(&self, page: &PageRecord) -> PageScore {
        let mut entry = PageScore {
            url: page.url.to_string(),
            status_code: page.status_code,
            latency_ms: page.latency_ms,
            content_length: page.content_length,
            error: page.error.clone(),
            signals: None,
            scores: None,
        };

        let html = match (&page.html, &page.error) {
            (Some(html), None) => html,
            _ => return entry,
        };

        let signals = extract_signals(html, &page.final_url);
        let content = self.content_score(&signals);
        let seo = self.seo_score(&signals);
        let performance = self.performance_score(page.latency_ms, page.content_length);

        entry.scores = Some(SubScores {
            content: round2(content),
            seo: round2(seo),
            performance: round2(performance),
            aggregate: round2(self.weighted(content, seo, performance)),
        });
        entry.signals = Some(signals);
        entry
    }

    /// Content sub-score of one page
    pub fn content_score(&self, signals: &ContentSignals) -> f64 {
        let ratio = signals.word_count as f64 / f64::from(self.config.target_word_count.max(1));
        let words = if ratio <= 1.0 {
            WORD_LINEAR_POINTS * ratio
        } else {
            WORD_LINEAR_POINTS + WORD_BONUS_POINTS * (1.0 - 1.0 / ratio)
        };

        let h1 = match signals.h1_count() {
            0 => 0.0,
            1 => SINGLE_H1_POINTS,
            _ => MULTIPLE_H1_POINTS,
        };
        let h2 = if signals.headings[1] > 0 { H2_POINTS } else { 0.0 };

        let alt = if signals.images_total == 0 {
            ALT_POINTS
        } else {
            let covered = signals.images_total - signals.images_missing_alt;
            ALT_POINTS * covered as f64 / signals.images_total as f64
        };

        clamp_score(words + h1 + h2 + alt)
    }

    /// SEO sub-score of one page
    pub fn seo_score(&self, signals: &ContentSignals) -> f64 {
        let mut score = 0.0;

        if signals.title.is_some() {
            score += TITLE_POINTS;
            if in_range(signals.title_length, TITLE_LENGTH_RANGE) {
                score += TITLE_LENGTH_POINTS;
            }
        }

        if signals.meta_description.is_some() {
            score += META_POINTS;
            if in_range(signals.meta_description_length, META_LENGTH_RANGE) {
                score += META_LENGTH_POINTS;
            }
        }

        if signals.has_canonical {
            score += CANONICAL_POINTS;
        }

        let wanted = f64::from(self.config.min_internal_links.max(1));
        score += INTERNAL_LINK_POINTS * (signals.internal_links as f64 / wanted).min(1.0);

        clamp_score(score)
    }

    /// Performance sub-score of one page
    pub fn performance_score(&self, latency_ms: u64, content_length: u64) -> f64 {
        let latency = LATENCY_POINTS * threshold_ratio(latency_ms, self.config.latency_threshold_ms);
        let size = SIZE_POINTS * threshold_ratio(content_length, self.config.size_threshold_bytes);
        clamp_score(latency + size)
    }

    fn weighted(&self, content: f64, seo: f64, performance: f64) -> f64 {
        clamp_score(
            self.config.content_weight * content
                + self.config.seo_weight * seo
                + self.config.performance_weight * performance,
        )
    }
}

/// 1.0 at or under the threshold, threshold / actual above it
fn threshold_ratio(actual: u64, threshold: u64) -> f64 {
    if actual <= threshold {
        1.0
    } else {
        threshold as f64 / actual as f64
    }
}

fn in_range(value: usize, (min, max): (usize, usize)) -> bool {
    value >= min && value <= max
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn summarize_links(pages: &[PageRecord]) -> LinkSummary {
    let Some(home) = pages.first().map(|p| &p.final_url) else {
        return LinkSummary::default();
    };

    let mut seen = HashSet::new();
    let mut summary = LinkSummary::default();

    for link in pages.iter().filter(|p| p.is_success()).flat_map(|p| &p.links) {
        if !seen.insert(dedup_key(link)) {
            continue;
        }
        summary.total += 1;
        if same_host(link, home) {
            summary.internal += 1;
        } else {
            summary.external += 1;
        }
    }

    summary
}
