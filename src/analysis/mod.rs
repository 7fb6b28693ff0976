//! Page analysis and scoring
//!
//! - `content`: Extracts structural and textual signals from HTML
//! - `scoring`: Turns a crawl's page set into a `ScoreReport`

mod content;
mod scoring;

pub use content::{extract_signals, ContentSignals};
pub use scoring::{LinkSummary, PageScore, ScoreReport, ScoringEngine, SubScores};
