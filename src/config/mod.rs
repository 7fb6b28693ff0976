//! Configuration module for Site Scanner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_scanner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scanner.toml")).unwrap();
//! println!("Default page budget: {}", config.crawler.default_max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArtifactConfig, Config, CrawlerConfig, LookupConfig, RendererConfig, RendererEngine,
    ScannerConfig, ScoringConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
