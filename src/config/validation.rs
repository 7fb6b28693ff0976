use crate::config::types::{
    Config, CrawlerConfig, LookupConfig, RendererConfig, ScannerConfig, ScoringConfig,
    StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Tolerance used when checking that scoring weights sum to one
const WEIGHT_EPSILON: f64 = 1e-6;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scanner_config(&config.scanner)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_scoring_config(&config.scoring)?;
    validate_storage_config(&config.storage)?;
    validate_lookup_config(&config.lookup)?;
    validate_renderer_config(&config.renderer)?;
    Ok(())
}

fn validate_scanner_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.job_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "job_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.lease_secs < 3 || config.lease_secs > 3600 {
        return Err(ConfigError::Validation(format!(
            "lease_secs must be between 3 and 3600, got {}",
            config.lease_secs
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages_ceiling < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_ceiling must be >= 1, got {}",
            config.max_pages_ceiling
        )));
    }

    if config.default_max_pages < 1 || config.default_max_pages > config.max_pages_ceiling {
        return Err(ConfigError::Validation(format!(
            "default_max_pages must be between 1 and max_pages_ceiling ({}), got {}",
            config.max_pages_ceiling, config.default_max_pages
        )));
    }

    if config.page_timeout_ms < 100 || config.page_timeout_ms > 120_000 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_ms must be between 100ms and 120000ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    if config.max_concurrent_pages_open < 1 || config.max_concurrent_pages_open > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages_open must be between 1 and 32, got {}",
            config.max_concurrent_pages_open
        )));
    }

    if config.renderer_pool_size < 1 {
        return Err(ConfigError::Validation(format!(
            "renderer_pool_size must be >= 1, got {}",
            config.renderer_pool_size
        )));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_scoring_config(config: &ScoringConfig) -> Result<(), ConfigError> {
    let weights = [
        ("content_weight", config.content_weight),
        ("seo_weight", config.seo_weight),
        ("performance_weight", config.performance_weight),
    ];

    for (name, weight) in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, weight
            )));
        }
    }

    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > WEIGHT_EPSILON {
        return Err(ConfigError::Validation(format!(
            "scoring weights must sum to 1.0, got {}",
            sum
        )));
    }

    if config.target_word_count < 1 {
        return Err(ConfigError::Validation(
            "target_word_count must be >= 1".to_string(),
        ));
    }

    if config.latency_threshold_ms < 1 || config.size_threshold_bytes < 1 {
        return Err(ConfigError::Validation(
            "latency_threshold_ms and size_threshold_bytes must be >= 1".to_string(),
        ));
    }

    if config.min_internal_links < 1 {
        return Err(ConfigError::Validation(
            "min_internal_links must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_lookup_config(config: &LookupConfig) -> Result<(), ConfigError> {
    if config.enabled && config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "lookup timeout_ms must be >= 1 when lookup is enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if let Some(raw) = &config.remote_debugging_url {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("remote_debugging_url {}: {}", raw, e)))?;
        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "remote_debugging_url must be a ws:// or http:// URL, got {}",
                raw
            )));
        }
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid contact_email: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}
