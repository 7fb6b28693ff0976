use serde::Deserialize;

/// Main configuration structure for Site Scanner
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

/// Job execution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScannerConfig {
    /// Number of worker slots, i.e. Jobs that may run at the same time
    pub workers: u32,

    /// Wall-clock ceiling for a whole Job (seconds)
    pub job_timeout_secs: u64,

    /// How long an unfinished Job stays owned without a heartbeat (seconds)
    ///
    /// Owners renew the lease every third of this period. Other processes
    /// fail Jobs whose lease has run out.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

fn default_lease_secs() -> u64 {
    30
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            job_timeout_secs: 300,
            lease_secs: default_lease_secs(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Page budget used when a request does not name one
    pub default_max_pages: u32,

    /// Largest page budget a request may ask for
    pub max_pages_ceiling: u32,

    /// Hard timeout for a single page render (milliseconds)
    pub page_timeout_ms: u64,

    /// Maximum number of concurrent page fetches within one Job
    pub max_concurrent_pages_open: u32,

    /// Number of rendering-engine instances shared by all Jobs
    pub renderer_pool_size: u32,

    /// Off-origin domain patterns that are still followed (e.g. "*.example.com")
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            default_max_pages: 10,
            max_pages_ceiling: 100,
            page_timeout_ms: 20_000,
            max_concurrent_pages_open: 4,
            renderer_pool_size: 4,
            allowed_domains: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteScanner".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/site-scanner".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Scoring weights and thresholds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoringConfig {
    pub content_weight: f64,
    pub seo_weight: f64,
    pub performance_weight: f64,

    /// Word count at which the content word component saturates its linear range
    pub target_word_count: u32,

    /// Fetch latency above which the performance score is penalized (milliseconds)
    pub latency_threshold_ms: u64,

    /// Payload size above which the performance score is penalized (bytes)
    pub size_threshold_bytes: u64,

    /// Internal links a page needs for full internal-link credit
    pub min_internal_links: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            content_weight: 0.4,
            seo_weight: 0.3,
            performance_weight: 0.3,
            target_word_count: 300,
            latency_threshold_ms: 1_500,
            size_threshold_bytes: 512_000,
            min_internal_links: 3,
        }
    }
}

/// Artifact production switches
///
/// These are ANDed with the per-request flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactConfig {
    pub screenshots: bool,
    pub html_archive: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            screenshots: true,
            html_archive: true,
        }
    }
}

/// Job registry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file (":memory:" for an ephemeral registry)
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./site-scanner.db".to_string(),
        }
    }
}

/// Domain/IP lookup configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LookupConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3_000,
        }
    }
}

/// Rendering engine used for page fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererEngine {
    /// Plain HTTP fetches; no JavaScript, no screenshots
    #[default]
    Http,

    /// Headless Chrome over the DevTools protocol; captures screenshots
    Chromium,
}

/// Rendering engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererConfig {
    #[serde(default)]
    pub engine: RendererEngine,

    /// Chrome binary to launch instead of the one found on the system
    #[serde(default)]
    pub chrome_path: Option<String>,

    /// DevTools websocket of an already running browser; skips launching one
    #[serde(default)]
    pub remote_debugging_url: Option<String>,
}
