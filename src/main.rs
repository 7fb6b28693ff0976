//! Site Scanner main entry point
//!
//! This is the command-line interface for the Site Scanner.

use anyhow::{bail, Context};
use clap::Parser;
use site_scanner::config::{load_config_with_hash, Config};
use site_scanner::jobs::{JobId, JobManager, RawScanRequest};
use site_scanner::output::{export_scan, format_markdown_report};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Interval between status polls while waiting for a scan
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Site Scanner: crawl a website and score its content, SEO and performance
///
/// Site Scanner visits a bounded number of pages breadth-first from a start
/// URL, scores every fetched page, and stores a report together with an HTML
/// archive of the crawl.
#[derive(Parser, Debug)]
#[command(name = "site-scanner")]
#[command(version)]
#[command(about = "Crawl-and-score website scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL to scan
    #[arg(value_name = "URL", required_unless_present_any = ["list", "show", "delete", "dry_run"])]
    url: Option<String>,

    /// Maximum number of pages to visit (defaults to the configured value)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Do not capture a homepage screenshot
    #[arg(long)]
    no_screenshot: bool,

    /// Do not build the HTML archive
    #[arg(long)]
    no_html: bool,

    /// Directory for the report and artifact files
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// List stored scans and exit
    #[arg(long, conflicts_with_all = ["url", "show", "delete", "dry_run"])]
    list: bool,

    /// Print the report of a stored scan and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["url", "delete", "dry_run"])]
    show: Option<String>,

    /// Delete a stored scan and its artifacts
    #[arg(long, value_name = "ID", conflicts_with_all = ["url", "dry_run"])]
    delete: Option<String>,

    /// Validate config and the request without scanning
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config, &cli);
    }

    let manager = JobManager::from_config(&config)?;

    if cli.list {
        handle_list(&manager)
    } else if let Some(id) = &cli.show {
        handle_show(&manager, parse_id(id)?)
    } else if let Some(id) = &cli.delete {
        let id = parse_id(id)?;
        manager.delete_job(id)?;
        println!("✓ Deleted scan {}", id);
        Ok(())
    } else {
        handle_scan(&manager, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_scanner=info,warn"),
            1 => EnvFilter::new("site_scanner=debug,info"),
            2 => EnvFilter::new("site_scanner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_id(raw: &str) -> anyhow::Result<JobId> {
    raw.parse()
        .with_context(|| format!("invalid scan id: {}", raw))
}

fn build_request(cli: &Cli) -> anyhow::Result<RawScanRequest> {
    let Some(url) = &cli.url else {
        bail!("a URL is required to start a scan");
    };

    Ok(RawScanRequest {
        url: url.clone(),
        max_pages: cli.max_pages,
        include_screenshot: Some(!cli.no_screenshot),
        include_html: Some(!cli.no_html),
        page_timeout_ms: None,
    })
}

/// Handles the --dry-run mode: validates config and shows what would be scanned
fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    println!("=== Site Scanner Dry Run ===\n");

    println!("Scanner Configuration:");
    println!("  Workers: {}", config.scanner.workers);
    println!("  Job timeout: {}s", config.scanner.job_timeout_secs);
    println!("  Job lease: {}s", config.scanner.lease_secs);

    println!("\nCrawler Configuration:");
    println!("  Default max pages: {}", config.crawler.default_max_pages);
    println!("  Max pages ceiling: {}", config.crawler.max_pages_ceiling);
    println!("  Page timeout: {}ms", config.crawler.page_timeout_ms);
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages_open
    );
    println!("  Renderer pool size: {}", config.crawler.renderer_pool_size);
    println!("  Renderer engine: {:?}", config.renderer.engine);
    for pattern in &config.crawler.allowed_domains {
        println!("  Allowed domain: {}", pattern);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nScoring Weights:");
    println!("  Content: {}", config.scoring.content_weight);
    println!("  SEO: {}", config.scoring.seo_weight);
    println!("  Performance: {}", config.scoring.performance_weight);

    println!("\nStorage: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");

    if cli.url.is_some() {
        let request = site_scanner::ScanRequest::from_raw(build_request(cli)?, &config.crawler)?;
        println!(
            "✓ Would scan {} (up to {} pages, screenshot: {}, HTML archive: {})",
            request.url(),
            request.max_pages(),
            request.include_screenshot() && config.artifacts.screenshots,
            request.include_html() && config.artifacts.html_archive
        );
    }

    Ok(())
}

/// Handles the --list mode
fn handle_list(manager: &JobManager) -> anyhow::Result<()> {
    let jobs = manager.list_jobs()?;
    if jobs.is_empty() {
        println!("No scans stored");
        return Ok(());
    }

    println!(
        "{:<36}  {:<11}  {:>9}  {:>7}  URL",
        "ID", "STATUS", "PAGES", "SCORE"
    );
    for job in jobs {
        let score = job
            .aggregate_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36}  {:<11}  {:>9}  {:>7}  {}",
            job.id,
            job.status.to_string(),
            format!("{}/{}", job.pages_visited, job.max_pages),
            score,
            job.url
        );
    }

    Ok(())
}

/// Handles the --show mode
fn handle_show(manager: &JobManager, id: JobId) -> anyhow::Result<()> {
    let job = manager.get_job(id)?;
    println!("{}", format_markdown_report(&job));
    Ok(())
}

/// Handles the main scan operation
async fn handle_scan(manager: &JobManager, cli: &Cli) -> anyhow::Result<()> {
    let id = manager.submit_raw(build_request(cli)?)?;
    println!("Scan {} submitted", id);

    let mut last_seen = None;
    let report_progress = |job: &site_scanner::Job| {
        if last_seen != Some(job.pages_visited) {
            last_seen = Some(job.pages_visited);
            tracing::info!(
                "Progress: {}/{} pages ({})",
                job.pages_visited,
                job.max_pages,
                job.status
            );
        }
    };

    let job = tokio::select! {
        job = manager.wait_for_terminal(id, POLL_INTERVAL, report_progress) => job?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling scan {}", id);
            manager.cancel(id)?;
            manager.wait_for_terminal(id, POLL_INTERVAL, |_| {}).await?
        }
    };

    let written = export_scan(manager, &job, &cli.output_dir)?;
    for path in &written {
        println!("✓ Wrote {}", path.display());
    }

    if job.is_partial_success() {
        for warning in &job.warnings {
            println!("! {}", warning);
        }
    }

    match (&job.report, &job.error_message) {
        (Some(report), _) if report.no_data => {
            println!("Scan completed, but no page could be scored");
            Ok(())
        }
        (Some(report), _) => {
            println!(
                "✓ Scan completed: aggregate score {:.2} over {} pages",
                report.aggregate_score, report.pages_scored
            );
            Ok(())
        }
        (None, message) => bail!(
            "scan {} failed: {}",
            id,
            message.as_deref().unwrap_or("unknown error")
        ),
    }
}
