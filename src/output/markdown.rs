//! Markdown report generation
//!
//! This module renders a Job as a human-readable markdown report: scan
//! metadata, sub-scores, link and domain summaries, and a per-page table.

use crate::analysis::ScoreReport;
use crate::jobs::Job;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of a Job to a file
///
/// # Arguments
///
/// * `job` - The Job to report on
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(job: &Job, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(job);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a Job as markdown
///
/// Works for every status; sections without data are left out.
pub fn format_markdown_report(job: &Job) -> String {
    let mut md = String::new();

    md.push_str("# Site Scan Report\n\n");

    md.push_str("## Scan Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", job.id));
    md.push_str(&format!("- **URL**: {}\n", job.request.url()));
    md.push_str(&format!("- **Status**: {}\n", job.status));
    md.push_str(&format!("- **Created**: {}\n", job.created_at.to_rfc3339()));
    if let Some(completed) = job.completed_at {
        md.push_str(&format!("- **Finished**: {}\n", completed.to_rfc3339()));
        if let Some(started) = job.started_at {
            let seconds = (completed - started).num_milliseconds() as f64 / 1000.0;
            md.push_str(&format!("- **Duration**: {:.2} seconds\n", seconds));
        }
    }
    md.push_str(&format!(
        "- **Pages Visited**: {} / {}\n",
        job.pages_visited, job.max_pages
    ));
    if let Some(reason) = job.failure_reason {
        md.push_str(&format!("- **Failure Reason**: {}\n", reason));
    }
    if let Some(message) = &job.error_message {
        md.push_str(&format!("- **Error**: {}\n", message));
    }
    md.push('\n');

    if let Some(report) = &job.report {
        push_report(&mut md, report);
    }

    if job.has_screenshot || job.has_html_archive {
        md.push_str("## Artifacts\n\n");
        if job.has_screenshot {
            md.push_str("- Homepage screenshot\n");
        }
        if job.has_html_archive {
            md.push_str("- HTML archive\n");
        }
        md.push('\n');
    }

    if !job.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in &job.warnings {
            md.push_str(&format!("- {}\n", warning));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Site Scanner*\n");

    md
}

fn push_report(md: &mut String, report: &ScoreReport) {
    md.push_str("## Scores\n\n");
    if report.no_data {
        md.push_str("No page was fetched successfully, so there is nothing to score.\n\n");
    } else {
        md.push_str("| Category | Score |\n");
        md.push_str("|----------|-------|\n");
        md.push_str(&format!("| Content | {:.2} |\n", report.content_score));
        md.push_str(&format!("| SEO | {:.2} |\n", report.seo_score));
        md.push_str(&format!("| Performance | {:.2} |\n", report.performance_score));
        md.push_str(&format!("| **Aggregate** | **{:.2}** |\n\n", report.aggregate_score));
    }
    md.push_str(&format!(
        "Scored {} of {} crawled pages.\n\n",
        report.pages_scored, report.pages_crawled
    ));

    md.push_str("## Links\n\n");
    md.push_str(&format!("- **Total**: {}\n", report.links.total));
    md.push_str(&format!("- **Internal**: {}\n", report.links.internal));
    md.push_str(&format!("- **External**: {}\n\n", report.links.external));

    if let Some(domain) = &report.domain {
        let unknown = || "unknown".to_string();
        md.push_str("## Domain\n\n");
        md.push_str(&format!("- **Domain**: {}\n", domain.domain));
        md.push_str(&format!(
            "- **IP Address**: {}\n",
            domain.ip_address.clone().unwrap_or_else(unknown)
        ));
        md.push_str(&format!(
            "- **Registrar**: {}\n",
            domain.registrar.clone().unwrap_or_else(unknown)
        ));
        md.push_str(&format!(
            "- **Registered**: {}\n",
            domain
                .created_at
                .map(|at| at.date_naive().to_string())
                .unwrap_or_else(unknown)
        ));
        md.push_str(&format!(
            "- **AS Owner**: {}\n\n",
            domain.as_owner.clone().unwrap_or_else(unknown)
        ));
    }

    if !report.pages.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| URL | Status | Latency (ms) | Size (bytes) | Score |\n");
        md.push_str("|-----|--------|--------------|--------------|-------|\n");
        for page in &report.pages {
            let status = page
                .status_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "-".to_string());
            let score = match (&page.scores, &page.error) {
                (Some(scores), _) => format!("{:.2}", scores.aggregate),
                (None, Some(error)) => error.to_string(),
                (None, None) => "-".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                page.url, status, page.latency_ms, page.content_length, score
            ));
        }
        md.push('\n');
    }
}
