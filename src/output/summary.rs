//! Human-readable summaries for the terminal
//!
//! This module renders crawl aggregates and stored audit history as plain
//! text for the CLI.

use crate::crawler::MultiPageAuditResult;
use crate::score::CheckCategory;
use crate::storage::RunRecord;
use std::fmt::Write;

/// Issues listed in the terminal summary
const MAX_SUMMARY_ISSUES: usize = 10;

/// Formats an aggregate for display
///
/// # Arguments
///
/// * `result` - The finished crawl
///
/// # Returns
///
/// Multi-line text ending with a newline
pub fn format_summary(result: &MultiPageAuditResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_summary(&mut out, result);
    out
}

fn write_summary(out: &mut String, result: &MultiPageAuditResult) -> std::fmt::Result {
    writeln!(out, "=== Audit of {} ===\n", result.seed_url)?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Audit ID: {}", result.audit_id)?;
    writeln!(out, "  Status: {}", result.status)?;
    if result.cancelled {
        writeln!(out, "  Cancelled before the crawl finished")?;
    }
    if let Some(error) = &result.error {
        writeln!(out, "  Error: {}", error)?;
    }
    if let Some(completed) = result.completed_at {
        let seconds = (completed - result.started_at).num_milliseconds() as f64 / 1000.0;
        writeln!(out, "  Duration: {:.1}s", seconds)?;
    }
    writeln!(
        out,
        "  Pages: {} crawled, {} audited, {} failed",
        result.pages_crawled,
        result.pages_audited(),
        result.pages_failed
    )?;
    writeln!(out, "  Health Score: {}/100", result.score)?;
    writeln!(out)?;

    writeln!(out, "Category Scores:")?;
    for category in CheckCategory::ALL {
        writeln!(
            out,
            "  {:<12} {:>3}/100",
            category.as_str(),
            result.category_scores.get(category)
        )?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "Issues: {} ({} errors, {} warnings, {} notices)",
        result.issues.total(),
        result.issues.errors,
        result.issues.warnings,
        result.issues.notices
    )?;
    for issue in result.top_issues.iter().take(MAX_SUMMARY_ISSUES) {
        writeln!(
            out,
            "  [{}] {}: {} pages ({:.1}%)",
            issue.severity.as_str(),
            issue.title,
            issue.count,
            issue.percentage
        )?;
    }
    if result.top_issues.len() > MAX_SUMMARY_ISSUES {
        writeln!(
            out,
            "  ... and {} more",
            result.top_issues.len() - MAX_SUMMARY_ISSUES
        )?;
    }

    let failures: Vec<_> = result.pages.iter().filter(|p| !p.is_success()).collect();
    if !failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed Pages ({}):", failures.len())?;
        for page in failures {
            writeln!(
                out,
                "  - {} [{}] {}",
                page.url,
                page.status,
                page.error.as_deref().unwrap_or("")
            )?;
        }
    }

    Ok(())
}

/// Prints an aggregate to stdout
pub fn print_summary(result: &MultiPageAuditResult) {
    print!("{}", format_summary(result));
}

/// Formats stored runs as a table, newest first
pub fn format_history(runs: &[RunRecord]) -> String {
    if runs.is_empty() {
        return "No audits recorded.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:>4}  {:<16}  {:<10}  {:>5}  {:>5}  {:<25}  {}\n",
        "ID", "AUDIT", "STATUS", "SCORE", "PAGES", "STARTED", "URL"
    ));
    for run in runs {
        let score = run
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>4}  {:<16}  {:<10}  {:>5}  {:>5}  {:<25}  {}\n",
            run.id,
            run.audit_id,
            run.status.to_db_string(),
            score,
            run.pages_crawled,
            run.started_at,
            run.seed_url
        ));
    }
    out
}

pub fn print_history(runs: &[RunRecord]) {
    print!("{}", format_history(runs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{AuditHeader, PageAuditResult};
    use crate::state::AuditStatus;
    use crate::FetchError;

    #[test]
    fn test_summary_lists_failed_pages() {
        let url = "https://example.com/gone".to_string();
        let page = PageAuditResult::failed(
            url.clone(),
            1,
            &FetchError::HttpStatus {
                url: url.clone(),
                status: 404,
            },
        );
        let result = MultiPageAuditResult::aggregate(
            AuditHeader::new("https://example.com/", "example.com"),
            AuditStatus::Completed,
            vec![page],
            false,
        );

        let text = format_summary(&result);
        assert!(text.starts_with("=== Audit of https://example.com/ ==="));
        assert!(text.contains("Pages: 1 crawled, 0 audited, 1 failed"));
        assert!(text.contains("Failed Pages (1):"));
        assert!(text.contains("https://example.com/gone [dead_link]"));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(format_history(&[]), "No audits recorded.\n");
    }
}
