//! Per-page results and the crawl aggregate

use crate::extract::RawSignals;
use crate::score::{mean, AuditCheck, CategoryScores, CheckCategory, PageScore, Severity};
use crate::state::{AuditStatus, PageStatus};
use crate::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Most top issues kept on an aggregate
pub const MAX_TOP_ISSUES: usize = 20;

pub const PAGE_FETCH_FAILED: &str = "Page Fetch Failed";
pub const DUPLICATE_TITLES: &str = "Duplicate Title Tags";
pub const DUPLICATE_DESCRIPTIONS: &str = "Duplicate Meta Descriptions";

/// The audit of one URL
///
/// Either fully scored (`status` is `audited`) or failed with an error and
/// no signals; never partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAuditResult {
    pub url: String,
    pub depth: u32,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<RawSignals>,
    pub checks: Vec<AuditCheck>,
    pub category_scores: CategoryScores,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub audited_at: DateTime<Utc>,
}

impl PageAuditResult {
    pub fn audited(depth: u32, signals: RawSignals, scored: PageScore) -> Self {
        Self {
            url: signals.url.clone(),
            depth,
            status: PageStatus::Audited,
            checks: scored.checks,
            category_scores: scored.category_scores,
            score: scored.overall,
            signals: Some(signals),
            error: None,
            audited_at: Utc::now(),
        }
    }

    pub fn failed(url: impl Into<String>, depth: u32, error: &FetchError) -> Self {
        Self {
            url: url.into(),
            depth,
            status: PageStatus::from_fetch_error(error),
            signals: None,
            checks: Vec::new(),
            category_scores: CategoryScores::default(),
            score: 0,
            error: Some(error.to_string()),
            audited_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn title(&self) -> Option<&str> {
        self.signals.as_ref()?.meta.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.signals.as_ref()?.meta.description.as_deref()
    }
}

/// Issue totals by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: usize,
    pub warnings: usize,
    pub notices: usize,
}

impl IssueCounts {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.notices
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Notice => self.notices += 1,
        }
    }
}

/// One problem and how many pages share it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopIssue {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CheckCategory>,
    pub severity: Severity,
    /// Affected pages
    pub count: usize,
    /// Share of crawled pages affected
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// The finished crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiPageAuditResult {
    pub audit_id: String,
    pub seed_url: String,
    pub domain: String,
    pub status: AuditStatus,
    /// Pages in completion order
    pub pages: Vec<PageAuditResult>,
    /// Mean score of audited pages
    pub score: u8,
    pub category_scores: CategoryScores,
    pub issues: IssueCounts,
    pub top_issues: Vec<TopIssue>,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl MultiPageAuditResult {
    /// Folds finished pages into an aggregate
    ///
    /// # Arguments
    ///
    /// * `header` - Identity of the crawl
    /// * `status` - Terminal status decided by the orchestrator
    /// * `pages` - Finished pages in completion order
    /// * `cancelled` - Whether the crawl stopped early on request
    pub fn aggregate(
        header: AuditHeader,
        status: AuditStatus,
        pages: Vec<PageAuditResult>,
        cancelled: bool,
    ) -> Self {
        let audited: Vec<&PageAuditResult> = pages.iter().filter(|p| p.is_success()).collect();
        let score = mean(audited.iter().map(|p| p.score));
        let category_scores = CategoryScores::mean_of(audited.iter().map(|p| &p.category_scores));
        let (issues, top_issues) = tally_issues(&pages);

        Self {
            audit_id: header.audit_id,
            seed_url: header.seed_url,
            domain: header.domain,
            status,
            score,
            category_scores,
            issues,
            top_issues,
            pages_crawled: pages.len(),
            pages_failed: pages.len() - audited.len(),
            cancelled,
            error: None,
            started_at: header.started_at,
            completed_at: Some(Utc::now()),
            pages,
        }
    }

    /// A crawl that produced nothing
    pub fn failed(header: AuditHeader, message: impl Into<String>) -> Self {
        let mut result = Self::aggregate(header, AuditStatus::Failed, Vec::new(), false);
        result.error = Some(message.into());
        result
    }

    pub fn pages_audited(&self) -> usize {
        self.pages_crawled - self.pages_failed
    }
}

/// Identity shared by every result of one crawl
#[derive(Debug, Clone)]
pub struct AuditHeader {
    pub audit_id: String,
    pub seed_url: String,
    pub domain: String,
    pub started_at: DateTime<Utc>,
}

impl AuditHeader {
    pub fn new(seed_url: impl Into<String>, domain: impl Into<String>) -> Self {
        let seed_url = seed_url.into();
        let started_at = Utc::now();
        Self {
            audit_id: audit_id(&seed_url, &started_at),
            seed_url,
            domain: domain.into(),
            started_at,
        }
    }
}

/// First 16 hex characters of SHA-256(seed + start time)
pub fn audit_id(seed_url: &str, started_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed_url.as_bytes());
    hasher.update(started_at.to_rfc3339().as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(16);
    id
}

/// Builds issue totals and the ranked issue list
fn tally_issues(pages: &[PageAuditResult]) -> (IssueCounts, Vec<TopIssue>) {
    let mut counts = IssueCounts::default();
    let mut ranked = IssueRanking::default();

    for page in pages {
        if !page.is_success() {
            counts.add(Severity::Error);
            ranked.hit(
                PAGE_FETCH_FAILED,
                None,
                Severity::Error,
                Some("Make sure every linked page is reachable and returns HTML"),
            );
            continue;
        }
        for check in &page.checks {
            if let Some(severity) = check.severity() {
                counts.add(severity);
                ranked.hit(
                    &check.name,
                    Some(check.category),
                    severity,
                    check.recommendation.as_deref(),
                );
            }
        }
    }

    let duplicates = [
        (
            DUPLICATE_TITLES,
            duplicated(pages, PageAuditResult::title),
            "Give every page a unique title",
        ),
        (
            DUPLICATE_DESCRIPTIONS,
            duplicated(pages, PageAuditResult::description),
            "Give every page a unique meta description",
        ),
    ];
    for (title, affected, recommendation) in duplicates {
        for _ in 0..affected {
            counts.add(Severity::Error);
            ranked.hit(
                title,
                Some(CheckCategory::OnPage),
                Severity::Error,
                Some(recommendation),
            );
        }
    }

    (counts, ranked.finish(pages.len()))
}

/// Number of audited pages whose value is shared with another page
fn duplicated<'a>(
    pages: &'a [PageAuditResult],
    value: impl Fn(&'a PageAuditResult) -> Option<&'a str>,
) -> usize {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for page in pages {
        if let Some(v) = value(page).map(str::trim).filter(|v| !v.is_empty()) {
            *seen.entry(v.to_lowercase()).or_insert(0) += 1;
        }
    }
    seen.values().filter(|n| **n > 1).sum()
}

#[derive(Default)]
struct IssueRanking {
    issues: Vec<TopIssue>,
    index: HashMap<String, usize>,
}

impl IssueRanking {
    fn hit(
        &mut self,
        title: &str,
        category: Option<CheckCategory>,
        severity: Severity,
        recommendation: Option<&str>,
    ) {
        if let Some(&i) = self.index.get(title) {
            let issue = &mut self.issues[i];
            issue.count += 1;
            // Error < Warning < Notice
            issue.severity = issue.severity.min(severity);
            return;
        }
        self.index.insert(title.to_string(), self.issues.len());
        self.issues.push(TopIssue {
            title: title.to_string(),
            category,
            severity,
            count: 1,
            percentage: 0.0,
            recommendation: recommendation.map(str::to_string),
        });
    }

    fn finish(mut self, pages_crawled: usize) -> Vec<TopIssue> {
        for issue in &mut self.issues {
            issue.percentage = if pages_crawled == 0 {
                0.0
            } else {
                ((issue.count as f64 / pages_crawled as f64) * 10_000.0).round() / 100.0
            };
        }
        // Stable: ties stay in first-seen order
        self.issues.sort_by(|a, b| b.count.cmp(&a.count));
        self.issues.truncate(MAX_TOP_ISSUES);
        self.issues
    }
}
