//! Progress events streamed while a crawl runs

use super::MultiPageAuditResult;
use serde::{Deserialize, Serialize};

/// Snapshot emitted after every finished page (success or failure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    /// Pages finished so far
    pub current: usize,
    /// The crawl's page limit
    pub total: usize,
    pub current_url: String,
    /// `current / total * 100`, one decimal
    pub percentage: f64,
}

impl CrawlProgress {
    pub fn new(current: usize, total: usize, current_url: impl Into<String>) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            ((current as f64 / total as f64) * 1000.0).round() / 10.0
        };
        Self {
            current,
            total,
            current_url: current_url.into(),
            percentage,
        }
    }
}

/// One frame of the crawl event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CrawlEvent {
    Progress { progress: CrawlProgress },
    Complete { result: Box<MultiPageAuditResult> },
}
