//! Crawl orchestration and aggregation
//!
//! This module contains the multi-page audit, including:
//! - The crawl frontier and visited-set (`CrawlState`)
//! - The worker loop that fetches, extracts and scores pages (`Orchestrator`)
//! - Progress events streamed while a crawl runs
//! - Per-page results and the final aggregate

mod events;
mod frontier;
mod orchestrator;
mod results;

pub use events::{CrawlEvent, CrawlProgress};
pub use frontier::{CrawlState, EnqueueOutcome, QueuedUrl};
pub use orchestrator::Orchestrator;
pub use results::{
    audit_id, AuditHeader, IssueCounts, MultiPageAuditResult, PageAuditResult, TopIssue,
    DUPLICATE_DESCRIPTIONS, DUPLICATE_TITLES, MAX_TOP_ISSUES, PAGE_FETCH_FAILED,
};
