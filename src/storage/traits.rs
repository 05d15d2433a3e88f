//! Storage traits and error types
//!
//! This module defines the trait interface for audit history backends and
//! associated error types.

use crate::crawler::{MultiPageAuditResult, PageAuditResult};
use crate::state::PageStatus;
use crate::storage::{PageRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent history of audits
pub trait AuditStore {
    // ===== Run Management =====

    /// Opens a run for a crawl that is starting
    ///
    /// # Arguments
    ///
    /// * `audit_id` - Identifier of the crawl
    /// * `seed_url` - The seed URL as given
    /// * `domain` - Domain of the seed
    /// * `config_hash` - Hash of the configuration in effect
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(
        &mut self,
        audit_id: &str,
        seed_url: &str,
        domain: &str,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Closes a run with the final aggregate
    fn finish_run(&mut self, run_id: i64, result: &MultiPageAuditResult) -> StorageResult<()>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Page Management =====

    /// Stores one finished page; recording the same URL twice replaces it
    fn record_page(&mut self, run_id: i64, page: &PageAuditResult) -> StorageResult<()>;

    /// Pages of a run in the order they were recorded
    fn load_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>>;

    fn count_pages_by_status(&self, run_id: i64, status: PageStatus) -> StorageResult<u64>;

    /// Stores a whole finished crawl as one run
    fn save_result(
        &mut self,
        result: &MultiPageAuditResult,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let run_id = self.create_run(
            &result.audit_id,
            &result.seed_url,
            &result.domain,
            config_hash,
        )?;
        for page in &result.pages {
            self.record_page(run_id, page)?;
        }
        self.finish_run(run_id, result)?;
        Ok(run_id)
    }
}
