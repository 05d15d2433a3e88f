//! Storage module for persisting audit history
//!
//! This module handles all database operations for audit history, including:
//! - SQLite database initialization and schema management
//! - Run tracking with final scores and status
//! - Per-page results stored alongside their full JSON

mod schema;
mod sqlite;
mod traits;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStore;
pub use traits::{AuditStore, StorageError, StorageResult};

use crate::crawler::PageAuditResult;
use crate::state::{AuditStatus, PageStatus};
use std::path::Path;

/// Initializes or opens an audit history database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(LensError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> crate::Result<SqliteStore> {
    SqliteStore::new(path)
}

/// Represents an audit run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub audit_id: String,
    pub seed_url: String,
    pub domain: String,
    pub status: AuditStatus,
    /// Set once the run finished
    pub score: Option<u8>,
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub cancelled: bool,
    pub error_message: Option<String>,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// Represents a stored page result
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub depth: u32,
    pub status: PageStatus,
    pub score: u8,
    pub error_message: Option<String>,
    pub audited_at: String,
    result_json: String,
}

impl PageRecord {
    /// Rebuilds the full page result from its stored JSON
    pub fn result(&self) -> StorageResult<PageAuditResult> {
        Ok(serde_json::from_str(&self.result_json)?)
    }
}
