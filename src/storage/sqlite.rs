//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the AuditStore trait.

use crate::crawler::{MultiPageAuditResult, PageAuditResult};
use crate::state::{AuditStatus, PageStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{AuditStore, StorageError, StorageResult};
use crate::storage::{PageRecord, RunRecord};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, audit_id, seed_url, domain, status, score, pages_crawled,
     pages_failed, cancelled, error_message, config_hash, started_at, finished_at";

const PAGE_COLUMNS: &str =
    "id, run_id, url, depth, status, score, error_message, audited_at, result_json";

/// SQLite audit history
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(LensError)` - Failed to open database
    pub fn new(path: &Path) -> crate::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(4)?;
    let record = RunRecord {
        id: row.get(0)?,
        audit_id: row.get(1)?,
        seed_url: row.get(2)?,
        domain: row.get(3)?,
        status: AuditStatus::Pending,
        score: row.get(5)?,
        pages_crawled: row.get(6)?,
        pages_failed: row.get(7)?,
        cancelled: row.get(8)?,
        error_message: row.get(9)?,
        config_hash: row.get(10)?,
        started_at: row.get(11)?,
        finished_at: row.get(12)?,
    };
    Ok((record, status))
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<(PageRecord, String)> {
    let status: String = row.get(4)?;
    let record = PageRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        url: row.get(2)?,
        depth: row.get(3)?,
        status: PageStatus::Failed,
        score: row.get(5)?,
        error_message: row.get(6)?,
        audited_at: row.get(7)?,
        result_json: row.get(8)?,
    };
    Ok((record, status))
}

fn with_run_status((mut record, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    record.status = AuditStatus::from_db_string(&status)
        .ok_or_else(|| {
            StorageError::Corrupt(format!("run {} has status '{}'", record.id, status))
        })?;
    Ok(record)
}

fn with_page_status((mut record, status): (PageRecord, String)) -> StorageResult<PageRecord> {
    record.status = PageStatus::from_db_string(&status)
        .ok_or_else(|| {
            StorageError::Corrupt(format!("page {} has status '{}'", record.id, status))
        })?;
    Ok(record)
}

impl AuditStore for SqliteStore {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        audit_id: &str,
        seed_url: &str,
        domain: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (audit_id, seed_url, domain, status, config_hash, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                audit_id,
                seed_url,
                domain,
                AuditStatus::Crawling.to_db_string(),
                config_hash,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, result: &MultiPageAuditResult) -> StorageResult<()> {
        let finished_at = result.completed_at.unwrap_or_else(Utc::now).to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, score = ?2, pages_crawled = ?3, pages_failed = ?4,
             cancelled = ?5, error_message = ?6, finished_at = ?7 WHERE id = ?8",
            params![
                result.status.to_db_string(),
                result.score,
                result.pages_crawled as u64,
                result.pages_failed as u64,
                result.cancelled,
                result.error,
                finished_at,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        let row = stmt
            .query_row(params![run_id], run_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::RunNotFound(run_id),
                other => StorageError::Sqlite(other),
            })?;

        with_run_status(row)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(with_run_status).collect()
    }

    // ===== Page Management =====

    fn record_page(&mut self, run_id: i64, page: &PageAuditResult) -> StorageResult<()> {
        let json = serde_json::to_string(page)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO pages
             (run_id, url, depth, status, score, error_message, result_json, audited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                page.url,
                page.depth,
                page.status.to_db_string(),
                page.score,
                page.error,
                json,
                page.audited_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE run_id = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![run_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(with_page_status).collect()
    }

    fn count_pages_by_status(&self, run_id: i64, status: PageStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1 AND status = ?2",
            params![run_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn save_result(
        &mut self,
        result: &MultiPageAuditResult,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO runs (audit_id, seed_url, domain, status, score, pages_crawled,
             pages_failed, cancelled, error_message, config_hash, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                result.audit_id,
                result.seed_url,
                result.domain,
                result.status.to_db_string(),
                result.score,
                result.pages_crawled as u64,
                result.pages_failed as u64,
                result.cancelled,
                result.error,
                config_hash,
                result.started_at.to_rfc3339(),
                result.completed_at.map(|t| t.to_rfc3339()).unwrap_or(now)
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO pages
                 (run_id, url, depth, status, score, error_message, result_json, audited_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for page in &result.pages {
                stmt.execute(params![
                    run_id,
                    page.url,
                    page.depth,
                    page.status.to_db_string(),
                    page.score,
                    page.error,
                    serde_json::to_string(page)?,
                    page.audited_at.to_rfc3339()
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::AuditHeader;
    use crate::FetchError;

    fn failed_page(path: &str) -> PageAuditResult {
        let url = format!("https://example.com{}", path);
        PageAuditResult::failed(
            url.clone(),
            1,
            &FetchError::HttpStatus { url, status: 404 },
        )
    }

    fn result(pages: Vec<PageAuditResult>) -> MultiPageAuditResult {
        MultiPageAuditResult::aggregate(
            AuditHeader::new("https://example.com/", "example.com"),
            AuditStatus::Completed,
            pages,
            false,
        )
    }

    #[test]
    fn test_create_run_starts_crawling() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let run_id = store
            .create_run("abc", "https://example.com/", "example.com", "hash")
            .unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, AuditStatus::Crawling);
        assert_eq!(run.score, None);
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_finish_run_records_aggregate() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let run_id = store
            .create_run("abc", "https://example.com/", "example.com", "hash")
            .unwrap();
        let aggregate = result(vec![failed_page("/a")]);
        store.record_page(run_id, &aggregate.pages[0]).unwrap();
        store.finish_run(run_id, &aggregate).unwrap();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, AuditStatus::Completed);
        assert_eq!(run.score, Some(0));
        assert_eq!(run.pages_crawled, 1);
        assert_eq!(run.pages_failed, 1);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let err = store.finish_run(42, &result(Vec::new())).unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound(42)));
        assert!(matches!(store.get_run(42), Err(StorageError::RunNotFound(42))));
    }

    #[test]
    fn test_recording_same_url_replaces() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let run_id = store
            .create_run("abc", "https://example.com/", "example.com", "hash")
            .unwrap();
        store.record_page(run_id, &failed_page("/a")).unwrap();
        store.record_page(run_id, &failed_page("/a")).unwrap();
        assert_eq!(store.load_pages(run_id).unwrap().len(), 1);
    }

    #[test]
    fn test_save_result_round_trip() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let aggregate = result(vec![failed_page("/a"), failed_page("/b")]);
        let run_id = store.save_result(&aggregate, "hash").unwrap();

        let pages = store.load_pages(run_id).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].url, "https://example.com/a");
        assert_eq!(pages[0].status, PageStatus::DeadLink);
        assert_eq!(pages[1].result().unwrap(), aggregate.pages[1]);
        assert_eq!(
            store
                .count_pages_by_status(run_id, PageStatus::DeadLink)
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_list_runs_newest_first() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        for _ in 0..3 {
            store.save_result(&result(Vec::new()), "hash").unwrap();
        }
        let runs = store.list_runs(2).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].id > runs[1].id);
    }
}
