//! Audit and page lifecycle states
//!
//! # Components
//!
//! - `AuditStatus`: Lifecycle of a whole crawl (pending, crawling, completed, failed)
//! - `PageStatus`: Outcome of a single page audit

mod audit_status;
mod page_status;

pub use audit_status::AuditStatus;
pub use page_status::PageStatus;
