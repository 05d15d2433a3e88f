//! Sumi-Lens: A site audit engine
//!
//! This crate crawls a website from a seed URL, extracts technical, on-page,
//! performance and content signals from every page it reaches, scores each page
//! against a fixed rule table, and aggregates the results into exportable
//! PDF/CSV reports.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetcher;
pub mod output;
pub mod robots;
pub mod score;
pub mod screenshot;
pub mod server;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Lens operations
#[derive(Debug, Error)]
pub enum LensError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Crawl failed: {0}")]
    CrawlFatal(#[from] CrawlFatalError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::AuditStatus,
        to: state::AuditStatus,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// A single page could not be retrieved.
///
/// Every variant carries the URL that was being fetched; the crawl records
/// the page as failed and keeps going.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} is not an HTML document ({content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("Browser session unavailable while fetching {url}: {message}")]
    SessionUnavailable { url: String, message: String },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::NotHtml { url, .. }
            | FetchError::SessionUnavailable { url, .. } => url,
        }
    }
}

/// A screenshot could not be produced. Always absorbed into a placeholder.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Capture of {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Capture of {url} failed: {message}")]
    Failed { url: String, message: String },

    #[error("Element '{selector}' not found on {url}")]
    ElementNotFound { url: String, selector: String },
}

/// A document fragment could not be interpreted. Treated as an empty signal.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid JSON-LD block: {0}")]
    StructuredData(#[from] serde_json::Error),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// A report could not be rendered.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Layout error in section '{section}': {message}")]
    Layout { section: String, message: String },

    #[error("Invalid report encoding: {0}")]
    Encoding(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// The crawl could not produce any result at all.
///
/// Carries the failed aggregate so callers can still report on it.
#[derive(Debug, Error)]
#[error("Crawl of {seed} failed: {message}")]
pub struct CrawlFatalError {
    pub seed: String,
    pub message: String,
    pub result: Box<crawler::MultiPageAuditResult>,
}

/// Result type alias for Sumi-Lens operations
pub type Result<T> = std::result::Result<T, LensError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{MultiPageAuditResult, Orchestrator, PageAuditResult};
pub use score::{AuditCheck, Scorer};
pub use state::AuditStatus;
pub use url::{extract_domain, normalize_url, SiteScope};
