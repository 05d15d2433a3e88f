//! Headless Chromium support
//!
//! A [`BrowserSession`] is an explicit, owned handle to one Chromium process.
//! It is launched lazily on first use, hands out isolated pages, and must be
//! closed by its owner. Page creation and teardown are serialized through the
//! session's lock; everything else on a page runs concurrently.

mod discovery;
mod session;

pub use discovery::{find_chrome, CHROME_ENV_VAR};
pub use session::{navigate, BrowserSession, SessionSettings};

use thiserror::Error;

/// Errors raised while driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Chrome/Chromium not found: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser session is closed")]
    Closed,

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Chromium error: {0}")]
    Chromium(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Chromium(e.to_string())
    }
}
