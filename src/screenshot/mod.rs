//! Screenshot capture
//!
//! [`ScreenshotCapture`] produces page images as data-URIs. Real captures go
//! through a [`CaptureBackend`] (headless Chromium in production); anything
//! beyond the per-batch cap, and any capture that fails, gets a generated
//! placeholder instead. A batch therefore never fails and always yields one
//! image per input URL.

mod chromium;
mod placeholder;

pub use chromium::{CaptureProfile, CaptureSettings, ChromiumBackend};
pub use placeholder::{placeholder_data_uri, PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};

use crate::CaptureError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What part of a page to capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureKind {
    /// The whole scrollable page
    FullPage,
    /// Only the first desktop viewport
    AboveFold,
    /// First viewport at mobile size with a mobile user agent
    Mobile,
    /// A single element matched by a CSS selector
    Element(String),
    /// The full page with matching elements outlined
    Highlight(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub url: String,
    pub kind: CaptureKind,
}

impl CaptureRequest {
    pub fn new(url: impl Into<String>, kind: CaptureKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Something that can render a page to PNG bytes
///
/// `open` runs before a batch and `close` after it, on every path.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn open(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError>;

    async fn close(&self) {}
}

/// One image in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub url: String,
    pub data_uri: String,
    /// True when the image is a generated stand-in
    pub placeholder: bool,
}

impl Screenshot {
    fn captured(url: &str, png: &[u8]) -> Self {
        Self {
            url: url.to_string(),
            data_uri: png_data_uri(png),
            placeholder: false,
        }
    }

    fn placeholder(url: &str) -> Self {
        Self {
            url: url.to_string(),
            data_uri: placeholder_data_uri(url),
            placeholder: true,
        }
    }
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Captures page images with placeholder fallback
pub struct ScreenshotCapture<B> {
    backend: B,
    max_captures: usize,
}

impl<B: CaptureBackend> ScreenshotCapture<B> {
    /// # Arguments
    ///
    /// * `backend` - Renders real captures
    /// * `max_captures` - Real captures per batch; later URLs get placeholders
    pub fn new(backend: B, max_captures: usize) -> Self {
        Self {
            backend,
            max_captures,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Captures the full page of every URL, in input order
    ///
    /// The first `max_captures` URLs are rendered for real; the rest, and
    /// any that fail, receive placeholders. The backend is closed before
    /// returning, whatever happened.
    pub async fn capture_multiple(&self, urls: &[String]) -> Vec<Screenshot> {
        info!(
            "Capturing {} screenshots ({} real at most)",
            urls.len(),
            self.max_captures.min(urls.len())
        );

        let opened = match self.backend.open().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Screenshot backend unavailable, using placeholders: {}", e);
                false
            }
        };

        let mut shots = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            if !opened || index >= self.max_captures {
                shots.push(Screenshot::placeholder(url));
                continue;
            }
            let request = CaptureRequest::new(url.clone(), CaptureKind::FullPage);
            shots.push(match self.backend.capture(&request).await {
                Ok(png) => Screenshot::captured(url, &png),
                Err(e) => {
                    warn!("Screenshot of {} failed, using placeholder: {}", url, e);
                    Screenshot::placeholder(url)
                }
            });
        }

        self.backend.close().await;
        shots
    }

    pub async fn capture_page(&self, url: &str) -> Screenshot {
        self.capture_one(CaptureRequest::new(url, CaptureKind::FullPage))
            .await
    }

    pub async fn capture_above_fold(&self, url: &str) -> Screenshot {
        self.capture_one(CaptureRequest::new(url, CaptureKind::AboveFold))
            .await
    }

    pub async fn capture_mobile(&self, url: &str) -> Screenshot {
        self.capture_one(CaptureRequest::new(url, CaptureKind::Mobile))
            .await
    }

    pub async fn capture_element(&self, url: &str, selector: &str) -> Screenshot {
        self.capture_one(CaptureRequest::new(
            url,
            CaptureKind::Element(selector.to_string()),
        ))
        .await
    }

    pub async fn capture_with_highlight(&self, url: &str, selectors: &[String]) -> Screenshot {
        self.capture_one(CaptureRequest::new(
            url,
            CaptureKind::Highlight(selectors.to_vec()),
        ))
        .await
    }

    /// Single capture on the shared backend; the backend stays open
    async fn capture_one(&self, request: CaptureRequest) -> Screenshot {
        debug!("Capturing {:?} of {}", request.kind, request.url);
        let result = match self.backend.open().await {
            Ok(()) => self.backend.capture(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(png) => Screenshot::captured(&request.url, &png),
            Err(e) => {
                warn!("Screenshot of {} failed, using placeholder: {}", request.url, e);
                Screenshot::placeholder(&request.url)
            }
        }
    }

    /// Releases the backend after single captures
    pub async fn close(&self) {
        self.backend.close().await;
    }
}
