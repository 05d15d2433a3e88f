//! Headless Chromium fetcher

use super::{collect_headers, resolve_addresses, PageFetcher, PageSnapshot};
use crate::browser::{navigate, BrowserError, BrowserSession};
use crate::config::Config;
use crate::FetchError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Reads the navigation timing entry for the current document.
const NAVIGATION_TIMING_SCRIPT: &str = r#"
    (() => {
        const entry = performance.getEntriesByType('navigation')[0];
        if (!entry) {
            return { status: 0, ttfb: null };
        }
        return {
            status: entry.responseStatus || 0,
            ttfb: Math.round(entry.responseStart),
        };
    })()
"#;

#[derive(Debug, Default, Deserialize)]
struct NavigationTiming {
    status: u16,
    ttfb: Option<f64>,
}

/// Renders pages in headless Chromium
///
/// Every fetch runs in its own page, which is closed on success and failure
/// alike. The page's status code comes from the navigation timing entry when
/// the browser exposes it; headers come from a lightweight HEAD request because
/// CDP does not surface them for the main document without network tracing.
pub struct BrowserFetcher {
    session: Arc<BrowserSession>,
    head_client: Client,
    user_agent: String,
    navigation_timeout: Duration,
    settle_timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(session: Arc<BrowserSession>, head_client: Client, config: &Config) -> Self {
        Self {
            session,
            head_client,
            user_agent: config.browser.user_agent.clone(),
            navigation_timeout: Duration::from_millis(config.timeouts.navigation_ms),
            settle_timeout: Duration::from_millis(config.timeouts.settle_ms),
        }
    }

    async fn fetch_on(&self, page: &Page, url: &Url) -> Result<PageSnapshot, FetchError> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| session_error(url, e.into()))?;

        let started = Instant::now();
        navigate(page, url.as_str(), self.navigation_timeout, self.settle_timeout)
            .await
            .map_err(|e| navigation_error(url, e))?;
        let load_time_ms = started.elapsed().as_millis() as u64;

        let final_url = page
            .url()
            .await
            .map_err(|e| session_error(url, e.into()))?
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());
        let html = page
            .content()
            .await
            .map_err(|e| session_error(url, e.into()))?;

        let timing = match page.evaluate(NAVIGATION_TIMING_SCRIPT.to_string()).await {
            Ok(result) => result.into_value::<NavigationTiming>().unwrap_or_default(),
            Err(e) => {
                debug!("Navigation timing unavailable for {}: {}", url, e);
                NavigationTiming::default()
            }
        };

        let (head_status, headers) = self.head_headers(&final_url).await;
        let status = match timing.status {
            0 => head_status.unwrap_or(200),
            status => status,
        };

        if status >= 400 {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let resolved = Url::parse(&final_url).unwrap_or_else(|_| url.clone());
        let addresses = resolve_addresses(&resolved, self.navigation_timeout).await;

        Ok(PageSnapshot {
            url: url.to_string(),
            final_url,
            status,
            headers,
            html,
            load_time_ms,
            ttfb_ms: timing.ttfb.map(|t| t.max(0.0) as u64),
            addresses,
            fetched_at: Utc::now(),
        })
    }

    /// HEAD request for the rendered document's response headers
    async fn head_headers(&self, url: &str) -> (Option<u16>, BTreeMap<String, String>) {
        match self.head_client.head(url).send().await {
            Ok(response) => (
                Some(response.status().as_u16()),
                collect_headers(response.headers()),
            ),
            Err(e) => {
                debug!("HEAD request failed for {}: {}", url, e);
                (None, BTreeMap::new())
            }
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot, FetchError> {
        let page = self
            .session
            .new_page()
            .await
            .map_err(|e| session_error(url, e))?;

        let result = self.fetch_on(&page, url).await;
        self.session.close_page(page).await;
        result
    }
}

fn session_error(url: &Url, e: BrowserError) -> FetchError {
    FetchError::SessionUnavailable {
        url: url.to_string(),
        message: e.to_string(),
    }
}

fn navigation_error(url: &Url, e: BrowserError) -> FetchError {
    match e {
        BrowserError::Timeout { timeout_ms, .. } => FetchError::Timeout {
            url: url.to_string(),
            timeout_ms,
        },
        BrowserError::Navigation { message, .. } => FetchError::Network {
            url: url.to_string(),
            message,
        },
        other => session_error(url, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_timeout_maps_to_fetch_timeout() {
        let url = Url::parse("https://example.com/").unwrap();
        let err = navigation_error(
            &url,
            BrowserError::Timeout {
                url: url.to_string(),
                timeout_ms: 15_000,
            },
        );
        assert!(matches!(err, FetchError::Timeout { timeout_ms: 15_000, .. }));
    }

    #[test]
    fn test_navigation_failure_maps_to_network_error() {
        let url = Url::parse("https://nonexistent.invalid/").unwrap();
        let err = navigation_error(
            &url,
            BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            },
        );
        match err {
            FetchError::Network { message, .. } => assert!(message.contains("ERR_NAME")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_launch_failure_maps_to_session_unavailable() {
        let url = Url::parse("https://example.com/").unwrap();
        let err = navigation_error(&url, BrowserError::NotFound("missing".to_string()));
        assert!(matches!(err, FetchError::SessionUnavailable { .. }));
    }
}
