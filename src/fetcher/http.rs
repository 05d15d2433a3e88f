//! Plain HTTP fetcher

use super::{collect_headers, resolve_addresses, PageFetcher, PageSnapshot};
use crate::FetchError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Maximum redirect hops followed for one page
const MAX_REDIRECTS: usize = 10;

/// Builds the HTTP client shared by page fetches, robots.txt and link checks
///
/// # Arguments
///
/// * `user_agent` - User agent sent with every request
/// * `timeout` - Overall per-request timeout
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over plain HTTP
///
/// The HTML is the server response as-is; no script runs. Use
/// [`super::BrowserFetcher`] for client-rendered sites.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot, FetchError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e, self.timeout))?;

        let ttfb_ms = started.elapsed().as_millis() as u64;
        let status = response.status();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = headers.get("content-type") {
            if !content_type.to_ascii_lowercase().contains("html") {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type: content_type.clone(),
                });
            }
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_error(url, e, self.timeout))?;
        let load_time_ms = started.elapsed().as_millis() as u64;

        let addresses = resolve_addresses(&final_url, self.timeout).await;

        debug!(
            "Fetched {} -> {} ({} bytes, {}ms)",
            url,
            final_url,
            html.len(),
            load_time_ms
        );

        Ok(PageSnapshot {
            url: url.to_string(),
            final_url: final_url.to_string(),
            status: status.as_u16(),
            headers,
            html,
            load_time_ms,
            ttfb_ms: Some(ttfb_ms),
            addresses,
            fetched_at: Utc::now(),
        })
    }
}

/// Maps a reqwest failure onto a [`FetchError`]
fn classify_error(url: &Url, e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if e.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("connection failed: {}", e),
        }
    } else if e.is_redirect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("too many redirects (limit {})", MAX_REDIRECTS),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        let timeout = Duration::from_secs(5);
        HttpFetcher::with_client(build_http_client("TestLens/1.0", timeout).unwrap(), timeout)
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Frame-Options", "DENY")
                    .set_body_raw("<html><head><title>Hi</title></head></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let snapshot = fetcher().fetch(&url).await.unwrap();

        assert_eq!(snapshot.status, 200);
        assert!(snapshot.html.contains("<title>Hi</title>"));
        assert_eq!(snapshot.header("X-Frame-Options"), Some("DENY"));
        assert!(!snapshot.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
        assert_eq!(err.url(), url.as_str());
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/data", server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::NotHtml { .. }));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let url = Url::parse("http://nonexistent.invalid/").unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Network { .. } | FetchError::Timeout { .. }
        ));
    }
}
