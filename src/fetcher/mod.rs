//! Page fetching
//!
//! A [`PageFetcher`] turns a URL into a [`PageSnapshot`]: the fully rendered
//! HTML, the response status and headers, timing, and the addresses the host
//! resolved to. Two implementations exist:
//!
//! - [`HttpFetcher`] fetches over plain HTTP with `reqwest`
//! - [`BrowserFetcher`] renders the page in headless Chromium
//!
//! Each call is independent; a failure only affects the page being fetched.

mod browser;
mod http;

pub use browser::BrowserFetcher;
pub use http::{build_http_client, HttpFetcher};

use crate::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Everything captured about one page at fetch time
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// The URL that was requested
    pub url: String,
    /// The URL after redirects
    pub final_url: String,
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: BTreeMap<String, String>,
    pub html: String,
    /// Wall-clock time from request start to a usable document
    pub load_time_ms: u64,
    /// Time to first byte, when known
    pub ttfb_ms: Option<u64>,
    /// Addresses the host resolved to
    pub addresses: Vec<IpAddr>,
    pub fetched_at: DateTime<Utc>,
}

impl PageSnapshot {
    /// Returns a header value by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Retrieves a page and everything needed to audit it
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page
    ///
    /// # Returns
    ///
    /// * `Ok(PageSnapshot)` - The page was retrieved and is an HTML document
    /// * `Err(FetchError)` - Timeout, HTTP error status, network failure, or
    ///   a non-HTML response
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot, FetchError>;
}

/// Resolves the host of `url` to its IP addresses
///
/// Lookup failures and timeouts yield an empty list; DNS problems are
/// reported as signals rather than errors.
pub async fn resolve_addresses(url: &Url, timeout: Duration) -> Vec<IpAddr> {
    let Some(host) = url.host_str() else {
        return Vec::new();
    };
    let port = url.port_or_known_default().unwrap_or(80);
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();

    let lookup = tokio::time::timeout(timeout, tokio::net::lookup_host((host.as_str(), port))).await;
    match lookup {
        Ok(Ok(addrs)) => {
            let mut ips: Vec<IpAddr> = Vec::new();
            for addr in addrs {
                if !ips.contains(&addr.ip()) {
                    ips.push(addr.ip());
                }
            }
            ips
        }
        Ok(Err(e)) => {
            debug!("DNS lookup failed for {}: {}", host, e);
            Vec::new()
        }
        Err(_) => {
            debug!("DNS lookup timed out for {}", host);
            Vec::new()
        }
    }
}

/// Collects response headers into a lowercase-keyed map
pub(crate) fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        let addrs = resolve_addresses(&url, Duration::from_secs(2)).await;
        assert_eq!(addrs, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn test_collect_headers_lowercases_and_joins() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Content-Type", "text/html".parse().unwrap());
        headers.append("Set-Cookie", "a=1".parse().unwrap());
        headers.append("Set-Cookie", "b=2".parse().unwrap());

        let map = collect_headers(&headers);
        assert_eq!(map.get("content-type").map(String::as_str), Some("text/html"));
        assert_eq!(map.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }
}
