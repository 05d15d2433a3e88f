//! Deferred broken-link verification
//!
//! Extraction only records links. Checking them costs one request each, so it
//! runs afterwards, in bounded parallel batches, with a per-page cap and a
//! per-crawl cache so a link shared by every page is checked once.

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Parallel link checks per page
const CHECK_CONCURRENCY: usize = 8;

/// Checks links for 4xx/5xx responses
#[derive(Clone)]
pub struct LinkVerifier {
    client: Client,
    timeout: Duration,
    max_checks: usize,
    cache: Arc<Mutex<HashMap<String, bool>>>,
}

impl LinkVerifier {
    /// # Arguments
    ///
    /// * `client` - HTTP client used for HEAD/GET link checks
    /// * `timeout` - Per-link timeout
    /// * `max_checks` - Unique links checked per page
    pub fn new(client: Client, timeout: Duration, max_checks: usize) -> Self {
        Self {
            client,
            timeout,
            max_checks,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the subset of `links` that are broken, in input order
    ///
    /// Only the first `max_checks` links are examined.
    pub async fn broken_links(&self, links: &[String]) -> Vec<String> {
        let candidates: Vec<&String> = links.iter().take(self.max_checks).collect();

        let owned: Vec<String> = candidates.iter().map(|link| (*link).clone()).collect();
        let results: HashMap<String, bool> = stream::iter(owned.into_iter().map(|link| async move {
            let broken = self.is_broken(&link).await;
            (link, broken)
        }))
        .buffer_unordered(CHECK_CONCURRENCY)
        .collect()
        .await;

        candidates
            .into_iter()
            .filter(|link| results.get(link.as_str()).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    async fn is_broken(&self, link: &str) -> bool {
        if let Some(cached) = self.cache.lock().await.get(link).copied() {
            return cached;
        }

        let broken = self.check_link(link).await;
        self.cache.lock().await.insert(link.to_string(), broken);
        broken
    }

    async fn check_link(&self, link: &str) -> bool {
        let head = self.client.head(link).timeout(self.timeout).send().await;
        let status = match head {
            Ok(response)
                if response.status() == StatusCode::METHOD_NOT_ALLOWED
                    || response.status() == StatusCode::NOT_IMPLEMENTED =>
            {
                match self.client.get(link).timeout(self.timeout).send().await {
                    Ok(response) => response.status(),
                    Err(e) => {
                        debug!("Link check failed for {}: {}", link, e);
                        return true;
                    }
                }
            }
            Ok(response) => response.status(),
            Err(e) => {
                debug!("Link check failed for {}: {}", link, e);
                return true;
            }
        };

        status.is_client_error() || status.is_server_error()
    }
}
