//! Robots.txt handling module
//!
//! robots.txt is fetched once per crawl. It decides which interior links may
//! be enqueued and feeds the site-level crawlability signals.

mod parser;

pub use parser::RobotsPolicy;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Product token matched against robots.txt `User-agent` lines
pub const ROBOTS_AGENT: &str = "SumiLens";

/// robots.txt as seen for one site
#[derive(Debug, Clone, Default)]
pub struct SiteRobots {
    /// Whether the site served a robots.txt at all
    pub present: bool,
    pub policy: RobotsPolicy,
}

impl SiteRobots {
    /// Checks if a URL may be crawled
    pub fn is_allowed(&self, url: &Url) -> bool {
        self.policy.is_allowed(url.as_str(), ROBOTS_AGENT)
    }
}

/// Fetches robots.txt for the site that `seed` belongs to
///
/// A missing or unreadable robots.txt is not an error: the site is treated as
/// allowing everything and `present` is false.
///
/// # Arguments
///
/// * `client` - The HTTP client used for the crawl
/// * `seed` - Any URL on the site
pub async fn fetch_robots(client: &Client, seed: &Url) -> SiteRobots {
    let robots_url = match seed.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build robots.txt URL for {}: {}", seed, e);
            return SiteRobots::default();
        }
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("robots.txt fetch failed for {}: {}", robots_url, e);
            return SiteRobots::default();
        }
    };

    if !response.status().is_success() {
        debug!("No robots.txt at {} (HTTP {})", robots_url, response.status());
        return SiteRobots::default();
    }

    match response.text().await {
        Ok(body) => SiteRobots {
            present: true,
            policy: RobotsPolicy::from_content(&body),
        },
        Err(e) => {
            warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
            SiteRobots::default()
        }
    }
}
