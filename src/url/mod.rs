//! URL handling module for Sumi-Lens
//!
//! This module provides URL normalization for the crawl's visited-set,
//! domain extraction, and the internal/external decision for discovered links.

mod domain;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_non_html_target, site_host};
pub use normalize::{normalize_relative, normalize_url};

/// The set of hosts that count as "this site" for a crawl
///
/// The seed's host (without `www.`) is always internal. When subdomains are
/// included, the scope behaves like the wildcard pattern `*.host` and also
/// accepts `blog.host`, `api.v2.host`, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    host: String,
    include_subdomains: bool,
}

impl SiteScope {
    /// Builds the scope from a seed URL
    ///
    /// # Returns
    ///
    /// * `None` - If the seed has no host
    pub fn from_seed(seed: &Url, include_subdomains: bool) -> Option<Self> {
        let host = extract_domain(seed)?;
        Some(Self {
            host: site_host(&host).to_string(),
            include_subdomains,
        })
    }

    /// The site's host without any `www.` prefix
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `url` belongs to this site
    pub fn contains(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.contains_host(&host.to_lowercase()),
            None => false,
        }
    }

    /// Returns true if `host` (lowercase) belongs to this site
    pub fn contains_host(&self, host: &str) -> bool {
        let candidate = site_host(host);
        if candidate == self.host {
            return true;
        }
        self.include_subdomains
            && candidate.len() > self.host.len()
            && candidate.ends_with(&self.host)
            && candidate.as_bytes()[candidate.len() - self.host.len() - 1] == b'.'
    }
}
