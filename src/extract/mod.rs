//! Signal extraction
//!
//! The [`SignalExtractor`] turns a [`PageSnapshot`] into [`RawSignals`]. It is
//! a pure function of its input: the same snapshot always yields the same
//! signals, and no network access happens here. Broken-link verification,
//! which does need the network, lives in [`LinkVerifier`] and runs afterwards.

mod dom;
mod signals;
mod verify;

pub use dom::resolve_link;
pub use signals::{
    ContentSignals, CrawlabilitySignals, DnsSignals, DuplicateSignals, HeadingSignals,
    ImageSignals, LinkSignals, MetaSignals, MobileSignals, PerformanceSignals, RawSignals,
    SecuritySignals,
};
pub use verify::LinkVerifier;

use crate::fetcher::PageSnapshot;
use crate::robots::{SiteRobots, ROBOTS_AGENT};
use crate::url::SiteScope;
use scraper::Html;
use tracing::warn;
use url::Url;

/// HSTS `max-age` considered long enough (one year)
pub const HSTS_MIN_MAX_AGE: u64 = 31_536_000;

/// Extracts signals from page snapshots for one site
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    scope: SiteScope,
    crawlability: Option<CrawlabilitySignals>,
}

impl SignalExtractor {
    pub fn new(scope: SiteScope) -> Self {
        Self {
            scope,
            crawlability: None,
        }
    }

    /// Attaches site-level robots.txt findings to every extracted page
    pub fn with_robots(mut self, robots: &SiteRobots) -> Self {
        self.crawlability = Some(crawlability(robots));
        self
    }

    pub fn scope(&self) -> &SiteScope {
        &self.scope
    }

    /// Extracts every signal group from `snapshot`
    ///
    /// Malformed fragments (bad JSON-LD, odd attributes) degrade to empty
    /// values; this never fails.
    pub fn extract(&self, snapshot: &PageSnapshot) -> RawSignals {
        let base = match Url::parse(&snapshot.final_url).or_else(|_| Url::parse(&snapshot.url)) {
            Ok(base) => base,
            Err(e) => {
                warn!("Cannot resolve links for {}: {}", snapshot.url, e);
                return RawSignals {
                    url: snapshot.url.clone(),
                    final_url: snapshot.final_url.clone(),
                    status_code: snapshot.status,
                    crawlability: self.crawlability.clone(),
                    ..RawSignals::default()
                };
            }
        };
        let document = Html::parse_document(&snapshot.html);
        let html_bytes = snapshot.html.len();

        let headings = dom::headings(&document);
        let duplicates = dom::duplicates(&document, &headings);

        let mut performance = dom::resources(&document, html_bytes);
        performance.load_time_ms = snapshot.load_time_ms;
        performance.ttfb_ms = snapshot.ttfb_ms;

        let mut security = security(snapshot, &base);
        if security.https {
            security.mixed_content = dom::insecure_resources(&document);
        }

        RawSignals {
            url: snapshot.url.clone(),
            final_url: snapshot.final_url.clone(),
            status_code: snapshot.status,
            meta: dom::meta(&document, &base),
            links: dom::links(&document, &base, &self.scope),
            images: dom::images(&document),
            mobile: dom::mobile(&document),
            content: dom::content(&document, html_bytes),
            dns: dns(snapshot),
            crawlability: self.crawlability.clone(),
            headings,
            duplicates,
            performance,
            security,
        }
    }
}

/// Reads security headers from the response
fn security(snapshot: &PageSnapshot, base: &Url) -> SecuritySignals {
    let hsts = snapshot.header("strict-transport-security").map(str::to_string);
    let hsts_max_age = hsts.as_deref().and_then(parse_max_age);

    SecuritySignals {
        https: base.scheme() == "https",
        hsts,
        hsts_max_age,
        content_security_policy: snapshot.header("content-security-policy").is_some(),
        x_frame_options: snapshot.header("x-frame-options").map(str::to_string),
        nosniff: snapshot
            .header("x-content-type-options")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("nosniff")),
        referrer_policy: snapshot.header("referrer-policy").map(str::to_string),
        permissions_policy: snapshot.header("permissions-policy").is_some(),
        mixed_content: Vec::new(),
    }
}

/// Parses `max-age=N` out of a Strict-Transport-Security value
fn parse_max_age(value: &str) -> Option<u64> {
    value.split(';').find_map(|directive| {
        let (key, val) = directive.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("max-age") {
            val.trim().trim_matches('"').parse().ok()
        } else {
            None
        }
    })
}

fn dns(snapshot: &PageSnapshot) -> DnsSignals {
    let v4 = snapshot.addresses.iter().filter(|a| a.is_ipv4()).count();
    DnsSignals {
        addresses: snapshot.addresses.iter().map(|a| a.to_string()).collect(),
        ipv6: snapshot.addresses.iter().any(|a| a.is_ipv6()),
        load_balanced: v4 > 1,
    }
}

fn crawlability(robots: &SiteRobots) -> CrawlabilitySignals {
    CrawlabilitySignals {
        robots_txt: robots.present,
        sitemaps: robots.policy.sitemaps().to_vec(),
        disallowed_paths: robots.policy.disallowed_paths(ROBOTS_AGENT),
        crawl_delay: robots.policy.crawl_delay(ROBOTS_AGENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::RobotsPolicy;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot(url: &str, html: &str, headers: &[(&str, &str)]) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            html: html.to_string(),
            load_time_ms: 420,
            ttfb_ms: Some(80),
            addresses: vec!["93.184.216.34".parse().unwrap(), "2606:2800::1".parse().unwrap()],
            fetched_at: Utc::now(),
        }
    }

    fn extractor(seed: &str) -> SignalExtractor {
        SignalExtractor::new(SiteScope::from_seed(&Url::parse(seed).unwrap(), false).unwrap())
    }

    const PAGE: &str = r#"<!doctype html><html lang="en"><head>
        <title>Example Domain for Testing Purposes Here</title>
        <meta name="viewport" content="width=device-width, initial-scale=1">
        <img src="http://insecure.example.com/x.png">
        </head><body><h1>Example</h1><p>Some words here.</p>
        <a href="/about">About</a><a href="https://other.org/">Out</a></body></html>"#;

    #[test]
    fn test_extract_is_deterministic() {
        let snap = snapshot("https://example.com/", PAGE, &[]);
        let extractor = extractor("https://example.com/");
        assert_eq!(extractor.extract(&snap), extractor.extract(&snap));
    }

    #[test]
    fn test_extract_populates_groups() {
        let snap = snapshot(
            "https://example.com/",
            PAGE,
            &[
                ("Strict-Transport-Security", "max-age=63072000; includeSubDomains"),
                ("X-Content-Type-Options", "nosniff"),
                ("Content-Security-Policy", "default-src 'self'"),
            ],
        );
        let signals = extractor("https://example.com/").extract(&snap);

        assert_eq!(signals.status_code, 200);
        assert!(signals.security.https);
        assert_eq!(signals.security.hsts_max_age, Some(63_072_000));
        assert!(signals.security.nosniff);
        assert!(signals.security.content_security_policy);
        assert_eq!(signals.security.mixed_content.len(), 1);
        assert_eq!(signals.links.internal, vec!["https://example.com/about".to_string()]);
        assert_eq!(signals.links.external, vec!["https://other.org/".to_string()]);
        assert!(signals.mobile.is_responsive());
        assert_eq!(signals.performance.load_time_ms, 420);
        assert_eq!(signals.dns.addresses.len(), 2);
        assert!(signals.dns.ipv6);
        assert!(!signals.dns.load_balanced);
        assert!(signals.crawlability.is_none());
    }

    #[test]
    fn test_http_page_has_no_mixed_content() {
        let snap = snapshot("http://example.com/", PAGE, &[]);
        let signals = extractor("http://example.com/").extract(&snap);
        assert!(!signals.security.https);
        assert!(signals.security.mixed_content.is_empty());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let snap = snapshot("https://example.com/", "", &[]);
        let signals = extractor("https://example.com/").extract(&snap);
        assert!(signals.meta.title.is_none());
        assert_eq!(signals.content.word_count, 0);
        assert_eq!(signals.content.text_html_ratio, 0.0);
        assert!(signals.headings.h1.is_empty());
    }

    #[test]
    fn test_robots_attached_as_crawlability() {
        let robots = SiteRobots {
            present: true,
            policy: RobotsPolicy::from_content(
                "User-agent: *\nDisallow: /private\nSitemap: https://example.com/sitemap.xml\n",
            ),
        };
        let snap = snapshot("https://example.com/", PAGE, &[]);
        let signals = extractor("https://example.com/").with_robots(&robots).extract(&snap);

        let crawl = signals.crawlability.unwrap();
        assert!(crawl.robots_txt);
        assert_eq!(crawl.sitemaps, vec!["https://example.com/sitemap.xml".to_string()]);
        assert_eq!(crawl.disallowed_paths, vec!["/private".to_string()]);
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=31536000"), Some(31_536_000));
        assert_eq!(parse_max_age("includeSubDomains; max-age=\"300\""), Some(300));
        assert_eq!(parse_max_age("preload"), None);
    }
}
