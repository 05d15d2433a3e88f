//! Typed signal records produced by the extractor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything measured about one page, grouped by concern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignals {
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub meta: MetaSignals,
    pub headings: HeadingSignals,
    pub links: LinkSignals,
    pub images: ImageSignals,
    pub duplicates: DuplicateSignals,
    pub security: SecuritySignals,
    pub mobile: MobileSignals,
    pub dns: DnsSignals,
    pub performance: PerformanceSignals,
    pub content: ContentSignals,
    /// Site-level robots.txt data; absent when it was not looked up
    pub crawlability: Option<CrawlabilitySignals>,
}

/// `<head>` metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSignals {
    pub title: Option<String>,
    pub title_length: usize,
    pub description: Option<String>,
    pub description_length: usize,
    pub canonical: Option<String>,
    pub robots: Option<String>,
    pub noindex: bool,
    pub nofollow: bool,
    pub lang: Option<String>,
    pub charset: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter: BTreeMap<String, String>,
    /// `@type` values found in JSON-LD blocks
    pub structured_data_types: Vec<String>,
    pub structured_data_blocks: usize,
    pub invalid_structured_data: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingSignals {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    /// Heading levels in document order
    pub outline: Vec<u8>,
    pub empty: usize,
    /// A heading jumps more than one level below its predecessor
    pub skipped_levels: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSignals {
    /// Same-site links, normalized, in document order
    pub internal: Vec<String>,
    pub external: Vec<String>,
    /// Links that answered 4xx/5xx or not at all; only meaningful when `verified`
    pub broken: Vec<String>,
    pub verified: bool,
    pub nofollow: usize,
    pub empty_anchor_text: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSignals {
    pub total: usize,
    pub missing_alt: usize,
    pub missing_dimensions: usize,
    pub lazy_loaded: usize,
    /// Sources of images without alt text (first few only)
    pub missing_alt_sources: Vec<String>,
}

/// Same-page repetition of tags that should appear once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSignals {
    pub title_tags: usize,
    pub meta_descriptions: usize,
    pub canonical_tags: usize,
    /// H1 texts that occur more than once
    pub repeated_h1: Vec<String>,
}

impl DuplicateSignals {
    pub fn has_duplicates(&self) -> bool {
        self.title_tags > 1
            || self.meta_descriptions > 1
            || self.canonical_tags > 1
            || !self.repeated_h1.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySignals {
    pub https: bool,
    pub hsts: Option<String>,
    pub hsts_max_age: Option<u64>,
    pub content_security_policy: bool,
    pub x_frame_options: Option<String>,
    /// `X-Content-Type-Options: nosniff`
    pub nosniff: bool,
    pub referrer_policy: Option<String>,
    pub permissions_policy: bool,
    /// Subresources loaded over plain HTTP from an HTTPS page
    pub mixed_content: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileSignals {
    pub viewport: Option<String>,
    pub device_width: bool,
    pub initial_scale: bool,
    pub touch_icon: bool,
}

impl MobileSignals {
    /// Viewport declares `width=device-width` and an initial scale
    pub fn is_responsive(&self) -> bool {
        self.device_width && self.initial_scale
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSignals {
    pub addresses: Vec<String>,
    pub ipv6: bool,
    pub load_balanced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSignals {
    pub load_time_ms: u64,
    pub ttfb_ms: Option<u64>,
    pub html_bytes: usize,
    pub scripts: usize,
    pub stylesheets: usize,
    pub images: usize,
    pub iframes: usize,
    /// Subresource requests the document declares
    pub requests: usize,
    pub render_blocking_scripts: usize,
    pub render_blocking_styles: usize,
}

impl PerformanceSignals {
    pub fn render_blocking(&self) -> usize {
        self.render_blocking_scripts + self.render_blocking_styles
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSignals {
    pub word_count: usize,
    pub paragraphs: usize,
    /// Visible text as a percentage of the HTML size
    pub text_html_ratio: f64,
}

/// Site-level robots.txt findings, shared by every page of a crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlabilitySignals {
    pub robots_txt: bool,
    pub sitemaps: Vec<String>,
    pub disallowed_paths: Vec<String>,
    pub crawl_delay: Option<f64>,
}
