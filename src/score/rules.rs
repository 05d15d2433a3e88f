//! The rule table
//!
//! Each rule maps signals to an outcome, or to `None` when it does not apply
//! to the page (broken links that were never verified, robots.txt that was
//! never fetched). Rule ids are table positions, so appending is safe and
//! reordering is not.

use super::{AuditCheck, CheckCategory, CheckStatus, Importance};
use crate::extract::{RawSignals, HSTS_MIN_MAX_AGE};

use CheckCategory::{Content, OnPage, Performance, Technical};
use Importance::{Critical, High, Low, Medium};

const TITLE_MIN: usize = 30;
const TITLE_MAX: usize = 60;
const DESCRIPTION_MIN: usize = 70;
const DESCRIPTION_MAX: usize = 160;
const LOAD_GOOD_MS: u64 = 3_000;
const LOAD_POOR_MS: u64 = 5_000;
const PAGE_SIZE_GOOD: usize = 512 * 1024;
const PAGE_SIZE_POOR: usize = 2 * 1024 * 1024;
const REQUESTS_GOOD: usize = 50;
const REQUESTS_POOR: usize = 100;
const RENDER_BLOCKING_TOLERATED: usize = 3;
const WORDS_GOOD: usize = 300;
const WORDS_THIN: usize = 100;
const TEXT_RATIO_GOOD: f64 = 10.0;
const TEXT_RATIO_POOR: f64 = 5.0;
const INTERNAL_LINKS_GOOD: usize = 3;

/// Verdict of a single rule before it becomes an [`AuditCheck`]
struct Outcome {
    status: CheckStatus,
    issue: Option<String>,
    recommendation: Option<String>,
}

impl Outcome {
    fn pass() -> Option<Self> {
        Some(Self {
            status: CheckStatus::Pass,
            issue: None,
            recommendation: None,
        })
    }

    fn warning(issue: impl Into<String>, recommendation: &str) -> Option<Self> {
        Some(Self {
            status: CheckStatus::Warning,
            issue: Some(issue.into()),
            recommendation: Some(recommendation.to_string()),
        })
    }

    fn fail(issue: impl Into<String>, recommendation: &str) -> Option<Self> {
        Some(Self {
            status: CheckStatus::Fail,
            issue: Some(issue.into()),
            recommendation: Some(recommendation.to_string()),
        })
    }
}

struct Rule {
    name: &'static str,
    category: CheckCategory,
    importance: Importance,
    eval: fn(&RawSignals) -> Option<Outcome>,
}

const fn rule(
    name: &'static str,
    category: CheckCategory,
    importance: Importance,
    eval: fn(&RawSignals) -> Option<Outcome>,
) -> Rule {
    Rule {
        name,
        category,
        importance,
        eval,
    }
}

const RULES: &[Rule] = &[
    // Technical
    rule("HTTPS", Technical, Critical, https),
    rule("HTTP Status", Technical, Critical, http_status),
    rule("HSTS Header", Technical, High, hsts),
    rule("Security Headers", Technical, Medium, security_headers),
    rule("Mixed Content", Technical, High, mixed_content),
    rule("Canonical URL", Technical, High, canonical),
    rule("Robots Meta", Technical, High, robots_meta),
    rule("Robots.txt", Technical, Medium, robots_txt),
    rule("Mobile Viewport", Technical, High, viewport),
    rule("DNS Resolution", Technical, Medium, dns),
    // On-Page
    rule("Title Tag", OnPage, Critical, title),
    rule("Meta Description", OnPage, High, description),
    rule("H1 Heading", OnPage, High, h1),
    rule("Heading Structure", OnPage, Medium, heading_structure),
    rule("Open Graph Tags", OnPage, Medium, open_graph),
    rule("Twitter Card", OnPage, Low, twitter_card),
    rule("Structured Data", OnPage, Medium, structured_data),
    rule("Duplicate Tags", OnPage, Medium, duplicate_tags),
    rule("Language Attribute", OnPage, Low, language),
    // Performance
    rule("Page Load Time", Performance, High, load_time),
    rule("Page Size", Performance, Medium, page_size),
    rule("Render-Blocking Resources", Performance, Medium, render_blocking),
    rule("Request Count", Performance, Low, request_count),
    // Content
    rule("Word Count", Content, High, word_count),
    rule("Text-to-HTML Ratio", Content, Low, text_ratio),
    rule("Image Alt Text", Content, High, image_alt),
    rule("Internal Links", Content, Medium, internal_links),
    rule("Broken Links", Content, High, broken_links),
];

/// Number of rules in the table
pub const RULE_COUNT: usize = RULES.len();

/// Rule names in declaration order
pub fn rule_names() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|r| r.name)
}

/// Applies every rule in declaration order
pub(super) fn evaluate(signals: &RawSignals) -> Vec<AuditCheck> {
    RULES
        .iter()
        .enumerate()
        .filter_map(|(index, rule)| {
            let outcome = (rule.eval)(signals)?;
            Some(AuditCheck {
                id: index as u32 + 1,
                name: rule.name.to_string(),
                category: rule.category,
                status: outcome.status,
                importance: rule.importance,
                score: outcome.status.score(),
                issue: outcome.issue,
                recommendation: outcome.recommendation,
            })
        })
        .collect()
}

// Technical

fn https(s: &RawSignals) -> Option<Outcome> {
    if s.security.https {
        Outcome::pass()
    } else {
        Outcome::fail(
            "Page is not served over HTTPS",
            "Serve every page over HTTPS and redirect HTTP requests to it",
        )
    }
}

fn http_status(s: &RawSignals) -> Option<Outcome> {
    match s.status_code {
        200..=299 => Outcome::pass(),
        300..=399 => Outcome::warning(
            format!("Page responded with redirect status {}", s.status_code),
            "Link directly to the final URL to avoid redirect hops",
        ),
        code => Outcome::fail(
            format!("Page responded with status {}", code),
            "Make sure the page returns a 2xx status",
        ),
    }
}

fn hsts(s: &RawSignals) -> Option<Outcome> {
    match (&s.security.hsts, s.security.hsts_max_age) {
        (Some(_), Some(age)) if age >= HSTS_MIN_MAX_AGE => Outcome::pass(),
        (Some(_), _) => Outcome::warning(
            "HSTS max-age is shorter than one year",
            "Set Strict-Transport-Security max-age to at least 31536000",
        ),
        (None, _) => Outcome::fail(
            "Strict-Transport-Security header is missing",
            "Send a Strict-Transport-Security header on HTTPS responses",
        ),
    }
}

fn security_headers(s: &RawSignals) -> Option<Outcome> {
    let sec = &s.security;
    let present = [
        sec.content_security_policy,
        sec.x_frame_options.is_some(),
        sec.nosniff,
        sec.referrer_policy.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();

    match present {
        3.. => Outcome::pass(),
        1..=2 => Outcome::warning(
            format!("Only {} of 4 recommended security headers are set", present),
            "Add Content-Security-Policy, X-Frame-Options, X-Content-Type-Options and Referrer-Policy",
        ),
        _ => Outcome::fail(
            "No recommended security headers are set",
            "Add Content-Security-Policy, X-Frame-Options, X-Content-Type-Options and Referrer-Policy",
        ),
    }
}

fn mixed_content(s: &RawSignals) -> Option<Outcome> {
    match s.security.mixed_content.len() {
        0 => Outcome::pass(),
        n => Outcome::fail(
            format!("{} resource(s) loaded over insecure HTTP", n),
            "Load every subresource over HTTPS",
        ),
    }
}

fn canonical(s: &RawSignals) -> Option<Outcome> {
    if s.meta.canonical.is_some() {
        Outcome::pass()
    } else {
        Outcome::fail(
            "Canonical link is missing",
            "Add a <link rel=\"canonical\"> pointing at the preferred URL",
        )
    }
}

fn robots_meta(s: &RawSignals) -> Option<Outcome> {
    if s.meta.noindex {
        Outcome::fail(
            "Page is marked noindex",
            "Remove noindex if the page should appear in search results",
        )
    } else if s.meta.nofollow {
        Outcome::warning(
            "Page is marked nofollow",
            "Remove nofollow unless outbound links should not pass authority",
        )
    } else {
        Outcome::pass()
    }
}

fn robots_txt(s: &RawSignals) -> Option<Outcome> {
    let crawl = s.crawlability.as_ref()?;
    if crawl.robots_txt {
        Outcome::pass()
    } else {
        Outcome::warning(
            "robots.txt is missing",
            "Publish a robots.txt that lists your sitemap",
        )
    }
}

fn viewport(s: &RawSignals) -> Option<Outcome> {
    match (&s.mobile.viewport, s.mobile.device_width) {
        (Some(_), true) => Outcome::pass(),
        (Some(_), false) => Outcome::warning(
            "Viewport does not use width=device-width",
            "Use <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
        ),
        (None, _) => Outcome::fail(
            "Viewport meta tag is missing",
            "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
        ),
    }
}

fn dns(s: &RawSignals) -> Option<Outcome> {
    if s.dns.addresses.is_empty() {
        Outcome::warning(
            "Host addresses could not be resolved",
            "Check the domain's A/AAAA records",
        )
    } else {
        Outcome::pass()
    }
}

// On-Page

fn title(s: &RawSignals) -> Option<Outcome> {
    let len = s.meta.title_length;
    match &s.meta.title {
        None => Outcome::fail("Title tag is missing", "Add a unique, descriptive <title>"),
        Some(_) if (TITLE_MIN..=TITLE_MAX).contains(&len) => Outcome::pass(),
        Some(_) => Outcome::warning(
            format!("Title is {} characters", len),
            "Keep titles between 30 and 60 characters",
        ),
    }
}

fn description(s: &RawSignals) -> Option<Outcome> {
    let len = s.meta.description_length;
    match &s.meta.description {
        None => Outcome::fail(
            "Meta description is missing",
            "Add a meta description summarizing the page",
        ),
        Some(_) if (DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) => Outcome::pass(),
        Some(_) => Outcome::warning(
            format!("Meta description is {} characters", len),
            "Keep meta descriptions between 70 and 160 characters",
        ),
    }
}

fn h1(s: &RawSignals) -> Option<Outcome> {
    match s.headings.h1.len() {
        1 => Outcome::pass(),
        0 => Outcome::fail("H1 heading is missing", "Add a single H1 describing the page"),
        n => Outcome::warning(
            format!("Page has {} H1 headings", n),
            "Use a single H1 per page",
        ),
    }
}

fn heading_structure(s: &RawSignals) -> Option<Outcome> {
    if s.headings.outline.is_empty() {
        Outcome::fail(
            "Page has no headings",
            "Structure content with H1-H6 headings",
        )
    } else if s.headings.skipped_levels {
        Outcome::warning(
            "Heading levels are skipped",
            "Nest headings without skipping levels",
        )
    } else {
        Outcome::pass()
    }
}

fn open_graph(s: &RawSignals) -> Option<Outcome> {
    let og = &s.meta.open_graph;
    let core = ["og:title", "og:description", "og:image"]
        .iter()
        .filter(|k| og.contains_key(**k))
        .count();
    match core {
        3 => Outcome::pass(),
        0 => Outcome::fail(
            "Open Graph tags are missing",
            "Add og:title, og:description and og:image",
        ),
        _ => Outcome::warning(
            "Open Graph tags are incomplete",
            "Add og:title, og:description and og:image",
        ),
    }
}

fn twitter_card(s: &RawSignals) -> Option<Outcome> {
    if s.meta.twitter.contains_key("twitter:card") {
        Outcome::pass()
    } else {
        Outcome::warning(
            "Twitter Card tags are missing",
            "Add a twitter:card meta tag",
        )
    }
}

fn structured_data(s: &RawSignals) -> Option<Outcome> {
    if s.meta.invalid_structured_data > 0 {
        Outcome::fail(
            format!(
                "{} structured data block(s) are invalid JSON",
                s.meta.invalid_structured_data
            ),
            "Fix the JSON-LD syntax",
        )
    } else if s.meta.structured_data_blocks == 0 {
        Outcome::warning(
            "No structured data found",
            "Describe the page with schema.org JSON-LD",
        )
    } else {
        Outcome::pass()
    }
}

fn duplicate_tags(s: &RawSignals) -> Option<Outcome> {
    if s.duplicates.has_duplicates() {
        Outcome::warning(
            "Page repeats tags that should appear once",
            "Keep a single title, meta description, canonical and H1",
        )
    } else {
        Outcome::pass()
    }
}

fn language(s: &RawSignals) -> Option<Outcome> {
    if s.meta.lang.is_some() {
        Outcome::pass()
    } else {
        Outcome::warning(
            "<html> has no lang attribute",
            "Declare the page language with <html lang>",
        )
    }
}

// Performance

fn load_time(s: &RawSignals) -> Option<Outcome> {
    let ms = s.performance.load_time_ms;
    if ms < LOAD_GOOD_MS {
        Outcome::pass()
    } else if ms < LOAD_POOR_MS {
        Outcome::warning(
            format!("Page took {} ms to load", ms),
            "Reduce server response time and page weight",
        )
    } else {
        Outcome::fail(
            format!("Page took {} ms to load", ms),
            "Reduce server response time and page weight",
        )
    }
}

fn page_size(s: &RawSignals) -> Option<Outcome> {
    let bytes = s.performance.html_bytes;
    if bytes <= PAGE_SIZE_GOOD {
        Outcome::pass()
    } else if bytes <= PAGE_SIZE_POOR {
        Outcome::warning(
            format!("HTML is {} KiB", bytes / 1024),
            "Trim inline scripts, styles and markup",
        )
    } else {
        Outcome::fail(
            format!("HTML is {} KiB", bytes / 1024),
            "Trim inline scripts, styles and markup",
        )
    }
}

fn render_blocking(s: &RawSignals) -> Option<Outcome> {
    match s.performance.render_blocking() {
        0 => Outcome::pass(),
        n if n <= RENDER_BLOCKING_TOLERATED => Outcome::warning(
            format!("{} render-blocking resource(s)", n),
            "Defer scripts and load non-critical CSS asynchronously",
        ),
        n => Outcome::fail(
            format!("{} render-blocking resources", n),
            "Defer scripts and load non-critical CSS asynchronously",
        ),
    }
}

fn request_count(s: &RawSignals) -> Option<Outcome> {
    let n = s.performance.requests;
    if n <= REQUESTS_GOOD {
        Outcome::pass()
    } else if n <= REQUESTS_POOR {
        Outcome::warning(
            format!("Page declares {} subresource requests", n),
            "Bundle or drop unneeded resources",
        )
    } else {
        Outcome::fail(
            format!("Page declares {} subresource requests", n),
            "Bundle or drop unneeded resources",
        )
    }
}

// Content

fn word_count(s: &RawSignals) -> Option<Outcome> {
    let words = s.content.word_count;
    if words >= WORDS_GOOD {
        Outcome::pass()
    } else if words >= WORDS_THIN {
        Outcome::warning(
            format!("Page has {} words", words),
            "Expand the content to at least 300 words",
        )
    } else {
        Outcome::fail(
            format!("Thin content: {} words", words),
            "Expand the content to at least 300 words",
        )
    }
}

fn text_ratio(s: &RawSignals) -> Option<Outcome> {
    let ratio = s.content.text_html_ratio;
    if ratio >= TEXT_RATIO_GOOD {
        Outcome::pass()
    } else if ratio >= TEXT_RATIO_POOR {
        Outcome::warning(
            format!("Text-to-HTML ratio is {:.1}%", ratio),
            "Increase visible text relative to markup",
        )
    } else {
        Outcome::fail(
            format!("Text-to-HTML ratio is {:.1}%", ratio),
            "Increase visible text relative to markup",
        )
    }
}

fn image_alt(s: &RawSignals) -> Option<Outcome> {
    let images = &s.images;
    if images.total == 0 || images.missing_alt == 0 {
        return Outcome::pass();
    }
    let issue = format!(
        "{} of {} images lack alt text",
        images.missing_alt, images.total
    );
    // Up to a fifth of images may be decorative
    if images.missing_alt * 5 <= images.total {
        Outcome::warning(issue, "Describe every meaningful image with alt text")
    } else {
        Outcome::fail(issue, "Describe every meaningful image with alt text")
    }
}

fn internal_links(s: &RawSignals) -> Option<Outcome> {
    match s.links.internal.len() {
        n if n >= INTERNAL_LINKS_GOOD => Outcome::pass(),
        0 => Outcome::fail(
            "Page has no internal links",
            "Link to related pages on the same site",
        ),
        n => Outcome::warning(
            format!("Page has only {} internal link(s)", n),
            "Link to related pages on the same site",
        ),
    }
}

fn broken_links(s: &RawSignals) -> Option<Outcome> {
    if !s.links.verified {
        return None;
    }
    match s.links.broken.len() {
        0 => Outcome::pass(),
        n => Outcome::fail(
            format!("{} broken link(s)", n),
            "Fix or remove links that return errors",
        ),
    }
}
