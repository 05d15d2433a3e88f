//! DOM-level extraction
//!
//! Every function here takes a parsed document and returns one signal group.
//! Selectors that fail to parse yield an empty group rather than an error.

use super::signals::{
    ContentSignals, DuplicateSignals, HeadingSignals, ImageSignals, LinkSignals, MetaSignals,
    MobileSignals, PerformanceSignals,
};
use crate::url::{normalize_relative, SiteScope};
use crate::ExtractionError;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use url::Url;

/// Missing-alt image sources kept for reporting
const MAX_REPORTED_IMAGES: usize = 10;

/// Elements whose text is not visible content
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Selects all elements matching `css`
fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(e) => {
            debug!("{}", e);
            Vec::new()
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector(format!("{css}: {e:?}")))
}

fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn attr<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

/// Extracts `<head>` metadata
pub fn meta(document: &Html, base: &Url) -> MetaSignals {
    let mut signals = MetaSignals::default();

    if let Some(title) = select(document, "title").first() {
        let text = text_of(title);
        if !text.is_empty() {
            signals.title_length = text.chars().count();
            signals.title = Some(text);
        }
    }

    if let Some(description) = select(document, "meta[name='description']")
        .first()
        .and_then(|e| attr(e, "content"))
    {
        signals.description_length = description.chars().count();
        signals.description = Some(description.to_string());
    }

    signals.canonical = select(document, "link[rel='canonical'][href]")
        .first()
        .and_then(|e| attr(e, "href"))
        .map(|href| {
            base.join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string())
        });

    if let Some(robots) = select(document, "meta[name='robots']")
        .first()
        .and_then(|e| attr(e, "content"))
    {
        let lower = robots.to_ascii_lowercase();
        signals.noindex = lower.contains("noindex") || lower.contains("none");
        signals.nofollow = lower.contains("nofollow") || lower.contains("none");
        signals.robots = Some(robots.to_string());
    }

    signals.lang = select(document, "html[lang]")
        .first()
        .and_then(|e| attr(e, "lang"))
        .map(str::to_string);

    signals.charset = select(document, "meta[charset]")
        .first()
        .and_then(|e| attr(e, "charset"))
        .map(str::to_string);

    signals.open_graph = collect_meta_map(document, "meta[property^='og:']", "property");
    signals.twitter = collect_meta_map(document, "meta[name^='twitter:']", "name");

    for block in select(document, "script[type='application/ld+json']") {
        let raw = block.text().collect::<String>();
        match parse_json_ld(&raw) {
            Ok(value) => {
                signals.structured_data_blocks += 1;
                collect_ld_types(&value, &mut signals.structured_data_types);
            }
            Err(e) => {
                debug!("Skipping structured data block: {}", e);
                signals.invalid_structured_data += 1;
            }
        }
    }

    signals
}

fn collect_meta_map(document: &Html, css: &str, key_attr: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for element in select(document, css) {
        if let (Some(key), Some(content)) = (attr(&element, key_attr), attr(&element, "content")) {
            map.entry(key.to_ascii_lowercase())
                .or_insert_with(|| content.to_string());
        }
    }
    map
}

fn parse_json_ld(raw: &str) -> Result<serde_json::Value, ExtractionError> {
    Ok(serde_json::from_str(raw.trim())?)
}

fn collect_ld_types(value: &serde_json::Value, types: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_ld_types(item, types);
            }
        }
        serde_json::Value::Object(object) => {
            match object.get("@type") {
                Some(serde_json::Value::String(t)) => push_unique(types, t),
                Some(serde_json::Value::Array(ts)) => {
                    for t in ts.iter().filter_map(|t| t.as_str()) {
                        push_unique(types, t);
                    }
                }
                _ => {}
            }
            if let Some(graph) = object.get("@graph") {
                collect_ld_types(graph, types);
            }
        }
        _ => {}
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Extracts the heading outline
pub fn headings(document: &Html) -> HeadingSignals {
    let mut signals = HeadingSignals::default();
    let mut previous: u8 = 0;

    for heading in select(document, "h1, h2, h3, h4, h5, h6") {
        let level = heading.value().name()[1..].parse::<u8>().unwrap_or(6);
        let text = text_of(&heading);

        if text.is_empty() {
            signals.empty += 1;
        }
        match level {
            1 => signals.h1.push(text),
            2 => signals.h2.push(text),
            _ => {}
        }

        if previous > 0 && level > previous + 1 {
            signals.skipped_levels = true;
        }
        previous = level;
        signals.outline.push(level);
    }

    signals
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - same-document fragments (`#section`)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    normalize_relative(base, href).ok()
}

/// Extracts and classifies outbound links
pub fn links(document: &Html, base: &Url, scope: &SiteScope) -> LinkSignals {
    let mut signals = LinkSignals::default();
    let mut seen: HashSet<String> = HashSet::new();
    let labelled_image = parse_selector("img[alt]").ok();

    for anchor in select(document, "a[href]") {
        let rel = attr(&anchor, "rel").unwrap_or_default().to_ascii_lowercase();
        if rel.split_whitespace().any(|r| r == "nofollow") {
            signals.nofollow += 1;
        }

        let has_label = attr(&anchor, "aria-label").is_some()
            || labelled_image
                .as_ref()
                .is_some_and(|sel| anchor.select(sel).next().is_some());
        if text_of(&anchor).is_empty() && !has_label {
            signals.empty_anchor_text += 1;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base) else {
            continue;
        };
        let key = url.to_string();
        if !seen.insert(key.clone()) {
            continue;
        }

        if scope.contains(&url) {
            signals.internal.push(key);
        } else {
            signals.external.push(key);
        }
    }

    signals
}

/// Extracts image accessibility and loading signals
pub fn images(document: &Html) -> ImageSignals {
    let mut signals = ImageSignals::default();

    for image in select(document, "img") {
        signals.total += 1;

        let alt_missing = image
            .value()
            .attr("alt")
            .map_or(true, |alt| alt.trim().is_empty());
        if alt_missing {
            signals.missing_alt += 1;
            if signals.missing_alt_sources.len() < MAX_REPORTED_IMAGES {
                if let Some(src) = attr(&image, "src") {
                    signals.missing_alt_sources.push(src.to_string());
                }
            }
        }

        if attr(&image, "width").is_none() || attr(&image, "height").is_none() {
            signals.missing_dimensions += 1;
        }

        if attr(&image, "loading").is_some_and(|l| l.eq_ignore_ascii_case("lazy")) {
            signals.lazy_loaded += 1;
        }
    }

    signals
}

/// Counts tags that should appear at most once per page
pub fn duplicates(document: &Html, headings: &HeadingSignals) -> DuplicateSignals {
    let mut h1_counts: HashMap<&str, usize> = HashMap::new();
    for text in headings.h1.iter().filter(|t| !t.is_empty()) {
        *h1_counts.entry(text.as_str()).or_default() += 1;
    }

    let mut repeated_h1: Vec<String> = headings
        .h1
        .iter()
        .filter(|t| h1_counts.get(t.as_str()).is_some_and(|c| *c > 1))
        .cloned()
        .collect();
    repeated_h1.dedup();

    DuplicateSignals {
        title_tags: select(document, "title").len(),
        meta_descriptions: select(document, "meta[name='description']").len(),
        canonical_tags: select(document, "link[rel='canonical']").len(),
        repeated_h1,
    }
}

/// Extracts viewport and mobile hints
pub fn mobile(document: &Html) -> MobileSignals {
    let viewport = select(document, "meta[name='viewport']")
        .first()
        .and_then(|e| attr(e, "content"))
        .map(str::to_string);

    let normalized = viewport
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase()
        .replace(' ', "");

    MobileSignals {
        device_width: normalized.contains("width=device-width"),
        initial_scale: normalized.contains("initial-scale"),
        viewport,
        touch_icon: !select(document, "link[rel~='apple-touch-icon']").is_empty(),
    }
}

/// Counts subresources and render-blocking ones
///
/// Timing fields are left at zero; the caller fills them from the snapshot.
pub fn resources(document: &Html, html_bytes: usize) -> PerformanceSignals {
    let scripts = select(document, "script[src]");
    let stylesheets = select(document, "link[rel~='stylesheet'][href]");
    let images = select(document, "img[src]").len();
    let iframes = select(document, "iframe[src]").len();

    let render_blocking_scripts = select(document, "head script[src]")
        .iter()
        .filter(|s| {
            s.value().attr("async").is_none()
                && s.value().attr("defer").is_none()
                && s.value().attr("type") != Some("module")
        })
        .count();

    let render_blocking_styles = select(document, "head link[rel~='stylesheet'][href]")
        .iter()
        .filter(|l| {
            l.value()
                .attr("media")
                .map_or(true, |m| m.trim().eq_ignore_ascii_case("all") || m.trim().is_empty())
        })
        .count();

    PerformanceSignals {
        html_bytes,
        scripts: scripts.len(),
        stylesheets: stylesheets.len(),
        images,
        iframes,
        requests: scripts.len() + stylesheets.len() + images + iframes,
        render_blocking_scripts,
        render_blocking_styles,
        ..PerformanceSignals::default()
    }
}

/// Subresource URLs fetched over plain HTTP
pub fn insecure_resources(document: &Html) -> Vec<String> {
    let mut found = Vec::new();
    for (css, attribute) in [
        ("script[src]", "src"),
        ("img[src]", "src"),
        ("iframe[src]", "src"),
        ("link[rel~='stylesheet'][href]", "href"),
        ("video[src], audio[src], source[src]", "src"),
    ] {
        for element in select(document, css) {
            if let Some(value) = attr(&element, attribute) {
                if value.to_ascii_lowercase().starts_with("http://") {
                    push_unique(&mut found, value);
                }
            }
        }
    }
    found
}

/// Measures visible text
pub fn content(document: &Html, html_bytes: usize) -> ContentSignals {
    let visible = visible_text(document);
    let text_bytes = visible.len();

    ContentSignals {
        word_count: visible.split_whitespace().count(),
        paragraphs: select(document, "p")
            .iter()
            .filter(|p| !text_of(p).is_empty())
            .count(),
        text_html_ratio: if html_bytes == 0 {
            0.0
        } else {
            (text_bytes as f64 / html_bytes as f64 * 1000.0).round() / 10.0
        },
    }
}

/// Body text outside scripts, styles and other invisible containers
fn visible_text(document: &Html) -> String {
    let Some(body) = select(document, "body").into_iter().next() else {
        return String::new();
    };

    let mut words: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| INVISIBLE_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_meta_extraction() {
        let html = r#"<html lang="en"><head>
            <meta charset="utf-8">
            <title>  Example   Title </title>
            <meta name="description" content="A description">
            <meta name="robots" content="noindex, follow">
            <link rel="canonical" href="/blog/post">
            <meta property="og:title" content="OG">
            <meta name="twitter:card" content="summary">
        </head><body></body></html>"#;
        let document = Html::parse_document(html);
        let meta = meta(&document, &base());

        assert_eq!(meta.title.as_deref(), Some("Example Title"));
        assert_eq!(meta.title_length, 13);
        assert_eq!(meta.description.as_deref(), Some("A description"));
        assert_eq!(meta.canonical.as_deref(), Some("https://example.com/blog/post"));
        assert!(meta.noindex);
        assert!(!meta.nofollow);
        assert_eq!(meta.lang.as_deref(), Some("en"));
        assert_eq!(meta.charset.as_deref(), Some("utf-8"));
        assert_eq!(meta.open_graph.get("og:title").map(String::as_str), Some("OG"));
        assert_eq!(meta.twitter.get("twitter:card").map(String::as_str), Some("summary"));
    }

    #[test]
    fn test_structured_data_valid_and_invalid() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@context":"https://schema.org","@graph":[{"@type":"Organization"},{"@type":["WebSite","Thing"]}]}</script>
            <script type="application/ld+json">{ not json </script>
        </head></html>"#;
        let document = Html::parse_document(html);
        let meta = meta(&document, &base());

        assert_eq!(meta.structured_data_blocks, 1);
        assert_eq!(meta.invalid_structured_data, 1);
        assert_eq!(
            meta.structured_data_types,
            vec!["Organization".to_string(), "WebSite".to_string(), "Thing".to_string()]
        );
    }

    #[test]
    fn test_heading_outline() {
        let html = "<body><h1>Main</h1><h2>Sub</h2><h4>Deep</h4><h2></h2></body>";
        let document = Html::parse_document(html);
        let headings = headings(&document);

        assert_eq!(headings.h1, vec!["Main".to_string()]);
        assert_eq!(headings.outline, vec![1, 2, 4, 2]);
        assert_eq!(headings.empty, 1);
        assert!(headings.skipped_levels);
    }

    #[test]
    fn test_resolve_link_exclusions() {
        let base = base();
        assert!(resolve_link("javascript:void(0)", &base).is_none());
        assert!(resolve_link("MAILTO:someone@example.com", &base).is_none());
        assert!(resolve_link("tel:+123", &base).is_none());
        assert!(resolve_link("data:text/html,hi", &base).is_none());
        assert!(resolve_link("#top", &base).is_none());
        assert!(resolve_link("ftp://example.com/file", &base).is_none());
        assert_eq!(
            resolve_link("../about/", &base).unwrap().as_str(),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_links_classified_and_deduplicated() {
        let html = r#"<body>
            <a href="/a">A</a>
            <a href="/a#frag">A again</a>
            <a href="https://www.example.com/b" rel="nofollow">B</a>
            <a href="https://other.org/">Other</a>
            <a href="/c"></a>
            <a href="/d"><img src="x.png" alt="D"></a>
        </body>"#;
        let document = Html::parse_document(html);
        let scope = SiteScope::from_seed(&base(), false).unwrap();
        let links = links(&document, &base(), &scope);

        assert_eq!(
            links.internal,
            vec![
                "https://example.com/a".to_string(),
                "https://www.example.com/b".to_string(),
                "https://example.com/c".to_string(),
                "https://example.com/d".to_string(),
            ]
        );
        assert_eq!(links.external, vec!["https://other.org/".to_string()]);
        assert_eq!(links.nofollow, 1);
        assert_eq!(links.empty_anchor_text, 1);
        assert!(!links.verified);
    }

    #[test]
    fn test_images() {
        let html = r#"<body>
            <img src="a.png" alt="A" width="10" height="10" loading="lazy">
            <img src="b.png">
            <img src="c.png" alt="  ">
        </body>"#;
        let document = Html::parse_document(html);
        let images = images(&document);

        assert_eq!(images.total, 3);
        assert_eq!(images.missing_alt, 2);
        assert_eq!(images.missing_dimensions, 2);
        assert_eq!(images.lazy_loaded, 1);
        assert_eq!(images.missing_alt_sources, vec!["b.png".to_string(), "c.png".to_string()]);
    }

    #[test]
    fn test_duplicates() {
        let html = "<html><head><title>A</title><title>B</title></head><body><h1>X</h1><h1>X</h1><h1>Y</h1></body></html>";
        let document = Html::parse_document(html);
        let heads = headings(&document);
        let dups = duplicates(&document, &heads);

        assert_eq!(dups.repeated_h1, vec!["X".to_string()]);
        assert!(dups.has_duplicates());
    }

    #[test]
    fn test_mobile_viewport() {
        let html = r#"<head><meta name="viewport" content="width=device-width, initial-scale=1"></head>"#;
        let document = Html::parse_document(html);
        let mobile = mobile(&document);

        assert!(mobile.device_width);
        assert!(mobile.is_responsive());
    }

    #[test]
    fn test_render_blocking_resources() {
        let html = r#"<html><head>
            <script src="/blocking.js"></script>
            <script src="/async.js" async></script>
            <script src="/module.js" type="module"></script>
            <link rel="stylesheet" href="/main.css">
            <link rel="stylesheet" href="/print.css" media="print">
        </head><body><img src="/a.png"><script src="/footer.js"></script></body></html>"#;
        let document = Html::parse_document(html);
        let perf = resources(&document, html.len());

        assert_eq!(perf.scripts, 4);
        assert_eq!(perf.stylesheets, 2);
        assert_eq!(perf.render_blocking_scripts, 1);
        assert_eq!(perf.render_blocking_styles, 1);
        assert_eq!(perf.requests, 7);
    }

    #[test]
    fn test_insecure_resources() {
        let html = r#"<body><img src="http://cdn.example.com/a.png"><img src="https://cdn.example.com/b.png"><script src="HTTP://x.com/a.js"></script></body>"#;
        let document = Html::parse_document(html);
        assert_eq!(insecure_resources(&document).len(), 2);
    }

    #[test]
    fn test_content_ignores_scripts() {
        let html = "<html><body><p>one two three</p><script>var hidden = 1;</script><style>p{}</style><p>four</p></body></html>";
        let document = Html::parse_document(html);
        let content = content(&document, html.len());

        assert_eq!(content.word_count, 4);
        assert_eq!(content.paragraphs, 2);
        assert!(content.text_html_ratio > 0.0 && content.text_html_ratio < 100.0);
    }
}
