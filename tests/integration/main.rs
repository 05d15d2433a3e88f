//! Integration tests for Sumi-Lens
//!
//! Every test runs against wiremock servers on localhost, except the ones
//! marked `#[ignore]`, which need the public internet.

mod crawl_tests;
mod server_tests;

use sumi_lens::config::Config;
use sumi_lens::crawler::Orchestrator;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration tuned for fast local crawls
pub fn test_config(max_pages: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_pages = max_pages;
    config.crawler.max_depth = 3;
    config.crawler.verify_links = false;
    config.timeouts.navigation_ms = 5_000;
    config.timeouts.link_check_ms = 2_000;
    config
}

pub fn orchestrator(config: Config) -> Orchestrator {
    Orchestrator::from_config(config).expect("Failed to build orchestrator")
}

/// A small but complete HTML page linking to `links`
pub fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <meta name="description" content="A test page used by the Sumi-Lens integration tests to check crawling.">
</head>
<body>
  <h1>{title}</h1>
  <p>Some text about {title} so the page has content.</p>
  {anchors}
</body>
</html>"#,
        title = title,
        anchors = anchors
    )
}

/// Serves `body` as HTML at `route` for GET requests
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}
