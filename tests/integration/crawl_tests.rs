//! End-to-end crawl tests
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! through the orchestrator.

use crate::{html_page, mount_page, orchestrator, test_config};
use sumi_lens::crawler::CrawlEvent;
use sumi_lens::score::CheckStatus;
use sumi_lens::state::{AuditStatus, PageStatus};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_self_links_are_crawled_once() {
    let server = MockServer::start().await;
    let links: Vec<&str> = std::iter::repeat("/").take(10).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html_page("Home", &links), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = orchestrator(test_config(50))
        .run(&server.uri())
        .await
        .unwrap();

    assert_eq!(result.status, AuditStatus::Completed);
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].status, PageStatus::Audited);
}

#[tokio::test]
async fn test_page_limit_bounds_crawl() {
    let server = MockServer::start().await;
    let paths: Vec<String> = (0..50).map(|i| format!("/p{}", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();

    mount_page(&server, "/", html_page("Home", &links)).await;
    for p in &paths {
        mount_page(&server, p, html_page(p, &links)).await;
    }

    let result = orchestrator(test_config(5))
        .run(&server.uri())
        .await
        .unwrap();

    assert_eq!(result.status, AuditStatus::Completed);
    assert_eq!(result.pages.len(), 5);
    assert_eq!(result.pages_crawled, 5);
    assert!(result.pages.iter().all(|p| p.is_success()));
}

#[tokio::test]
async fn test_small_site_is_fully_crawled() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/about", "/contact"])).await;
    mount_page(&server, "/about", html_page("About", &["/"])).await;
    mount_page(&server, "/contact", html_page("Contact", &["/about"])).await;

    let result = orchestrator(test_config(50))
        .run(&server.uri())
        .await
        .unwrap();

    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.pages[0].depth, 0);
    assert!(result.pages[1..].iter().all(|p| p.depth == 1));
    assert!(result.score > 0);
}

#[tokio::test]
async fn test_interior_failure_keeps_crawl_completed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/gone", "/alive"])).await;
    mount_page(&server, "/alive", html_page("Alive", &[])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = orchestrator(test_config(50))
        .run(&server.uri())
        .await
        .unwrap();

    assert_eq!(result.status, AuditStatus::Completed);
    assert_eq!(result.pages_crawled, 3);
    assert_eq!(result.pages_failed, 1);

    let gone = result
        .pages
        .iter()
        .find(|p| p.url.ends_with("/gone"))
        .unwrap();
    assert_eq!(gone.status, PageStatus::DeadLink);
    assert!(gone.error.as_deref().unwrap().contains("404"));
    assert!(result.issues.errors >= 1);
}

#[tokio::test]
async fn test_robots_disallowed_links_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", html_page("Home", &["/private", "/public"])).await;
    mount_page(&server, "/public", html_page("Public", &[])).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html_page("Secret", &[]), "text/html"),
        )
        .expect(0)
        .mount(&server)
        .await;

    let result = orchestrator(test_config(50))
        .run(&server.uri())
        .await
        .unwrap();

    assert_eq!(result.pages.len(), 2);
    assert!(result.pages.iter().all(|p| !p.url.ends_with("/private")));

    let robots_check = result.pages[0]
        .checks
        .iter()
        .find(|c| c.name == "Robots.txt")
        .unwrap();
    assert_eq!(robots_check.status, CheckStatus::Pass);
}

#[tokio::test]
async fn test_broken_links_are_reported() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/ok", "/missing"])).await;
    Mock::given(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html_page("Ok", &[]), "text/html"),
        )
        .mount(&server)
        .await;

    let mut config = test_config(1);
    config.crawler.verify_links = true;
    let result = orchestrator(config).run(&server.uri()).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    let signals = result.pages[0].signals.as_ref().unwrap();
    assert!(signals.links.verified);
    assert_eq!(signals.links.broken.len(), 1);
    assert!(signals.links.broken[0].ends_with("/missing"));

    let check = result.pages[0]
        .checks
        .iter()
        .find(|c| c.name == "Broken Links")
        .unwrap();
    assert_eq!(check.status, CheckStatus::Fail);
}

#[tokio::test]
async fn test_progress_events_precede_completion() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", html_page("A", &[])).await;
    mount_page(&server, "/b", html_page("B", &[])).await;

    let (tx, mut rx) = mpsc::channel(16);
    let result = orchestrator(test_config(10))
        .run_with_progress(&server.uri(), tx)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), result.pages.len() + 1);
    let percentages: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::Progress { progress } => Some(progress.percentage),
            CrawlEvent::Complete { .. } => None,
        })
        .collect();
    assert_eq!(percentages, vec![10.0, 20.0, 30.0]);
    match events.last().unwrap() {
        CrawlEvent::Complete { result: streamed } => {
            assert_eq!(streamed.audit_id, result.audit_id)
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_seed_fails_crawl() {
    let fatal = orchestrator(test_config(50))
        .run("http://nonexistent.invalid")
        .await
        .unwrap_err();

    assert_eq!(fatal.result.status, AuditStatus::Failed);
    assert!(fatal.result.pages.is_empty());
    assert!(fatal
        .result
        .error
        .as_deref()
        .unwrap()
        .contains("nonexistent.invalid"));
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn test_example_com_single_page() {
    let result = orchestrator(test_config(1))
        .run("https://example.com")
        .await
        .unwrap();

    assert_eq!(result.status, AuditStatus::Completed);
    assert_eq!(result.pages.len(), 1);
    let https = result.pages[0]
        .checks
        .iter()
        .find(|c| c.name == "HTTPS")
        .unwrap();
    assert_eq!(https.status, CheckStatus::Pass);
}
