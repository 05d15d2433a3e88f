//! Audit API tests against a mocked site

use crate::{html_page, mount_page, orchestrator, test_config};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use sumi_lens::server::{create_router, AppState};
use tower::ServiceExt;
use wiremock::MockServer;

fn app(max_pages: usize) -> axum::Router {
    create_router(AppState::new(orchestrator(test_config(max_pages))))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_audit_page_returns_scored_checks() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/elsewhere"])).await;

    let response = app(10)
        .oneshot(post_json(
            "/audit/page",
            serde_json::json!({ "url": server.uri() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "audited");
    assert_eq!(json["depth"], 0);
    assert!(!json["checks"].as_array().unwrap().is_empty());
    assert!(json["score"].as_u64().unwrap() <= 100);
}

#[tokio::test]
async fn test_audit_page_reports_unreachable_page() {
    let server = MockServer::start().await;

    let response = app(10)
        .oneshot(post_json(
            "/audit/page",
            serde_json::json!({ "url": format!("{}/missing", server.uri()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "dead_link");
    assert_eq!(json["score"], 0);
    assert!(json["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_crawl_streams_progress_then_result() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", &["/a", "/b", "/c"])).await;
    mount_page(&server, "/a", html_page("A", &[])).await;
    mount_page(&server, "/b", html_page("B", &[])).await;
    mount_page(&server, "/c", html_page("C", &[])).await;

    let response = app(50)
        .oneshot(post_json(
            "/audit/crawl",
            serde_json::json!({ "url": server.uri(), "maxPages": 2 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let frames: Vec<serde_json::Value> = body_text(response)
        .await
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["type"], "progress");
    assert_eq!(frames[0]["progress"]["current"], 1);
    assert_eq!(frames[0]["progress"]["total"], 2);
    assert_eq!(frames[1]["progress"]["percentage"], 100.0);

    let result = &frames[2];
    assert_eq!(result["type"], "complete");
    assert_eq!(result["result"]["status"], "completed");
    assert_eq!(result["result"]["pagesCrawled"], 2);
}
