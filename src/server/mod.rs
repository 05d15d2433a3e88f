//! HTTP API for audits and report export
//!
//! Exposes the audit engine to a front end:
//! - `POST /audit/page` audits a single URL
//! - `POST /audit/crawl` streams crawl progress as newline-delimited JSON
//! - `POST /report/export` renders an aggregate as a PDF or CSV data-URI
//! - `GET /health` for liveness checks

mod handlers;
mod routes;

pub use handlers::{CrawlRequest, ExportRequest, ExportResponse, PageRequest};
pub use routes::create_router;

use crate::crawler::Orchestrator;
use crate::output::ReportGenerator;
use std::net::SocketAddr;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub reports: ReportGenerator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            reports: ReportGenerator::new(),
        }
    }
}

/// Start the web server.
///
/// Runs until the orchestrator's cancellation token fires, then closes the
/// browser if one was started.
pub async fn serve(orchestrator: Orchestrator, host: &str, port: u16) -> anyhow::Result<()> {
    let shutdown = orchestrator.cancellation_token();
    let state = AppState::new(orchestrator.clone());
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    orchestrator.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawler::{AuditHeader, MultiPageAuditResult};
    use crate::output::decode_data_uri;
    use crate::state::AuditStatus;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> axum::Router {
        let orchestrator = Orchestrator::from_config(Config::default()).unwrap();
        create_router(AppState::new(orchestrator))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_audit_page_rejects_bad_url() {
        let response = test_app()
            .oneshot(post_json(
                "/audit/page",
                serde_json::json!({ "url": "ftp://example.com/file" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("scheme"));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let aggregate = MultiPageAuditResult::aggregate(
            AuditHeader::new("https://example.com/", "example.com"),
            AuditStatus::Completed,
            Vec::new(),
            false,
        );
        let response = test_app()
            .oneshot(post_json(
                "/report/export",
                serde_json::json!({ "aggregate": aggregate, "format": "csv" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["format"], "csv");
        let (mime, bytes) = decode_data_uri(json["dataUri"].as_str().unwrap()).unwrap();
        assert_eq!(mime, "text/csv");
        assert!(String::from_utf8(bytes)
            .unwrap()
            .starts_with("Category,Metric,Type,Count,Percentage,Severity,Priority,Action,Value"));
    }

    #[tokio::test]
    async fn test_crawl_with_invalid_seed_streams_failed_result() {
        let response = test_app()
            .oneshot(post_json(
                "/audit/crawl",
                serde_json::json!({ "url": "not a url", "maxPages": 5 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let frames: Vec<serde_json::Value> = String::from_utf8(body.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "complete");
        assert_eq!(frames[0]["result"]["status"], "failed");
        assert_eq!(frames[0]["result"]["pages"].as_array().unwrap().len(), 0);
    }
}
