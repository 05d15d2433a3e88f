//! Request handlers for the audit API.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::AppState;
use crate::crawler::{CrawlEvent, MultiPageAuditResult};
use crate::output::ReportFormat;

/// Events buffered between the crawl task and a slow client
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: String,
    pub max_pages: Option<usize>,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub aggregate: MultiPageAuditResult,
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub format: ReportFormat,
    pub data_uri: String,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Audit one URL without following links.
pub async fn audit_page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Response {
    match state.orchestrator.audit_page(&request.url).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// Crawl a site, streaming one JSON frame per line.
///
/// Frames are `{"type":"progress",...}` per finished page and a final
/// `{"type":"complete",...}`. Dropping the connection cancels the crawl.
pub async fn audit_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Response {
    let token = state.orchestrator.cancellation_token().child_token();
    let orchestrator = state
        .orchestrator
        .with_bounds(request.max_pages, request.max_depth)
        .with_cancellation(token.clone());

    let (tx, rx) = mpsc::channel::<CrawlEvent>(EVENT_BUFFER);
    let seed = request.url;
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_with_progress(&seed, tx).await {
            warn!("Streamed crawl failed: {}", e);
        }
    });

    // The guard lives as long as the response body
    let guard = token.drop_guard();
    let frames = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(encode_frame(&event)), (rx, guard)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(frames))
        .unwrap_or_else(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
}

fn encode_frame(event: &CrawlEvent) -> Bytes {
    match serde_json::to_string(event) {
        Ok(mut line) => {
            line.push('\n');
            Bytes::from(line)
        }
        Err(e) => {
            debug!("Dropping unserializable crawl event: {}", e);
            Bytes::from(format!(
                "{}\n",
                serde_json::json!({ "type": "error", "error": e.to_string() })
            ))
        }
    }
}

/// Render an aggregate as a report data-URI.
pub async fn export_report(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Response {
    let reports = state.reports;
    let format = request.format;
    let rendered = tokio::task::spawn_blocking(move || {
        reports.generate(&request.aggregate, format)
    })
    .await;

    match rendered {
        Ok(Ok(data_uri)) => Json(ExportResponse { format, data_uri }).into_response(),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
