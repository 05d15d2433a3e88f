//! Report output
//!
//! This module handles:
//! - Rendering crawl aggregates as PDF and CSV reports
//! - Encoding reports as base64 data-URIs for transport
//! - Printing human-readable summaries for the CLI

mod csv;
mod pdf;
pub mod summary;

pub use self::csv::{render_csv, CSV_HEADER};
pub use self::pdf::{render_pdf, BASIC_INFO_NOTICE};
pub use self::summary::{format_history, format_summary, print_history, print_summary};

use crate::crawler::MultiPageAuditResult;
use crate::ExportError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Csv,
}

impl ReportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Renders aggregates into downloadable reports
///
/// CSV generation cannot fail: a serialization error falls back to a
/// hand-joined CSV. PDF generation absorbs section failures into a shorter
/// report and only errors when the document itself cannot be written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Renders the PDF as a `data:application/pdf;base64,` URI
    pub fn generate_pdf(&self, result: &MultiPageAuditResult) -> Result<String, ExportError> {
        let bytes = self.generate_pdf_bytes(result)?;
        Ok(data_uri(ReportFormat::Pdf.mime_type(), &bytes))
    }

    pub fn generate_pdf_bytes(
        &self,
        result: &MultiPageAuditResult,
    ) -> Result<Vec<u8>, ExportError> {
        info!("Generating PDF report for audit {}", result.audit_id);
        render_pdf(result)
    }

    /// Renders the CSV as a `data:text/csv;base64,` URI
    pub fn generate_csv(&self, result: &MultiPageAuditResult) -> String {
        data_uri(ReportFormat::Csv.mime_type(), self.generate_csv_text(result).as_bytes())
    }

    pub fn generate_csv_text(&self, result: &MultiPageAuditResult) -> String {
        info!("Generating CSV report for audit {}", result.audit_id);
        render_csv(result)
    }

    /// Renders either format as a data-URI
    pub fn generate(
        &self,
        result: &MultiPageAuditResult,
        format: ReportFormat,
    ) -> Result<String, ExportError> {
        match format {
            ReportFormat::Pdf => self.generate_pdf(result),
            ReportFormat::Csv => Ok(self.generate_csv(result)),
        }
    }
}

/// Encodes bytes as a base64 data-URI
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Splits a base64 data-URI into its MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime_type.to_string(), bytes))
}
