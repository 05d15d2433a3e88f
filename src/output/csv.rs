//! CSV export
//!
//! Every row carries all nine columns; cells a row kind does not use are
//! empty strings so columns stay aligned across row kinds.

use crate::crawler::MultiPageAuditResult;
use crate::score::CheckCategory;
use crate::ExportError;
use serde::Serialize;
use tracing::warn;

pub const CSV_HEADER: [&str; 9] = [
    "Category",
    "Metric",
    "Type",
    "Count",
    "Percentage",
    "Severity",
    "Priority",
    "Action",
    "Value",
];

/// Recommendations listed at most
const MAX_RECOMMENDATIONS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct CsvRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Metric")]
    metric: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Count")]
    count: String,
    #[serde(rename = "Percentage")]
    percentage: String,
    #[serde(rename = "Severity")]
    severity: String,
    #[serde(rename = "Priority")]
    priority: String,
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Value")]
    value: String,
}

impl CsvRow {
    fn summary(metric: &str, value: impl ToString) -> Self {
        Self {
            category: "Summary".to_string(),
            metric: metric.to_string(),
            value: value.to_string(),
            ..Self::default()
        }
    }

    fn cells(&self) -> [&str; 9] {
        [
            &self.category,
            &self.metric,
            &self.kind,
            &self.count,
            &self.percentage,
            &self.severity,
            &self.priority,
            &self.action,
            &self.value,
        ]
    }
}

/// Builds the rows for an aggregate
pub(crate) fn rows(result: &MultiPageAuditResult) -> Vec<CsvRow> {
    let mut rows = vec![
        CsvRow::summary("Health Score", result.score),
        CsvRow::summary("Total Pages", result.pages_crawled),
        CsvRow::summary("Failed Pages", result.pages_failed),
        CsvRow::summary("Errors", result.issues.errors),
        CsvRow::summary("Warnings", result.issues.warnings),
        CsvRow::summary("Notices", result.issues.notices),
    ];
    for category in CheckCategory::ALL {
        rows.push(CsvRow::summary(
            &format!("{} Score", category),
            result.category_scores.get(category),
        ));
    }

    for issue in &result.top_issues {
        rows.push(CsvRow {
            category: "Issue".to_string(),
            kind: issue.title.clone(),
            count: issue.count.to_string(),
            percentage: format!("{:.2}", issue.percentage),
            severity: issue.severity.as_str().to_string(),
            ..CsvRow::default()
        });
    }

    let mut seen = Vec::new();
    for recommendation in result
        .top_issues
        .iter()
        .filter_map(|i| i.recommendation.as_deref())
    {
        if seen.len() == MAX_RECOMMENDATIONS {
            break;
        }
        if !seen.contains(&recommendation) {
            seen.push(recommendation);
        }
    }
    for (index, action) in seen.into_iter().enumerate() {
        rows.push(CsvRow {
            category: "Recommendation".to_string(),
            priority: (index + 1).to_string(),
            action: action.to_string(),
            ..CsvRow::default()
        });
    }

    for page in &result.pages {
        rows.push(CsvRow {
            category: "Page".to_string(),
            metric: page.url.clone(),
            kind: page.status.to_string(),
            value: page.score.to_string(),
            ..CsvRow::default()
        });
    }

    rows
}

/// Serializes rows with the `csv` crate
pub(crate) fn write_rows(rows: &[CsvRow]) -> Result<String, ExportError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Joins rows by hand, quoting every cell
pub(crate) fn write_rows_simple(rows: &[CsvRow]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.cells().iter().map(|c| escape_csv(c)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn escape_csv(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Renders the CSV text, falling back to the manual writer on error
pub fn render_csv(result: &MultiPageAuditResult) -> String {
    let rows = rows(result);
    match write_rows(&rows) {
        Ok(text) => text,
        Err(e) => {
            warn!("CSV serialization failed, using simple writer: {}", e);
            write_rows_simple(&rows)
        }
    }
}
