//! PDF export
//!
//! Rendering is two-pass: sections are first laid out into buffered pages,
//! then every page is stamped with a "Page N of M" footer once the page count
//! is known, and only then drawn with `printpdf`.

use crate::crawler::MultiPageAuditResult;
use crate::score::CheckCategory;
use crate::ExportError;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::warn;

/// A4 in millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;

/// 50pt
const MARGIN: f32 = 17.6;

const FOOTER_Y: f32 = 10.0;
const FOOTER_SIZE: f32 = 9.0;

/// Lowest baseline for body text
const BOTTOM: f32 = MARGIN + 8.0;

const PT_TO_MM: f32 = 0.3528;

/// Refuse to grow past this many pages
const MAX_PDF_PAGES: usize = 40;

const MAX_LISTED_ISSUES: usize = 10;
const MAX_LISTED_PAGES: usize = 100;

pub const BASIC_INFO_NOTICE: &str = "Error generating full report. Basic information included.";

/// One positioned line of text
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub x: f32,
    pub y: f32,
}

/// Buffered pages of positioned text
#[derive(Debug)]
pub(crate) struct Layout {
    pages: Vec<Vec<TextLine>>,
    cursor: f32,
    stamped: bool,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - MARGIN,
            stamped: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Vec<TextLine>] {
        &self.pages
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.pages
            .iter()
            .flatten()
            .any(|line| line.text.contains(needle))
    }

    fn new_page(&mut self) -> Result<(), ExportError> {
        if self.pages.len() >= MAX_PDF_PAGES {
            return Err(ExportError::Layout {
                section: "layout".to_string(),
                message: format!("report exceeds {} pages", MAX_PDF_PAGES),
            });
        }
        self.pages.push(Vec::new());
        self.cursor = PAGE_HEIGHT - MARGIN;
        Ok(())
    }

    fn gap(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    fn text(&mut self, text: &str, size: f32, bold: bool) -> Result<(), ExportError> {
        self.place(text, size, bold, false)
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool) -> Result<(), ExportError> {
        self.place(text, size, bold, true)
    }

    fn place(
        &mut self,
        text: &str,
        size: f32,
        bold: bool,
        centered: bool,
    ) -> Result<(), ExportError> {
        let height = line_height(size);
        if self.cursor - height < BOTTOM {
            self.new_page()?;
        }
        self.cursor -= height;

        let text = fit(&encodable(text), size);
        let x = if centered {
            ((PAGE_WIDTH - text_width(&text, size)) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        let y = self.cursor;
        if let Some(page) = self.pages.last_mut() {
            page.push(TextLine {
                text,
                size,
                bold,
                x,
                y,
            });
        }
        Ok(())
    }

    /// Second pass: adds the running footer to every buffered page
    fn stamp(&mut self) {
        if self.stamped {
            return;
        }
        let total = self.pages.len();
        for (index, page) in self.pages.iter_mut().enumerate() {
            let text = format!("Page {} of {}", index + 1, total);
            page.push(TextLine {
                x: (PAGE_WIDTH - text_width(&text, FOOTER_SIZE)) / 2.0,
                y: FOOTER_Y,
                size: FOOTER_SIZE,
                bold: false,
                text,
            });
        }
        self.stamped = true;
    }
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.5
}

/// Approximate Helvetica advance width
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

/// Truncates text to the printable width
fn fit(text: &str, size: f32) -> String {
    let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / (size * 0.5 * PT_TO_MM)) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// The builtin fonts only cover Latin-1
fn encodable(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .collect()
}

type Section = fn(&mut Layout, &MultiPageAuditResult) -> Result<(), ExportError>;

const SECTIONS: [(&str, Section); 5] = [
    ("title", title_section),
    ("summary", summary_section),
    ("category scores", category_section),
    ("top issues", top_issues_section),
    ("pages", pages_section),
];

fn title_section(layout: &mut Layout, result: &MultiPageAuditResult) -> Result<(), ExportError> {
    layout.centered("SEO Audit Report", 24.0, true)?;
    layout.gap(6.0);
    let generated = result
        .completed_at
        .unwrap_or(result.started_at)
        .format("%Y-%m-%d %H:%M UTC");
    layout.text(&format!("Generated: {}", generated), 11.0, false)?;
    layout.text(&format!("Audit ID: {}", result.audit_id), 11.0, false)?;
    layout.text(&format!("URL: {}", result.seed_url), 11.0, false)?;
    layout.text(&format!("Status: {}", result.status), 11.0, false)?;
    if result.cancelled {
        layout.text("The crawl was cancelled before it finished.", 11.0, false)?;
    }
    if let Some(error) = &result.error {
        layout.text(&format!("Error: {}", error), 11.0, false)?;
    }
    layout.gap(4.0);
    layout.text(&format!("Health Score: {}/100", result.score), 16.0, true)?;
    layout.gap(6.0);
    Ok(())
}

fn summary_section(layout: &mut Layout, result: &MultiPageAuditResult) -> Result<(), ExportError> {
    layout.text("Summary", 16.0, true)?;
    layout.text(&format!("- Pages Scanned: {}", result.pages_crawled), 11.0, false)?;
    layout.text(&format!("- Pages Failed: {}", result.pages_failed), 11.0, false)?;
    layout.text(
        &format!(
            "- Total Issues: {} ({} errors, {} warnings, {} notices)",
            result.issues.total(),
            result.issues.errors,
            result.issues.warnings,
            result.issues.notices
        ),
        11.0,
        false,
    )?;
    if let Some(load_ms) = average_load_time(result) {
        layout.text(&format!("- Load Time: {}ms", load_ms), 11.0, false)?;
    }
    layout.gap(6.0);
    Ok(())
}

fn category_section(layout: &mut Layout, result: &MultiPageAuditResult) -> Result<(), ExportError> {
    layout.text("Category Scores", 16.0, true)?;
    for category in CheckCategory::ALL {
        layout.text(
            &format!("- {}: {}/100", category, result.category_scores.get(category)),
            11.0,
            false,
        )?;
    }
    Ok(())
}

fn top_issues_section(
    layout: &mut Layout,
    result: &MultiPageAuditResult,
) -> Result<(), ExportError> {
    layout.new_page()?;
    layout.text("Top Issues", 16.0, true)?;
    if result.top_issues.is_empty() {
        layout.text("No issues found.", 11.0, false)?;
    }
    for (index, issue) in result.top_issues.iter().take(MAX_LISTED_ISSUES).enumerate() {
        if !issue.percentage.is_finite() {
            return Err(ExportError::Layout {
                section: "top issues".to_string(),
                message: format!("invalid percentage for '{}'", issue.title),
            });
        }
        layout.gap(2.0);
        layout.text(&format!("{}. {}", index + 1, issue.title), 12.0, true)?;
        layout.text(
            &format!(
                "   Count: {} pages ({:.1}%), severity {}",
                issue.count,
                issue.percentage,
                issue.severity.as_str()
            ),
            10.0,
            false,
        )?;
        if let Some(recommendation) = &issue.recommendation {
            layout.text(&format!("   {}", recommendation), 10.0, false)?;
        }
    }
    layout.gap(6.0);
    Ok(())
}

fn pages_section(layout: &mut Layout, result: &MultiPageAuditResult) -> Result<(), ExportError> {
    if result.pages.is_empty() {
        return Ok(());
    }
    layout.text("Pages", 16.0, true)?;
    for page in result.pages.iter().take(MAX_LISTED_PAGES) {
        let line = if page.is_success() {
            format!("{}/100  {}", page.score, page.url)
        } else {
            format!("{}  {}", page.status, page.url)
        };
        layout.text(&line, 9.0, false)?;
    }
    if result.pages.len() > MAX_LISTED_PAGES {
        layout.text(
            &format!("... and {} more", result.pages.len() - MAX_LISTED_PAGES),
            9.0,
            false,
        )?;
    }
    Ok(())
}

fn average_load_time(result: &MultiPageAuditResult) -> Option<u64> {
    let times: Vec<u64> = result
        .pages
        .iter()
        .filter_map(|p| p.signals.as_ref())
        .map(|s| s.performance.load_time_ms)
        .collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<u64>() / times.len() as u64)
}

/// First pass: lays out every section, then stamps footers
///
/// A section that fails keeps what was laid out before it; the report then
/// ends with [`BASIC_INFO_NOTICE`].
pub(crate) fn layout(result: &MultiPageAuditResult) -> Layout {
    let mut layout = Layout::new();
    for (name, section) in SECTIONS {
        if let Err(e) = section(&mut layout, result) {
            warn!("PDF section '{}' failed, emitting basic report: {}", name, e);
            layout.gap(4.0);
            if layout.text(BASIC_INFO_NOTICE, 11.0, true).is_err() {
                if let Some(page) = layout.pages.last_mut() {
                    page.push(TextLine {
                        text: BASIC_INFO_NOTICE.to_string(),
                        size: 11.0,
                        bold: true,
                        x: MARGIN,
                        y: BOTTOM,
                    });
                }
            }
            break;
        }
    }
    layout.stamp();
    layout
}

/// Draws the stamped layout into PDF bytes
pub(crate) fn render(layout: &Layout, title: &str) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    for (index, lines) in layout.pages().iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };
        for line in lines {
            let font = if line.bold { &bold } else { &regular };
            layer.use_text(line.text.clone(), line.size, Mm(line.x), Mm(line.y), font);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| ExportError::Pdf(e.to_string()))
}

/// Lays out and renders the report
pub fn render_pdf(result: &MultiPageAuditResult) -> Result<Vec<u8>, ExportError> {
    let layout = layout(result);
    render(&layout, &format!("SEO Audit Report - {}", result.domain))
}
