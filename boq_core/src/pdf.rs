//! # PDF Export
//!
//! Renders a [`ReportData`] to PDF with Typst.
//!
//! - The layout is a Typst template embedded as a string constant
//! - Values are substituted into the template before compilation; every piece
//!   of user or catalog text goes in as a Typst string literal
//! - Fonts are the ones bundled with `typst-assets`
//! - Output is raw PDF bytes (`Vec<u8>`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary};
//! use boq_core::estimate::{Estimate, EstimateInputs};
//! use boq_core::pdf::TypstPdfExporter;
//! use boq_core::report::{ReportData, ReportExporter};
//!
//! let raw = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 100.0, total_wall_length_m: 80.0, wall_thickness_m: 0.15 },
//!     rooms: vec![],
//!     elements: PlanElements { doors: 4, windows: 8 },
//! };
//! let inputs = EstimateInputs::new(raw);
//! let report = ReportData::from_estimate(&Estimate::compute(&inputs), &inputs, None);
//! let pdf = TypstPdfExporter.export(&report)?;
//! std::fs::write("Project-Estimation-Report.pdf", pdf).unwrap();
//! # Ok::<(), boq_core::errors::EstimateError>(())
//! ```

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use tracing::debug;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::currency::{format_quantity, format_report_amount};
use crate::errors::{EstimateError, EstimateResult};
use crate::report::{ReportData, ReportExporter};

// ============================================================================
// Typst World Implementation
// ============================================================================

/// Bundled fonts, parsed once per process
static FONTS: Lazy<Vec<Font>> = Lazy::new(|| {
    typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data.to_vec())))
        .collect()
});

/// A single-file Typst world: the report source and the bundled fonts.
struct PdfWorld {
    main: Source,
    book: LazyHash<FontBook>,
    library: LazyHash<Library>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(FontBook::from_fonts(FONTS.iter())),
            library: LazyHash::new(Library::default()),
        }
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(now.year(), now.month() as u8, now.day() as u8)
    }
}

// ============================================================================
// Template
// ============================================================================

const REPORT_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (top: 2cm, bottom: 2cm, left: 1.4cm, right: 1.4cm),
  footer: context [
    #set text(size: 8pt, fill: gray)
    #grid(
      columns: (1fr, 1fr),
      align(left)[Floor plan BOQ estimator],
      align(right)[Page #counter(page).display() of #counter(page).final().first()],
    )
  ]
)

#set text(size: 10pt)

#text(size: 20pt, weight: "bold")[Project Cost Estimation Report]
#v(2pt)
#text(size: 9pt, fill: gray)[Generated on {{DATE}}{{FILE_NAME}}]
#line(length: 100%, stroke: 0.5pt + gray)

== Project Summary

#table(
  columns: (6cm, 1fr),
  stroke: none,
  align: (left, right),
  [*Total Estimated Cost*], [{{TOTAL_COST}}],
  [*Total Area*], [{{TOTAL_AREA}}],
  [*Number of Rooms*], [{{ROOM_COUNT}}],
  [*Wall Height*], [{{WALL_HEIGHT}} m],
)

#v(10pt)

== Cost Breakdown by Category

#table(
  columns: (1fr, auto, auto),
  inset: 6pt,
  stroke: 0.5pt + gray,
  align: (left, right, right),
  fill: (_, y) => if y == 0 { rgb("#4f46e5") } else if calc.even(y) { rgb("#f3f4f6") },
  table.header(
    text(fill: white)[*Category*],
    text(fill: white)[*Cost*],
    text(fill: white)[*% of Total*],
  ),
{{BREAKDOWN_ROWS}}
)

#v(10pt)

== Detailed Bill of Quantities

#table(
  columns: (1fr, auto, auto, auto, auto),
  inset: 5pt,
  stroke: 0.5pt + gray,
  align: (left, right, center, right, right),
  fill: (_, y) => if y == 0 { rgb("#334155") },
  table.header(
    text(fill: white)[*Material Item*],
    text(fill: white)[*Quantity*],
    text(fill: white)[*Unit*],
    text(fill: white)[*Unit Rate*],
    text(fill: white)[*Total Cost*],
  ),
{{BOQ_ROWS}}
)
"##;

/// Quote text as a Typst string literal so no character is read as markup
fn typst_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 3);
    out.push_str("#\"");
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn breakdown_rows(report: &ReportData) -> String {
    let code = &report.settings.currency;
    report
        .consolidated_report
        .iter()
        .map(|c| {
            format!(
                "  [{}], [{}], [{:.1}%],",
                typst_text(c.bucket.label()),
                typst_text(&format_report_amount(c.cost, code)),
                report.share_percent(c.cost),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn boq_rows(report: &ReportData) -> String {
    let code = &report.settings.currency;
    report
        .boq
        .iter()
        .map(|line| {
            format!(
                "  [{}], [{}], [{}], [{}], [*{}*],",
                typst_text(&line.name),
                typst_text(&format_quantity(line.quantity)),
                typst_text(&line.unit),
                typst_text(&format_report_amount(line.unit_rate, code)),
                typst_text(&format_report_amount(line.total_cost, code)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill the template for one report
pub fn report_source(report: &ReportData) -> String {
    let file_name = report
        .file_name
        .as_deref()
        .map(|name| format!(" from {}", typst_text(name)))
        .unwrap_or_default();

    REPORT_TEMPLATE
        .replace("{{DATE}}", &report.generated_at.format("%d %b %Y").to_string())
        .replace("{{FILE_NAME}}", &file_name)
        .replace(
            "{{TOTAL_COST}}",
            &typst_text(&format_report_amount(report.total_project_cost, &report.settings.currency)),
        )
        .replace("{{TOTAL_AREA}}", &typst_text(&report.area_display()))
        .replace("{{ROOM_COUNT}}", &report.room_count.to_string())
        .replace("{{WALL_HEIGHT}}", &format!("{}", report.settings.wall_height_m))
        .replace("{{BREAKDOWN_ROWS}}", &breakdown_rows(report))
        .replace("{{BOQ_ROWS}}", &boq_rows(report))
}

/// Compile a report to PDF bytes.
pub fn render_report_pdf(report: &ReportData) -> EstimateResult<Vec<u8>> {
    let world = PdfWorld::new(report_source(report));
    let warned = typst::compile(&world);

    let document = warned.output.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        EstimateError::Internal {
            message: format!("Typst compilation failed: {}", messages.join("; ")),
        }
    })?;

    let bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        EstimateError::Internal {
            message: format!("PDF rendering failed: {}", messages.join("; ")),
        }
    })?;

    debug!(bytes = bytes.len(), lines = report.boq.len(), "rendered report PDF");
    Ok(bytes)
}

/// [`ReportExporter`] producing a PDF via Typst
#[derive(Debug, Clone, Copy, Default)]
pub struct TypstPdfExporter;

impl ReportExporter for TypstPdfExporter {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn export(&self, report: &ReportData) -> EstimateResult<Vec<u8>> {
        render_report_pdf(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::sample_plan;
    use crate::estimate::{Estimate, EstimateInputs};

    fn sample_report() -> ReportData {
        let mut inputs = EstimateInputs::new(sample_plan());
        inputs.overrides.set_quantity("solar-panel", 2.0);
        inputs.overrides.set_rate("solar-panel", 25_000.0);
        ReportData::from_estimate(&Estimate::compute(&inputs), &inputs, Some("ground \"floor\".png"))
    }

    #[test]
    fn test_typst_text_quotes_markup() {
        assert_eq!(typst_text("Taps & Mixers (Set)"), "#\"Taps & Mixers (Set)\"");
        assert_eq!(typst_text("a\"b\\c"), "#\"a\\\"b\\\\c\"");
        assert_eq!(typst_text("Plumbing // Points"), "#\"Plumbing // Points\"");
    }

    #[test]
    fn test_source_contains_rows() {
        let report = sample_report();
        let source = report_source(&report);
        assert!(source.contains("#\"Red Clay Bricks\""));
        assert!(source.contains("#\"SOLAR PANEL\""));
        assert!(source.contains("#\"Civil Structure\""));
        assert!(source.contains("Rs. "));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_pdf_generation() {
        let pdf = TypstPdfExporter.export(&sample_report());
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let bytes = pdf.unwrap();
        assert!(bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        assert!(bytes.len() > 1000, "PDF seems too small");
    }
}
