//! # Report Data
//!
//! A flat, serializable snapshot of an estimate for anything that formats
//! it: the PDF exporter, the CLI tables, saved plans. Exporters only see
//! [`ReportData`], never the engine types it was built from.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary};
//! use boq_core::estimate::{Estimate, EstimateInputs};
//! use boq_core::report::ReportData;
//!
//! let raw = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 100.0, total_wall_length_m: 80.0, wall_thickness_m: 0.15 },
//!     rooms: vec![],
//!     elements: PlanElements { doors: 4, windows: 8 },
//! };
//! let inputs = EstimateInputs::new(raw);
//! let report = ReportData::from_estimate(&Estimate::compute(&inputs), &inputs, Some("plan.png"));
//! assert_eq!(report.room_count, 0);
//! assert_eq!(report.area_display(), "100.0 m²");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::{parse_target_area, AreaUnit};
use crate::errors::EstimateResult;
use crate::estimate::{BoqLine, CategoryCost, Estimate, EstimateInputs};
use crate::project::ProjectSettings;

/// Everything a printed estimate shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    pub settings: ProjectSettings,

    pub total_project_cost: f64,

    /// Total area in the unit the user works in
    pub total_area: f64,
    pub area_unit: AreaUnit,

    pub room_count: usize,

    /// Cost per bucket, highest first
    pub consolidated_report: Vec<CategoryCost>,

    /// Lines with a quantity, most expensive first
    pub boq: Vec<BoqLine>,
}

impl ReportData {
    pub fn from_estimate(estimate: &Estimate, inputs: &EstimateInputs, file_name: Option<&str>) -> Self {
        // Repeat the typed area verbatim only when calibration applied it
        let calibrated_sq_m = estimate.calibrated.summary.total_area_sq_m;
        let total_area = parse_target_area(&inputs.calibration_input)
            .filter(|&typed| {
                let typed_sq_m = inputs.unit.to_sq_m(typed);
                (typed_sq_m - calibrated_sq_m).abs() <= 1e-9 * typed_sq_m.max(1.0)
            })
            .unwrap_or_else(|| inputs.unit.from_sq_m(calibrated_sq_m));

        ReportData {
            generated_at: Utc::now(),
            file_name: file_name.map(str::to_string),
            settings: inputs.settings.clone(),
            total_project_cost: estimate.total_project_cost,
            total_area,
            area_unit: inputs.unit,
            room_count: estimate.calibrated.room_count(),
            consolidated_report: estimate.consolidated_report.clone(),
            boq: estimate.boq().into_iter().cloned().collect(),
        }
    }

    /// Bucket share of the total, in percent (0 when the total is 0)
    pub fn share_percent(&self, cost: f64) -> f64 {
        if self.total_project_cost.abs() > f64::EPSILON {
            cost / self.total_project_cost * 100.0
        } else {
            0.0
        }
    }

    /// `"100.0 m²"` style area text
    pub fn area_display(&self) -> String {
        format!("{:.1} {}", self.total_area, self.area_unit.symbol())
    }
}

/// Something that turns a report into a document.
pub trait ReportExporter {
    /// File extension of the produced document, without the dot
    fn extension(&self) -> &'static str;

    fn export(&self, report: &ReportData) -> EstimateResult<Vec<u8>>;
}

/// Pretty-printed JSON of the report itself
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl ReportExporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, report: &ReportData) -> EstimateResult<Vec<u8>> {
        serde_json::to_vec_pretty(report).map_err(crate::errors::EstimateError::serialization)
    }
}
