//! # Project Estimate
//!
//! Runs the whole pipeline from raw analysis to priced, consolidated BOQ:
//!
//! ```text
//! raw AnalysisResult ──calibrate──▶ calibrated plan
//!                                     │
//!                     structure + rooms (unscaled)
//!                                     │
//!                    calculated quantities per id ──▶ scaling factors
//!                                     │                 (custom / calculated)
//!                     structure + rooms (scaled) ◀──────┘
//!                                     │
//!          union(calculated ids, custom ids) ──▶ BOQ lines ──▶ total
//!                                                     └─────▶ category report
//! ```
//!
//! A custom quantity is a project-wide figure for one material. It is spread
//! over every place the material occurs (structure and each room) by scaling
//! each occurrence with the same factor, so the per-room drill-down and the
//! project line agree.
//!
//! The total and the category report are summed from the same BOQ lines, so
//! the report always adds up to the total.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary};
//! use boq_core::estimate::{Estimate, EstimateInputs};
//!
//! let raw = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 100.0, total_wall_length_m: 80.0, wall_thickness_m: 0.15 },
//!     rooms: vec![],
//!     elements: PlanElements { doors: 4, windows: 8 },
//! };
//! let mut inputs = EstimateInputs::new(raw);
//! inputs.overrides.set_quantity("bricks", 20_000.0);
//!
//! let estimate = Estimate::compute(&inputs);
//! assert_eq!(estimate.line("bricks").unwrap().quantity, 20_000.0);
//! assert_eq!(estimate.line("bricks").unwrap().total_cost, 200_000.0);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::calculations::{calculate_room, calculate_structure, MaterialItem, Pricing, RoomCost};
use crate::calibration::{calibrate_input, AreaUnit};
use crate::catalog::{self, ReportBucket};
use crate::project::{Overrides, ProjectSettings};

/// Calculated quantities at or below this are treated as zero when deriving
/// a scaling factor.
pub const SCALING_EPSILON: f64 = 1e-4;

/// Everything an estimate depends on. Two equal inputs give equal estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateInputs {
    /// Analysis exactly as the service returned it
    pub raw: AnalysisResult,

    /// Target area text as entered (blank means uncalibrated)
    #[serde(default)]
    pub calibration_input: String,

    #[serde(default)]
    pub unit: AreaUnit,

    #[serde(default)]
    pub settings: ProjectSettings,

    #[serde(default)]
    pub overrides: Overrides,
}

impl EstimateInputs {
    /// Uncalibrated inputs with default settings and no overrides
    pub fn new(raw: AnalysisResult) -> Self {
        EstimateInputs {
            raw,
            calibration_input: String::new(),
            unit: AreaUnit::default(),
            settings: ProjectSettings::default(),
            overrides: Overrides::default(),
        }
    }
}

/// One consolidated project BOQ line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqLine {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub bucket: ReportBucket,
    pub quantity: f64,
    pub unit_rate: f64,
    pub total_cost: f64,
    /// Quantity came from a user override
    pub custom_quantity: bool,
    /// Rate came from a user override
    pub custom_rate: bool,
}

/// Cost rolled up into one reporting bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub bucket: ReportBucket,
    pub cost: f64,
}

/// A fully priced estimate. Built fresh from [`EstimateInputs`]; never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    /// The plan after calibration
    pub calibrated: AnalysisResult,

    /// Structural lines with scaling applied
    pub structure: Vec<MaterialItem>,

    /// Per-room schedules with scaling applied
    pub rooms: Vec<RoomCost>,

    /// Unscaled quantity per material id, summed over structure and rooms
    pub calculated_quantities: BTreeMap<String, f64>,

    /// `custom / calculated` for each id where both exist
    pub scaling_factors: BTreeMap<String, f64>,

    /// Project BOQ, one line per material id, ordered by id
    pub lines: Vec<BoqLine>,

    /// Cost per bucket, highest first
    pub consolidated_report: Vec<CategoryCost>,

    pub total_project_cost: f64,
}

impl Estimate {
    /// Run the full pipeline. Never fails: invalid calibration text leaves the
    /// plan uncalibrated and unknown material ids price at zero.
    pub fn compute(inputs: &EstimateInputs) -> Self {
        let EstimateInputs {
            raw,
            calibration_input,
            unit,
            settings,
            overrides,
        } = inputs;

        let calibrated = calibrate_input(raw, calibration_input, *unit);

        // Unscaled pass, custom rates only
        let unscaled = Pricing::with_rates(&overrides.custom_rates);
        let base_structure = calculate_structure(&calibrated, settings, &unscaled);
        let base_rooms: Vec<RoomCost> = calibrated
            .rooms
            .iter()
            .map(|room| calculate_room(room, settings, &unscaled))
            .collect();
        let calculated_quantities = sum_quantities(
            base_structure
                .iter()
                .chain(base_rooms.iter().flat_map(|r| r.materials.iter())),
        );

        let scaling_factors = scaling_factors(&calculated_quantities, &overrides.custom_quantities);

        let pricing = unscaled.scaled_by(&scaling_factors);
        let structure = calculate_structure(&calibrated, settings, &pricing);
        let rooms: Vec<RoomCost> = calibrated
            .rooms
            .iter()
            .map(|room| calculate_room(room, settings, &pricing))
            .collect();

        let lines = boq_lines(&calculated_quantities, overrides);
        let total_project_cost = lines.iter().map(|l| l.total_cost).sum();
        let consolidated_report = consolidate(&lines);

        Estimate {
            calibrated,
            structure,
            rooms,
            calculated_quantities,
            scaling_factors,
            lines,
            consolidated_report,
            total_project_cost,
        }
    }

    /// Look up a BOQ line by material id
    pub fn line(&self, id: &str) -> Option<&BoqLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// The project BOQ as presented: lines with a quantity, most expensive first
    pub fn boq(&self) -> Vec<&BoqLine> {
        let mut boq: Vec<&BoqLine> = self.lines.iter().filter(|l| l.quantity > 0.0).collect();
        boq.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost));
        boq
    }

    /// Every scaled structure and room line that rolls up into `bucket`
    pub fn bucket_materials(&self, bucket: ReportBucket) -> Vec<&MaterialItem> {
        self.structure
            .iter()
            .chain(self.rooms.iter().flat_map(|r| r.materials.iter()))
            .filter(|item| item.bucket() == bucket)
            .collect()
    }

    /// Cost of one bucket (0 when the bucket is empty)
    pub fn bucket_cost(&self, bucket: ReportBucket) -> f64 {
        self.consolidated_report
            .iter()
            .find(|c| c.bucket == bucket)
            .map(|c| c.cost)
            .unwrap_or(0.0)
    }

    /// Structural share of the total
    pub fn structure_cost(&self) -> f64 {
        crate::calculations::total_cost(&self.structure)
    }
}

fn sum_quantities<'a>(items: impl Iterator<Item = &'a MaterialItem>) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.id.clone()).or_insert(0.0) += item.quantity;
    }
    totals
}

/// Factors that stretch each calculated quantity onto its custom total.
fn scaling_factors(
    calculated: &BTreeMap<String, f64>,
    custom: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut factors = BTreeMap::new();
    for (id, target) in custom {
        match calculated.get(id) {
            Some(calc) if *calc > SCALING_EPSILON => {
                factors.insert(id.clone(), target / calc);
            }
            calc => {
                debug!(
                    material_id = %id,
                    calculated = calc.copied().unwrap_or(0.0),
                    custom = *target,
                    "custom quantity has nothing to scale; leaving occurrences unchanged"
                );
            }
        }
    }
    factors
}

fn boq_lines(calculated: &BTreeMap<String, f64>, overrides: &Overrides) -> Vec<BoqLine> {
    let ids: BTreeSet<&String> = calculated
        .keys()
        .chain(overrides.custom_quantities.keys())
        .collect();

    ids.into_iter()
        .map(|id| {
            let custom_qty = overrides.quantity(id);
            let custom_rate = overrides.rate(id);
            let quantity = custom_qty
                .or_else(|| calculated.get(id).copied())
                .unwrap_or(0.0);
            let unit_rate = custom_rate.unwrap_or_else(|| catalog::default_rate(id));
            BoqLine {
                id: id.clone(),
                name: catalog::display_name(id),
                unit: catalog::unit_for(id).to_string(),
                bucket: catalog::bucket_for(id),
                quantity,
                unit_rate,
                total_cost: quantity * unit_rate,
                custom_quantity: custom_qty.is_some(),
                custom_rate: custom_rate.is_some(),
            }
        })
        .collect()
}

fn consolidate(lines: &[BoqLine]) -> Vec<CategoryCost> {
    let mut by_bucket: BTreeMap<ReportBucket, f64> = BTreeMap::new();
    for line in lines {
        *by_bucket.entry(line.bucket).or_insert(0.0) += line.total_cost;
    }
    let mut report: Vec<CategoryCost> = by_bucket
        .into_iter()
        .map(|(bucket, cost)| CategoryCost { bucket, cost })
        .collect();
    // Stable sort keeps bucket order on ties
    report.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    report
}
