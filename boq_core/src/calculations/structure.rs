//! # Structural Quantities
//!
//! Thumb-rule takeoff of the structural materials for the whole plan, from
//! wall geometry and built-up area.
//!
//! ## Method
//!
//! ```text
//! gross wall volume   = wall length × wall height × thickness
//! opening volume      = (doors × 1.89 m² + windows × 1.8 m²) × thickness
//!                        (door 0.9 × 2.1 m, window 1.2 × 1.5 m)
//! net brickwork       = max(0, gross − openings)
//! concrete            = built-up area × 0.17 m³/m²  (slab + beams + columns)
//! plaster (two faces) = wall length × wall height × 2 × 0.015 m
//!
//! bricks     = ⌈net × 500⌉
//! cement     = ⌈net × 1.26 + concrete × 8.0 + plaster × 0.15 × 28⌉  bags
//! steel      = ⌈area_ft² × 3.5⌉                                      kg
//! sand       = ⌈net × 6 + concrete × 15 + plaster × 1.2 × 35⌉        ft³
//! aggregate  = ⌈concrete × 30⌉                                       ft³
//! ```
//!
//! `⌈…⌉` is [`ceil_qty`](super::ceil_qty), which ignores sub-micro float noise.
//!
//! The coefficients are empirical and must stay exactly as written; estimates
//! already issued were produced with them.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary};
//! use boq_core::calculations::structure::StructuralTakeoff;
//!
//! let plan = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 100.0, total_wall_length_m: 80.0, wall_thickness_m: 0.15 },
//!     rooms: vec![],
//!     elements: PlanElements { doors: 4, windows: 8 },
//! };
//! let takeoff = StructuralTakeoff::measure(&plan, 3.0);
//! assert_eq!(takeoff.bricks, 16353.0);
//! ```

use serde::{Deserialize, Serialize};

use super::{ceil_qty, Line, MaterialItem, Pricing};
use crate::analysis::AnalysisResult;
use crate::catalog::MaterialCategory;
use crate::project::ProjectSettings;
use crate::units::{CuM, SqFt, SqM};

/// Bricks per m³ of brickwork, mortar included
pub const BRICKS_PER_CU_M: f64 = 500.0;

/// Reinforcement per ft² of built-up area (kg)
pub const STEEL_KG_PER_SQFT: f64 = 3.5;

/// RCC volume per m² of built-up area (m³)
pub const CONCRETE_CU_M_PER_SQ_M: f64 = 0.17;

/// Door opening face area, 0.9 m × 2.1 m
pub const DOOR_OPENING_SQ_M: f64 = 1.89;

/// Window opening face area, 1.2 m × 1.5 m
pub const WINDOW_OPENING_SQ_M: f64 = 1.8;

/// Plaster thickness per face (m)
const PLASTER_THICKNESS_M: f64 = 0.015;

/// Intermediate volumes and final raw quantities for the structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuralTakeoff {
    pub gross_wall_volume_m3: f64,
    pub opening_volume_m3: f64,
    pub net_brickwork_volume_m3: f64,
    pub concrete_volume_m3: f64,
    pub cement_bags: f64,
    pub steel_kg: f64,
    pub sand_cft: f64,
    pub aggregate_cft: f64,
    pub bricks: f64,
}

impl StructuralTakeoff {
    /// Measure a plan at the given wall height (m).
    pub fn measure(plan: &AnalysisResult, wall_height_m: f64) -> Self {
        let s = &plan.summary;
        let wall_length = s.total_wall_length_m;
        let thickness = s.wall_thickness_m;

        let gross = CuM(wall_length * wall_height_m * thickness);
        let openings = CuM(
            (f64::from(plan.elements.doors) * DOOR_OPENING_SQ_M
                + f64::from(plan.elements.windows) * WINDOW_OPENING_SQ_M)
                * thickness,
        );
        let net = (gross - openings).value().max(0.0);
        let concrete = s.total_area_sq_m * CONCRETE_CU_M_PER_SQ_M;
        let area_sqft = SqFt::from(SqM(s.total_area_sq_m));

        // Two-face plaster area times thickness, shared by cement and sand
        let plaster = wall_length * wall_height_m * 2.0 * PLASTER_THICKNESS_M;

        StructuralTakeoff {
            gross_wall_volume_m3: gross.value(),
            opening_volume_m3: openings.value(),
            net_brickwork_volume_m3: net,
            concrete_volume_m3: concrete,
            bricks: ceil_qty(net * BRICKS_PER_CU_M),
            cement_bags: ceil_qty(net * 1.26 + concrete * 8.0 + plaster * 0.15 * 28.0),
            steel_kg: ceil_qty(area_sqft.value() * STEEL_KG_PER_SQFT),
            sand_cft: ceil_qty(net * 6.0 + concrete * 15.0 + plaster * 1.2 * 35.0),
            aggregate_cft: ceil_qty(concrete * 30.0),
        }
    }

    /// Unpriced lines in report order
    pub fn lines(&self) -> [Line; 5] {
        use MaterialCategory::{Reinforcement, Structure};
        [
            Line::new("cement", Structure, "Cement (Ultratech/ACC)", "Bags", self.cement_bags),
            Line::new("steel", Reinforcement, "TMT Steel Bars (Fe550)", "Kg", self.steel_kg),
            Line::new("sand", Structure, "M-Sand / River Sand", "Cubic Ft", self.sand_cft),
            Line::new("aggregate", Structure, "Aggregate (20mm)", "Cubic Ft", self.aggregate_cft),
            Line::new("bricks", Structure, "Red Clay Bricks", "Nos", self.bricks),
        ]
    }
}

/// Calculate the five structural BOQ lines for a plan.
///
/// Output order is cement, steel, sand, aggregate, bricks.
pub fn calculate_structure(
    plan: &AnalysisResult,
    settings: &ProjectSettings,
    pricing: &Pricing<'_>,
) -> Vec<MaterialItem> {
    StructuralTakeoff::measure(plan, settings.wall_height_m)
        .lines()
        .into_iter()
        .map(|line| pricing.price(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PlanElements, PlanSummary};
    use crate::calculations::total_cost;
    use std::collections::BTreeMap;

    fn reference_plan() -> AnalysisResult {
        AnalysisResult {
            summary: PlanSummary {
                total_area_sq_m: 100.0,
                total_wall_length_m: 80.0,
                wall_thickness_m: 0.15,
            },
            rooms: vec![],
            elements: PlanElements { doors: 4, windows: 8 },
        }
    }

    #[test]
    fn test_reference_volumes() {
        let t = StructuralTakeoff::measure(&reference_plan(), 3.0);
        assert!((t.gross_wall_volume_m3 - 36.0).abs() < 1e-9);
        assert!((t.opening_volume_m3 - 3.294).abs() < 1e-9);
        assert!((t.net_brickwork_volume_m3 - 32.706).abs() < 1e-9);
        assert!((t.concrete_volume_m3 - 17.0).abs() < 1e-9);
        assert_eq!(t.bricks, 16353.0);
    }

    #[test]
    fn test_reference_quantities() {
        let t = StructuralTakeoff::measure(&reference_plan(), 3.0);
        // 32.706×1.26 + 17×8 + 7.2×0.15×28 = 41.21 + 136 + 30.24 = 207.45
        assert_eq!(t.cement_bags, 208.0);
        // 1076.39 × 3.5 = 3767.365
        assert_eq!(t.steel_kg, 3768.0);
        // 32.706×6 + 17×15 + 7.2×1.2×35 = 196.236 + 255 + 302.4 = 753.636
        assert_eq!(t.sand_cft, 754.0);
        assert_eq!(t.aggregate_cft, 510.0);
    }

    #[test]
    fn test_openings_larger_than_walls_clamp_to_zero() {
        let mut plan = reference_plan();
        plan.summary.total_wall_length_m = 1.0;
        plan.elements.doors = 50;
        let t = StructuralTakeoff::measure(&plan, 3.0);
        assert_eq!(t.net_brickwork_volume_m3, 0.0);
        assert_eq!(t.bricks, 0.0);
    }

    #[test]
    fn test_items_use_catalog_and_custom_rates() {
        let plan = reference_plan();
        let settings = ProjectSettings::default();
        let mut rates = BTreeMap::new();
        rates.insert("bricks".to_string(), 12.0);

        let items = calculate_structure(&plan, &settings, &Pricing::with_rates(&rates));
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["cement", "steel", "sand", "aggregate", "bricks"]);

        let bricks = &items[4];
        assert_eq!(bricks.unit_rate, 12.0);
        assert_eq!(bricks.total_cost, 16353.0 * 12.0);
        assert_eq!(items[0].unit_rate, 390.0);

        for item in &items {
            assert_eq!(item.total_cost, item.quantity * item.unit_rate);
        }
        assert!(total_cost(&items) > 0.0);
    }

    #[test]
    fn test_wall_height_drives_brickwork() {
        let plan = reference_plan();
        let low = StructuralTakeoff::measure(&plan, 2.7);
        let high = StructuralTakeoff::measure(&plan, 3.3);
        assert!(high.bricks > low.bricks);
        assert_eq!(high.steel_kg, low.steel_kg);
    }
}
