//! # Quantity Calculations
//!
//! The two quantity calculators and the priced line item they both emit.
//! Each calculator follows the same pattern:
//!
//! - takes a (calibrated) plan or room, the project settings and a [`Pricing`]
//! - derives raw quantities with fixed empirical coefficients
//! - returns priced [`MaterialItem`]s
//!
//! Nothing here fails and nothing is mutated; calling again with the same
//! inputs gives the same output.
//!
//! ## Available Calculations
//!
//! - [`structure`] - Global structural materials (cement, steel, sand, aggregate, bricks)
//! - [`room`] - Per-room finishing and services by room type

pub mod room;
pub mod structure;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::RoomType;
use crate::catalog::{self, MaterialCategory, ReportBucket};

// Re-export commonly used items
pub use room::calculate_room;
pub use structure::{calculate_structure, StructuralTakeoff};

static NO_OVERRIDES: BTreeMap<String, f64> = BTreeMap::new();

/// Rate and quantity adjustments applied while pricing line items.
///
/// Rates resolve as custom override, then catalog default, then 0. Quantity
/// scaling carries the project-level custom quantities down to each
/// occurrence of a material (see the `estimate` module).
#[derive(Debug, Clone, Copy)]
pub struct Pricing<'a> {
    custom_rates: &'a BTreeMap<String, f64>,
    scaling: &'a BTreeMap<String, f64>,
}

impl Default for Pricing<'_> {
    fn default() -> Self {
        Pricing::catalog()
    }
}

impl<'a> Pricing<'a> {
    /// Catalog rates, no adjustments
    pub fn catalog() -> Pricing<'static> {
        Pricing {
            custom_rates: &NO_OVERRIDES,
            scaling: &NO_OVERRIDES,
        }
    }

    /// Custom rates on top of the catalog, quantities as calculated
    pub fn with_rates(custom_rates: &'a BTreeMap<String, f64>) -> Self {
        Pricing {
            custom_rates,
            scaling: &NO_OVERRIDES,
        }
    }

    /// Add per-material quantity scaling factors
    pub fn scaled_by(self, scaling: &'a BTreeMap<String, f64>) -> Self {
        Pricing { scaling, ..self }
    }

    /// Effective unit rate for a material
    pub fn rate(&self, id: &str) -> f64 {
        match self.custom_rates.get(id) {
            Some(rate) => *rate,
            None => catalog::default_rate(id),
        }
    }

    /// Scaling factor for a material (1 when none applies)
    pub fn factor(&self, id: &str) -> f64 {
        self.scaling.get(id).copied().unwrap_or(1.0)
    }

    /// Price one calculated line
    pub fn price(&self, line: Line) -> MaterialItem {
        let quantity = line.quantity * self.factor(line.id);
        let unit_rate = self.rate(line.id);
        MaterialItem {
            id: line.id.to_string(),
            category: line.category,
            name: line.name.to_string(),
            unit: line.unit.to_string(),
            quantity,
            unit_rate,
            total_cost: quantity * unit_rate,
        }
    }
}

/// An unpriced calculated quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub id: &'static str,
    pub category: MaterialCategory,
    pub name: &'static str,
    pub unit: &'static str,
    pub quantity: f64,
}

impl Line {
    pub const fn new(
        id: &'static str,
        category: MaterialCategory,
        name: &'static str,
        unit: &'static str,
        quantity: f64,
    ) -> Self {
        Line {
            id,
            category,
            name,
            unit,
            quantity,
        }
    }
}

/// One priced BOQ line.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": "bricks",
///   "category": "Structure",
///   "name": "Red Clay Bricks",
///   "unit": "Nos",
///   "quantity": 16353.0,
///   "unitRate": 10.0,
///   "totalCost": 163530.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    pub id: String,
    pub category: MaterialCategory,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_rate: f64,
    /// Always `quantity * unit_rate`
    pub total_cost: f64,
}

impl MaterialItem {
    /// Reporting bucket for this line
    pub fn bucket(&self) -> ReportBucket {
        catalog::lookup(&self.id)
            .map(|m| m.bucket)
            .unwrap_or_else(|| ReportBucket::infer(&self.id, Some(self.category)))
    }
}

/// Finishing and services cost for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCost {
    pub room_name: String,
    pub room_type: RoomType,
    pub total_cost: f64,
    pub materials: Vec<MaterialItem>,
}

impl RoomCost {
    /// Find a line in this room by material id
    pub fn material(&self, id: &str) -> Option<&MaterialItem> {
        self.materials.iter().find(|m| m.id == id)
    }
}

/// Round a raw quantity up to whole purchase units.
///
/// Values within 1e-6 of an integer are snapped first, so `32.706 × 500`
/// (16353.000000000002 in binary floating point) buys 16353 bricks, not 16354.
pub fn ceil_qty(raw: f64) -> f64 {
    let snapped = (raw * 1e6).round() / 1e6;
    snapped.ceil()
}

/// Sum of `total_cost` over a set of lines
pub fn total_cost(items: &[MaterialItem]) -> f64 {
    items.iter().map(|i| i.total_cost).sum()
}
