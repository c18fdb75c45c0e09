//! # Rate Catalog
//!
//! Static lookup of every material the estimator can emit: default unit rate
//! (INR), purchase unit, native category and the reporting bucket the item
//! rolls up into.
//!
//! Reporting buckets are stored on each entry rather than inferred from the
//! material id at report time. [`ReportBucket::infer`] still implements the
//! keyword rule so that ids arriving from outside the catalog (custom
//! quantities for ad-hoc items) land somewhere sensible, and so the tags below
//! can be checked against it.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::catalog::{self, MaterialCategory, ReportBucket};
//!
//! let cement = catalog::lookup("cement").unwrap();
//! assert_eq!(cement.default_rate, 390.0);
//! assert_eq!(cement.category, MaterialCategory::Structure);
//! assert_eq!(cement.bucket, ReportBucket::CivilStructure);
//!
//! // Unknown ids price at zero rather than failing
//! assert_eq!(catalog::default_rate("gold_leaf"), 0.0);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Native category of a material, as a quantity surveyor would file it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    /// Load-bearing skeleton: cement, sand, aggregate, bricks
    Structure,
    /// Reinforcement steel
    Reinforcement,
    /// Interior fit-out: tiles, paint, doors, windows
    Finishing,
    /// Plumbing, sanitary and electrical
    Services,
    /// Joinery and stone work (countertops)
    Interiors,
}

impl MaterialCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MaterialCategory::Structure => "Structure",
            MaterialCategory::Reinforcement => "Reinforcement",
            MaterialCategory::Finishing => "Finishing",
            MaterialCategory::Services => "Services",
            MaterialCategory::Interiors => "Interiors",
        }
    }
}

impl std::fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Simplified bucket used by the consolidated cost report.
///
/// Declaration order is the tie-break order when two buckets cost the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportBucket {
    #[serde(rename = "Civil Structure")]
    CivilStructure,
    #[serde(rename = "Flooring & Tiling")]
    FlooringTiling,
    #[serde(rename = "Painting & Finish")]
    PaintingFinish,
    #[serde(rename = "Doors & Windows")]
    DoorsWindows,
    #[serde(rename = "Electrical & Plumbing")]
    ElectricalPlumbing,
    /// Finishing items that match none of the finishing sub-buckets
    Finishing,
    /// Ids with no catalog entry
    Other,
}

impl ReportBucket {
    /// All buckets in report order
    pub const ALL: [ReportBucket; 7] = [
        ReportBucket::CivilStructure,
        ReportBucket::FlooringTiling,
        ReportBucket::PaintingFinish,
        ReportBucket::DoorsWindows,
        ReportBucket::ElectricalPlumbing,
        ReportBucket::Finishing,
        ReportBucket::Other,
    ];

    /// Human-readable bucket name (also the serialized form)
    pub fn label(&self) -> &'static str {
        match self {
            ReportBucket::CivilStructure => "Civil Structure",
            ReportBucket::FlooringTiling => "Flooring & Tiling",
            ReportBucket::PaintingFinish => "Painting & Finish",
            ReportBucket::DoorsWindows => "Doors & Windows",
            ReportBucket::ElectricalPlumbing => "Electrical & Plumbing",
            ReportBucket::Finishing => "Finishing",
            ReportBucket::Other => "Other",
        }
    }

    /// Parse a bucket from its label (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(wanted))
    }

    /// Keyword rule used by earlier reports: category first, then id
    /// substrings for finishing items.
    pub fn infer(id: &str, category: Option<MaterialCategory>) -> Self {
        match category {
            Some(MaterialCategory::Structure) | Some(MaterialCategory::Reinforcement) => {
                ReportBucket::CivilStructure
            }
            Some(MaterialCategory::Finishing) => {
                let id = id.to_ascii_lowercase();
                let has = |keys: &[&str]| keys.iter().any(|k| id.contains(k));
                if has(&["floor", "tile", "granite"]) {
                    ReportBucket::FlooringTiling
                } else if has(&["paint", "putty", "primer"]) {
                    ReportBucket::PaintingFinish
                } else if has(&["door", "window"]) {
                    ReportBucket::DoorsWindows
                } else {
                    ReportBucket::Finishing
                }
            }
            Some(MaterialCategory::Services) => ReportBucket::ElectricalPlumbing,
            Some(MaterialCategory::Interiors) => ReportBucket::FlooringTiling,
            None => ReportBucket::Other,
        }
    }
}

impl std::fmt::Display for ReportBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub category: MaterialCategory,
    /// Default unit rate in INR
    pub default_rate: f64,
    pub bucket: ReportBucket,
}

const fn def(
    id: &'static str,
    name: &'static str,
    unit: &'static str,
    category: MaterialCategory,
    default_rate: f64,
    bucket: ReportBucket,
) -> MaterialDefinition {
    MaterialDefinition {
        id,
        name,
        unit,
        category,
        default_rate,
        bucket,
    }
}

use MaterialCategory as C;
use ReportBucket as B;

/// The full material catalog, in display order.
pub static MATERIAL_CATALOG: [MaterialDefinition; 22] = [
    // Structure
    def("cement", "Cement (Ultratech/ACC)", "Bags", C::Structure, 390.0, B::CivilStructure),
    def("steel", "TMT Steel Bars (Fe550)", "Kg", C::Reinforcement, 72.0, B::CivilStructure),
    def("sand", "M-Sand / River Sand", "Cubic Ft", C::Structure, 65.0, B::CivilStructure),
    def("aggregate", "Aggregate (20mm)", "Cubic Ft", C::Structure, 45.0, B::CivilStructure),
    def("bricks", "Red Clay Bricks", "Nos", C::Structure, 10.0, B::CivilStructure),
    // Flooring & wall
    def("flooring_vitrified", "Vitrified Floor Tiles", "Sq. Ft", C::Finishing, 65.0, B::FlooringTiling),
    def("flooring_antiskid", "Anti-Skid Floor Tiles", "Sq. Ft", C::Finishing, 55.0, B::FlooringTiling),
    def("wall_tiles_bath", "Wall Tiles (Ceramic)", "Sq. Ft", C::Finishing, 50.0, B::FlooringTiling),
    def("wall_tiles_kitchen", "Dado Wall Tiles", "Sq. Ft", C::Finishing, 60.0, B::FlooringTiling),
    def("granite", "Granite Countertop", "Sq. Ft", C::Interiors, 180.0, B::FlooringTiling),
    // Paint
    def("putty", "Wall Putty (2 Coats)", "Kg", C::Finishing, 30.0, B::PaintingFinish),
    def("primer", "Primer", "Liters", C::Finishing, 220.0, B::PaintingFinish),
    def("paint_emulsion", "Emulsion Paint", "Liters", C::Finishing, 350.0, B::PaintingFinish),
    // Fixtures
    def("door_flush", "Flush Door (Laminate)", "Nos", C::Finishing, 8000.0, B::DoorsWindows),
    def("door_toilet", "PVC/WPC Door", "Nos", C::Finishing, 4500.0, B::DoorsWindows),
    def("window_upvc", "UPVC Windows", "Sq. Ft", C::Finishing, 600.0, B::DoorsWindows),
    // Plumbing / sanitary
    def("wc_ewc", "EWC / Commode", "Nos", C::Services, 12000.0, B::ElectricalPlumbing),
    def("wash_basin", "Wash Basin", "Nos", C::Services, 4000.0, B::ElectricalPlumbing),
    def("kitchen_sink", "SS Sink", "Nos", C::Services, 6000.0, B::ElectricalPlumbing),
    def("taps_mixer", "Taps & Mixers (Set)", "Set", C::Services, 3500.0, B::ElectricalPlumbing),
    def("plumbing_point", "Plumbing Points", "Pts", C::Services, 1500.0, B::ElectricalPlumbing),
    // Electrical
    def("electrical_point", "Electrical Points", "Pts", C::Services, 850.0, B::ElectricalPlumbing),
];

static BY_ID: Lazy<HashMap<&'static str, &'static MaterialDefinition>> =
    Lazy::new(|| MATERIAL_CATALOG.iter().map(|m| (m.id, m)).collect());

/// All catalog entries in display order
pub fn all() -> &'static [MaterialDefinition] {
    &MATERIAL_CATALOG
}

/// Look up a material by id
pub fn lookup(id: &str) -> Option<&'static MaterialDefinition> {
    BY_ID.get(id).copied()
}

/// Default rate for a material id.
///
/// Unknown ids resolve to 0 so one bad id never sinks a whole estimate, but
/// they are logged: an unpriced line in a BOQ is almost always a data bug.
pub fn default_rate(id: &str) -> f64 {
    match lookup(id) {
        Some(m) => m.default_rate,
        None => {
            warn!(material_id = %id, "no catalog rate for material; pricing at 0");
            0.0
        }
    }
}

/// Reporting bucket for any id, catalog or not
pub fn bucket_for(id: &str) -> ReportBucket {
    lookup(id).map_or(ReportBucket::Other, |m| m.bucket)
}

/// Display name for any id; ad-hoc ids are upper-cased with dashes spaced
pub fn display_name(id: &str) -> String {
    match lookup(id) {
        Some(m) => m.name.to_string(),
        None => id.replace('-', " ").to_uppercase(),
    }
}

/// Purchase unit for any id, "-" when unknown
pub fn unit_for(id: &str) -> &'static str {
    lookup(id).map_or("-", |m| m.unit)
}
