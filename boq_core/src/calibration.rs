//! # Area Calibration
//!
//! The vision service reads dimensions off a drawing whose scale it has to
//! guess, so its areas are often off by a constant factor. The user types the
//! true built-up area and every plan dimension is rescaled to match:
//!
//! ```text
//! scale = sqrt(target_area / raw_area)
//! lengths   × scale      (wall length, room perimeters)
//! areas     × scale²     (room areas)
//! thickness unchanged    (a wall is as thick as it is, whatever the drawing scale)
//! ```
//!
//! Calibration is always applied to the raw analysis, never to an already
//! calibrated one, so repeated edits of the target never compound.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary, Room, RoomType};
//! use boq_core::calibration::{calibrate, AreaUnit};
//!
//! let raw = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 80.0, total_wall_length_m: 60.0, wall_thickness_m: 0.23 },
//!     rooms: vec![Room::new("Bed 1", RoomType::Bedroom, 20.0)],
//!     elements: PlanElements::default(),
//! };
//!
//! let calibrated = calibrate(&raw, Some(100.0), AreaUnit::SqM);
//! assert_eq!(calibrated.summary.total_area_sq_m, 100.0);
//! assert!((calibrated.rooms[0].area_sq_m - 25.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::{AnalysisResult, Room};
use crate::units::{SqFt, SqM, SQFT_PER_SQM};

/// Largest target area accepted, in m² (100 ha). Anything above is treated
/// as a typo and leaves the plan uncalibrated.
pub const MAX_TARGET_AREA_SQ_M: f64 = 1.0e6;

/// Unit the user entered the target area in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    #[default]
    SqM,
    SqFt,
}

impl AreaUnit {
    /// Convert a value in this unit to square metres
    pub fn to_sq_m(self, value: f64) -> f64 {
        match self {
            AreaUnit::SqM => value,
            AreaUnit::SqFt => SqM::from(SqFt(value)).0,
        }
    }

    /// Express a square-metre value in this unit
    pub fn from_sq_m(self, sq_m: f64) -> f64 {
        match self {
            AreaUnit::SqM => sq_m,
            AreaUnit::SqFt => SqFt::from(SqM(sq_m)).0,
        }
    }

    /// Short unit symbol for display
    pub fn symbol(self) -> &'static str {
        match self {
            AreaUnit::SqM => "m²",
            AreaUnit::SqFt => "ft²",
        }
    }

    /// Rewrite an entered area when the user flips the unit selector.
    ///
    /// Blank or unparsable text is returned untouched. Converted values are
    /// rounded to one decimal place, as the entry field shows them.
    pub fn convert_input(text: &str, from: AreaUnit, to: AreaUnit) -> String {
        let value = match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return text.to_string(),
        };
        let converted = match (from, to) {
            (AreaUnit::SqM, AreaUnit::SqFt) => value * SQFT_PER_SQM,
            (AreaUnit::SqFt, AreaUnit::SqM) => value / SQFT_PER_SQM,
            _ => return text.to_string(),
        };
        format!("{converted:.1}")
    }
}

impl std::str::FromStr for AreaUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqm" | "m2" | "m²" | "sq.m" => Ok(AreaUnit::SqM),
            "sqft" | "ft2" | "ft²" | "sq.ft" => Ok(AreaUnit::SqFt),
            other => Err(format!("unknown area unit '{other}' (expected sqm or sqft)")),
        }
    }
}

impl std::fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaUnit::SqM => write!(f, "sqm"),
            AreaUnit::SqFt => write!(f, "sqft"),
        }
    }
}

/// Parse the target-area text field.
///
/// Returns `None` for anything that should leave the plan uncalibrated:
/// blank, non-numeric, NaN, infinite, zero or negative.
pub fn parse_target_area(text: &str) -> Option<f64> {
    let value = text.trim().parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// The text the target field is pre-filled with after a fresh analysis
pub fn default_target_input(raw: &AnalysisResult, unit: AreaUnit) -> String {
    format!("{:.1}", unit.from_sq_m(raw.summary.total_area_sq_m))
}

/// Scale factor that maps the raw plan onto `target_sq_m`, if one exists
pub fn scale_factor(raw: &AnalysisResult, target_sq_m: f64) -> Option<f64> {
    let raw_area = raw.summary.total_area_sq_m;
    if !(target_sq_m.is_finite() && target_sq_m > 0.0) {
        return None;
    }
    if !(raw_area.is_finite() && raw_area > 0.0) {
        warn!(raw_area, "analysis has no usable total area; skipping calibration");
        return None;
    }
    Some((target_sq_m / raw_area).sqrt())
}

/// Calibrate a raw analysis to a user-asserted total area.
///
/// `target` is in `unit`; `None` or an invalid value returns a copy of the
/// raw analysis unchanged. The calibrated total area is exactly the target
/// (converted to m²), not `raw × scale²`, so it carries no rounding noise.
pub fn calibrate(raw: &AnalysisResult, target: Option<f64>, unit: AreaUnit) -> AnalysisResult {
    let target_sq_m = match target {
        Some(t) if t.is_finite() && t > 0.0 => unit.to_sq_m(t),
        _ => return raw.clone(),
    };
    if target_sq_m > MAX_TARGET_AREA_SQ_M {
        warn!(target_sq_m, max = MAX_TARGET_AREA_SQ_M, "target area out of range; skipping calibration");
        return raw.clone();
    }
    let scale = match scale_factor(raw, target_sq_m) {
        Some(s) => s,
        None => return raw.clone(),
    };

    let mut calibrated = raw.clone();
    calibrated.summary.total_area_sq_m = target_sq_m;
    calibrated.summary.total_wall_length_m = raw.summary.total_wall_length_m * scale;
    calibrated.rooms = raw.rooms.iter().map(|r| scale_room(r, scale)).collect();
    calibrated
}

/// Calibrate straight from the text field contents
pub fn calibrate_input(raw: &AnalysisResult, target_text: &str, unit: AreaUnit) -> AnalysisResult {
    calibrate(raw, parse_target_area(target_text), unit)
}

fn scale_room(room: &Room, scale: f64) -> Room {
    Room {
        name: room.name.clone(),
        room_type: room.room_type,
        area_sq_m: room.area_sq_m * (scale * scale),
        // Fallback is taken on the raw area, then scaled like any length
        perimeter_m: Some(room.effective_perimeter_m() * scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PlanElements, PlanSummary, RoomType};

    fn raw_80() -> AnalysisResult {
        AnalysisResult {
            summary: PlanSummary {
                total_area_sq_m: 80.0,
                total_wall_length_m: 60.0,
                wall_thickness_m: 0.23,
            },
            rooms: vec![
                Room::new("Bed 1", RoomType::Bedroom, 20.0).with_perimeter(18.0),
                Room::new("Store", RoomType::Other, 4.0),
            ],
            elements: PlanElements { doors: 3, windows: 4 },
        }
    }

    #[test]
    fn test_scale_to_target_area() {
        let raw = raw_80();
        let cal = calibrate(&raw, Some(100.0), AreaUnit::SqM);
        let scale = (100.0f64 / 80.0).sqrt();
        assert!((scale - 1.118).abs() < 1e-3);

        assert_eq!(cal.summary.total_area_sq_m, 100.0);
        assert!((cal.summary.total_wall_length_m - 60.0 * scale).abs() < 1e-9);
        assert_eq!(cal.summary.wall_thickness_m, 0.23);
        assert!((cal.rooms[0].area_sq_m - 25.0).abs() < 1e-9);
        assert!((cal.rooms[0].perimeter_m.unwrap() - 18.0 * scale).abs() < 1e-9);
        assert_eq!(cal.elements, raw.elements);
    }

    #[test]
    fn test_missing_perimeter_uses_raw_fallback_then_scales() {
        let cal = calibrate(&raw_80(), Some(100.0), AreaUnit::SqM);
        let scale = (100.0f64 / 80.0).sqrt();
        // 4·sqrt(4) = 8 on the raw plan
        assert!((cal.rooms[1].perimeter_m.unwrap() - 8.0 * scale).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_targets_are_identity() {
        let raw = raw_80();
        for target in [None, Some(0.0), Some(-5.0), Some(f64::NAN), Some(f64::INFINITY)] {
            assert_eq!(calibrate(&raw, target, AreaUnit::SqM), raw);
        }
        assert_eq!(calibrate_input(&raw, "", AreaUnit::SqM), raw);
        assert_eq!(calibrate_input(&raw, "abc", AreaUnit::SqM), raw);
        assert_eq!(calibrate_input(&raw, "  ", AreaUnit::SqFt), raw);
    }

    #[test]
    fn test_zero_raw_area_is_identity() {
        let mut raw = raw_80();
        raw.summary.total_area_sq_m = 0.0;
        assert_eq!(calibrate(&raw, Some(100.0), AreaUnit::SqM), raw);
    }

    #[test]
    fn test_oversized_target_is_identity() {
        let raw = raw_80();
        assert_eq!(calibrate_input(&raw, "1e308", AreaUnit::SqM), raw);
        assert_eq!(calibrate(&raw, Some(MAX_TARGET_AREA_SQ_M * 2.0), AreaUnit::SqM), raw);

        let at_limit = calibrate(&raw, Some(MAX_TARGET_AREA_SQ_M), AreaUnit::SqM);
        assert_eq!(at_limit.summary.total_area_sq_m, MAX_TARGET_AREA_SQ_M);
    }

    #[test]
    fn test_sqft_target_converted() {
        let raw = raw_80();
        let cal = calibrate(&raw, Some(1076.39), AreaUnit::SqFt);
        assert!((cal.summary.total_area_sq_m - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_target_for_many_values() {
        let raw = raw_80();
        for target in [0.5, 1.0, 33.3, 79.99, 80.0, 123.456, 5000.0] {
            let cal = calibrate(&raw, Some(target), AreaUnit::SqM);
            assert_eq!(cal.summary.total_area_sq_m, target);
        }
    }

    #[test]
    fn test_calibration_keys_off_raw_baseline() {
        let raw = raw_80();
        let once = calibrate(&raw, Some(120.0), AreaUnit::SqM);
        let again = calibrate(&raw, Some(120.0), AreaUnit::SqM);
        assert_eq!(once, again);

        // Same target on its own output is a unit scale
        let reapplied = calibrate(&once, Some(120.0), AreaUnit::SqM);
        assert_eq!(reapplied, once);

        let chained = calibrate(&once, Some(150.0), AreaUnit::SqM);
        let direct = calibrate(&raw, Some(150.0), AreaUnit::SqM);
        assert_eq!(chained.summary.total_area_sq_m, direct.summary.total_area_sq_m);
        assert!((chained.rooms[0].area_sq_m - direct.rooms[0].area_sq_m).abs() < 1e-9);
    }

    #[test]
    fn test_parse_target_area() {
        assert_eq!(parse_target_area(" 100.5 "), Some(100.5));
        assert_eq!(parse_target_area("0"), None);
        assert_eq!(parse_target_area("-1"), None);
        assert_eq!(parse_target_area("NaN"), None);
        assert_eq!(parse_target_area(""), None);
    }

    #[test]
    fn test_unit_toggle_rewrites_input() {
        assert_eq!(AreaUnit::convert_input("100", AreaUnit::SqM, AreaUnit::SqFt), "1076.4");
        assert_eq!(AreaUnit::convert_input("1076.4", AreaUnit::SqFt, AreaUnit::SqM), "100.0");
        assert_eq!(AreaUnit::convert_input("", AreaUnit::SqM, AreaUnit::SqFt), "");
        assert_eq!(AreaUnit::convert_input("100", AreaUnit::SqM, AreaUnit::SqM), "100");
    }

    #[test]
    fn test_default_target_input() {
        let raw = raw_80();
        assert_eq!(default_target_input(&raw, AreaUnit::SqM), "80.0");
        assert_eq!(default_target_input(&raw, AreaUnit::SqFt), "861.1");
    }

    #[test]
    fn test_area_unit_parse() {
        assert_eq!("SQFT".parse::<AreaUnit>().unwrap(), AreaUnit::SqFt);
        assert_eq!("m2".parse::<AreaUnit>().unwrap(), AreaUnit::SqM);
        assert!("acres".parse::<AreaUnit>().is_err());
    }
}
