//! # Floor Plan Analysis
//!
//! The geometric summary produced by the AI vision service for one uploaded
//! plan. Field names on the wire are camelCase, exactly as the service emits
//! them, so a response body deserializes straight into [`AnalysisResult`].
//!
//! An analysis is an immutable baseline: calibration and every quantity are
//! derived from it and it is only ever replaced wholesale.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "summary": { "totalAreaSqM": 100.0, "totalWallLengthM": 80.0, "wallThicknessM": 0.15 },
//!   "rooms": [
//!     { "name": "Master Bedroom", "type": "Bedroom", "areaSqM": 16.0, "perimeterM": 16.0 },
//!     { "name": "Bath", "type": "Bathroom", "areaSqM": 5.0 }
//!   ],
//!   "elements": { "doors": 4, "windows": 8 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::units::{Meters, SqM};

/// Whole-plan summary figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    /// Total built-up area (m²)
    pub total_area_sq_m: f64,
    /// Total running length of walls (m)
    pub total_wall_length_m: f64,
    /// Typical wall thickness (m), usually 0.15 - 0.23
    pub wall_thickness_m: f64,
}

/// Counted openings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanElements {
    #[serde(deserialize_with = "count_from_number")]
    pub doors: u32,
    #[serde(deserialize_with = "count_from_number")]
    pub windows: u32,
}

/// The service types counts as plain JSON numbers, so `4.0` must read as 4.
fn count_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "count must be a non-negative number, got {raw}"
        )));
    }
    Ok(raw.round() as u32)
}

/// Room classification used to pick the finishing schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Bedroom,
    Kitchen,
    Bathroom,
    Living,
    Dining,
    Corridor,
    #[serde(other)]
    Other,
}

impl RoomType {
    pub const ALL: [RoomType; 7] = [
        RoomType::Bedroom,
        RoomType::Kitchen,
        RoomType::Bathroom,
        RoomType::Living,
        RoomType::Dining,
        RoomType::Corridor,
        RoomType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RoomType::Bedroom => "Bedroom",
            RoomType::Kitchen => "Kitchen",
            RoomType::Bathroom => "Bathroom",
            RoomType::Living => "Living",
            RoomType::Dining => "Dining",
            RoomType::Corridor => "Corridor",
            RoomType::Other => "Other",
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One room as detected on the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub room_type: RoomType,

    pub area_sq_m: f64,

    /// Measured perimeter. The service is asked for it but does not always
    /// return one; see [`Room::effective_perimeter_m`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perimeter_m: Option<f64>,
}

impl Room {
    pub fn new(name: impl Into<String>, room_type: RoomType, area_sq_m: f64) -> Self {
        Room {
            name: name.into(),
            room_type,
            area_sq_m,
            perimeter_m: None,
        }
    }

    pub fn with_perimeter(mut self, perimeter_m: f64) -> Self {
        self.perimeter_m = Some(perimeter_m);
        self
    }

    /// The measured perimeter, if it is usable
    pub fn measured_perimeter_m(&self) -> Option<f64> {
        self.perimeter_m.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Perimeter to calculate with.
    ///
    /// Falls back to `4·√area`, the perimeter of a square room of the same
    /// area. It is an approximation and is kept as-is for parity with
    /// existing estimates.
    pub fn effective_perimeter_m(&self) -> f64 {
        self.measured_perimeter_m()
            .unwrap_or_else(|| fallback_perimeter_m(self.area_sq_m))
    }

    pub fn area(&self) -> SqM {
        SqM(self.area_sq_m)
    }

    pub fn perimeter(&self) -> Meters {
        Meters(self.effective_perimeter_m())
    }

    /// Name shown in reports: the plan label, or the room type when unlabeled
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.room_type.label().to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Square-room perimeter estimate for a given area
pub fn fallback_perimeter_m(area_sq_m: f64) -> f64 {
    area_sq_m.max(0.0).sqrt() * 4.0
}

/// Full analysis result for one floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: PlanSummary,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub elements: PlanElements,
}

impl AnalysisResult {
    /// Number of rooms detected
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Sum of the individual room areas (m²). Usually a little below
    /// `summary.total_area_sq_m`, which includes wall footprint.
    pub fn rooms_area_sq_m(&self) -> f64 {
        self.rooms.iter().map(|r| r.area_sq_m).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_service_json() {
        let json = r#"{
            "summary": { "totalAreaSqM": 100.0, "totalWallLengthM": 80.0, "wallThicknessM": 0.15 },
            "rooms": [
                { "name": "Master Bedroom", "type": "Bedroom", "areaSqM": 16.0, "perimeterM": 16.0 },
                { "name": "Bath", "type": "Bathroom", "areaSqM": 5.0 }
            ],
            "elements": { "doors": 4, "windows": 8 }
        }"#;
        let analysis: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.summary.total_wall_length_m, 80.0);
        assert_eq!(analysis.rooms[0].room_type, RoomType::Bedroom);
        assert_eq!(analysis.rooms[1].perimeter_m, None);
        assert_eq!(analysis.elements.windows, 8);
    }

    #[test]
    fn test_counts_accept_float_numbers() {
        let elements: PlanElements = serde_json::from_str(r#"{ "doors": 4.0, "windows": 7 }"#).unwrap();
        assert_eq!(elements, PlanElements { doors: 4, windows: 7 });
        assert!(serde_json::from_str::<PlanElements>(r#"{ "doors": -1, "windows": 0 }"#).is_err());
    }

    #[test]
    fn test_unknown_room_type_is_other() {
        let json = r#"{ "name": "Pooja", "type": "Prayer", "areaSqM": 3.0 }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room.room_type, RoomType::Other);
    }

    #[test]
    fn test_fallback_perimeter() {
        let room = Room::new("Store", RoomType::Other, 16.0);
        assert_eq!(room.effective_perimeter_m(), 16.0);

        // Zero and non-finite perimeters are treated as missing
        let zero = Room::new("Store", RoomType::Other, 9.0).with_perimeter(0.0);
        assert_eq!(zero.effective_perimeter_m(), 12.0);
        let nan = Room::new("Store", RoomType::Other, 9.0).with_perimeter(f64::NAN);
        assert_eq!(nan.effective_perimeter_m(), 12.0);

        let measured = Room::new("Hall", RoomType::Corridor, 9.0).with_perimeter(15.0);
        assert_eq!(measured.effective_perimeter_m(), 15.0);
    }

    #[test]
    fn test_display_name_falls_back_to_type() {
        assert_eq!(Room::new("", RoomType::Dining, 10.0).display_name(), "Dining");
        assert_eq!(Room::new("Study", RoomType::Other, 10.0).display_name(), "Study");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let plan = fixtures::sample_plan();
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"totalAreaSqM\":100.0"));
        assert!(json.contains("\"type\":\"Kitchen\""));
        let roundtrip: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, roundtrip);
    }
}
