//! # Room Finishing Quantities
//!
//! Finishing and services takeoff for a single room. The room type picks
//! exactly one finishing schedule; electrical points are added to every room.
//!
//! | Type                        | Floor            | Walls / counters            | Fixtures                               |
//! |-----------------------------|------------------|-----------------------------|----------------------------------------|
//! | Bathroom                    | anti-skid ×1.10  | 7 ft wall tile              | EWC, basin, tap set, 5 plumbing pts, door |
//! | Kitchen                     | vitrified ×1.10  | granite + dado on ½ perimeter | sink, tap, 3 plumbing pts            |
//! | Bedroom/Living/Dining/other | vitrified ×1.05  | putty, primer, emulsion     | Bedroom: flush door                    |
//!
//! All working dimensions are converted to feet first; tile, paint coverage
//! and counters are bought by the foot.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::analysis::{Room, RoomType};
//! use boq_core::calculations::{calculate_room, Pricing};
//! use boq_core::project::ProjectSettings;
//!
//! let bath = Room::new("Bath", RoomType::Bathroom, 5.0).with_perimeter(9.0);
//! let cost = calculate_room(&bath, &ProjectSettings::default(), &Pricing::catalog());
//! assert_eq!(cost.material("flooring_antiskid").unwrap().quantity, 60.0);
//! assert_eq!(cost.material("wall_tiles_bath").unwrap().quantity, 207.0);
//! ```

use super::{ceil_qty, total_cost, Line, Pricing, RoomCost};
use crate::analysis::{Room, RoomType};
use crate::catalog::MaterialCategory::{Finishing, Interiors, Services};
use crate::project::ProjectSettings;
use crate::units::{Feet, Meters, SqFt};

/// Bathroom wall tiling height (ft)
const BATH_TILE_HEIGHT_FT: f64 = 7.0;

/// Kitchen counter runs along half the perimeter (L-shape)
const COUNTER_PERIMETER_SHARE: f64 = 0.5;

/// Counter depth (ft)
const COUNTER_DEPTH_FT: f64 = 2.5;

/// Dado height above the counter (ft)
const DADO_HEIGHT_FT: f64 = 2.0;

/// Share of wall area left to paint after doors and windows
const PAINTABLE_WALL_SHARE: f64 = 0.85;

/// Coverage per unit, in ft² (putty per kg, primer and emulsion per litre)
const PUTTY_SQFT_PER_KG: f64 = 14.0;
const PRIMER_SQFT_PER_L: f64 = 140.0;
const EMULSION_SQFT_PER_L: f64 = 120.0;

/// Wiring-plus-switch points per room type
pub fn electrical_points(room_type: RoomType) -> f64 {
    match room_type {
        RoomType::Bedroom => 8.0,
        RoomType::Living => 12.0,
        RoomType::Kitchen => 6.0,
        RoomType::Bathroom => 3.0,
        _ => 4.0,
    }
}

/// Unpriced lines for one room, in report order.
pub fn room_lines(room: &Room, wall_height_m: f64) -> Vec<Line> {
    let area = SqFt::from(room.area()).value();
    let perimeter = Feet::from(room.perimeter());
    let wall_area = (perimeter * Feet::from(Meters(wall_height_m))).value();
    let perimeter = perimeter.value();

    let mut lines = Vec::with_capacity(8);
    match room.room_type {
        RoomType::Bathroom => {
            lines.push(Line::new(
                "flooring_antiskid",
                Finishing,
                "Anti-Skid Floor Tiles",
                "Sq. Ft",
                ceil_qty(area * 1.1),
            ));
            lines.push(Line::new(
                "wall_tiles_bath",
                Finishing,
                "Wall Tiles (Ceramic)",
                "Sq. Ft",
                ceil_qty(perimeter * BATH_TILE_HEIGHT_FT),
            ));
            lines.push(Line::new("wc_ewc", Services, "EWC / Commode", "Nos", 1.0));
            lines.push(Line::new("wash_basin", Services, "Wash Basin", "Nos", 1.0));
            lines.push(Line::new("taps_mixer", Services, "Taps & Mixers (Set)", "Set", 1.0));
            // WC, basin, two shower, geyser
            lines.push(Line::new(
                "plumbing_point",
                Services,
                "Plumbing Points (Inlet/Outlet)",
                "Pts",
                5.0,
            ));
            lines.push(Line::new("door_toilet", Finishing, "PVC/WPC Door", "Nos", 1.0));
        }
        RoomType::Kitchen => {
            let counter = perimeter * COUNTER_PERIMETER_SHARE;
            lines.push(Line::new(
                "flooring_vitrified",
                Finishing,
                "Vitrified Floor Tiles",
                "Sq. Ft",
                ceil_qty(area * 1.1),
            ));
            lines.push(Line::new(
                "granite",
                Interiors,
                "Granite Countertop",
                "Sq. Ft",
                ceil_qty(counter * COUNTER_DEPTH_FT),
            ));
            lines.push(Line::new(
                "wall_tiles_kitchen",
                Finishing,
                "Dado Wall Tiles",
                "Sq. Ft",
                ceil_qty(counter * DADO_HEIGHT_FT),
            ));
            lines.push(Line::new("kitchen_sink", Services, "SS Sink", "Nos", 1.0));
            lines.push(Line::new("taps_mixer", Services, "Sink Mixer/Tap", "Nos", 1.0));
            // sink, RO, dishwasher
            lines.push(Line::new("plumbing_point", Services, "Plumbing Points", "Pts", 3.0));
        }
        RoomType::Bedroom
        | RoomType::Living
        | RoomType::Dining
        | RoomType::Corridor
        | RoomType::Other => {
            // Walls net of openings, plus the ceiling
            let paint_area = wall_area * PAINTABLE_WALL_SHARE + area;
            lines.push(Line::new(
                "flooring_vitrified",
                Finishing,
                "Vitrified Floor Tiles",
                "Sq. Ft",
                ceil_qty(area * 1.05),
            ));
            lines.push(Line::new(
                "putty",
                Finishing,
                "Wall Putty (2 Coats)",
                "Kg",
                ceil_qty(paint_area / PUTTY_SQFT_PER_KG),
            ));
            lines.push(Line::new(
                "primer",
                Finishing,
                "Primer",
                "Liters",
                ceil_qty(paint_area / PRIMER_SQFT_PER_L),
            ));
            lines.push(Line::new(
                "paint_emulsion",
                Finishing,
                "Emulsion Paint",
                "Liters",
                ceil_qty(paint_area / EMULSION_SQFT_PER_L),
            ));
            if room.room_type == RoomType::Bedroom {
                lines.push(Line::new(
                    "door_flush",
                    Finishing,
                    "Flush Door (Laminate)",
                    "Nos",
                    1.0,
                ));
            }
        }
    }

    lines.push(Line::new(
        "electrical_point",
        Services,
        "Electrical Points (Wiring+Switch)",
        "Pts",
        electrical_points(room.room_type),
    ));
    lines
}

/// Calculate the priced finishing schedule for one (calibrated) room.
pub fn calculate_room(room: &Room, settings: &ProjectSettings, pricing: &Pricing<'_>) -> RoomCost {
    let materials: Vec<_> = room_lines(room, settings.wall_height_m)
        .into_iter()
        .map(|line| pricing.price(line))
        .collect();

    RoomCost {
        room_name: room.display_name(),
        room_type: room.room_type,
        total_cost: total_cost(&materials),
        materials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ids(cost: &RoomCost) -> Vec<&str> {
        cost.materials.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_bathroom_schedule() {
        let bath = Room::new("Bath", RoomType::Bathroom, 5.0).with_perimeter(9.0);
        let cost = calculate_room(&bath, &ProjectSettings::default(), &Pricing::catalog());

        assert_eq!(
            ids(&cost),
            [
                "flooring_antiskid",
                "wall_tiles_bath",
                "wc_ewc",
                "wash_basin",
                "taps_mixer",
                "plumbing_point",
                "door_toilet",
                "electrical_point",
            ]
        );
        assert_eq!(cost.material("flooring_antiskid").unwrap().quantity, 60.0);
        assert_eq!(cost.material("wall_tiles_bath").unwrap().quantity, 207.0);
        assert_eq!(cost.material("plumbing_point").unwrap().quantity, 5.0);
        assert_eq!(cost.material("electrical_point").unwrap().quantity, 3.0);
    }

    #[test]
    fn test_kitchen_schedule() {
        let kitchen = Room::new("Kitchen", RoomType::Kitchen, 9.0).with_perimeter(12.0);
        let cost = calculate_room(&kitchen, &ProjectSettings::default(), &Pricing::catalog());

        // 12 m = 39.37 ft, counter 19.685 ft
        assert_eq!(cost.material("flooring_vitrified").unwrap().quantity, 107.0);
        assert_eq!(cost.material("granite").unwrap().quantity, 50.0);
        assert_eq!(cost.material("wall_tiles_kitchen").unwrap().quantity, 40.0);
        assert_eq!(cost.material("taps_mixer").unwrap().name, "Sink Mixer/Tap");
        assert_eq!(cost.material("plumbing_point").unwrap().quantity, 3.0);
        assert_eq!(cost.material("electrical_point").unwrap().quantity, 6.0);
        assert!(cost.material("putty").is_none());
    }

    #[test]
    fn test_bedroom_gets_paint_and_door() {
        let bedroom = Room::new("Master Bedroom", RoomType::Bedroom, 16.0).with_perimeter(16.0);
        let cost = calculate_room(&bedroom, &ProjectSettings::default(), &Pricing::catalog());

        // wall 52.49 ft × 9.84 ft = 516.68 ft², paint 439.18 + 172.22 = 611.40
        assert_eq!(cost.material("flooring_vitrified").unwrap().quantity, 181.0);
        assert_eq!(cost.material("putty").unwrap().quantity, 44.0);
        assert_eq!(cost.material("primer").unwrap().quantity, 5.0);
        assert_eq!(cost.material("paint_emulsion").unwrap().quantity, 6.0);
        assert_eq!(cost.material("door_flush").unwrap().quantity, 1.0);
        assert_eq!(cost.material("electrical_point").unwrap().quantity, 8.0);
    }

    #[test]
    fn test_living_and_other_rooms_have_no_door() {
        let settings = ProjectSettings::default();
        for (room_type, points) in [
            (RoomType::Living, 12.0),
            (RoomType::Dining, 4.0),
            (RoomType::Corridor, 4.0),
            (RoomType::Other, 4.0),
        ] {
            let room = Room::new("", room_type, 10.0);
            let cost = calculate_room(&room, &settings, &Pricing::catalog());
            assert!(cost.material("door_flush").is_none());
            assert_eq!(cost.material("electrical_point").unwrap().quantity, points);
            assert_eq!(cost.room_name, room_type.label());
        }
    }

    #[test]
    fn test_missing_perimeter_uses_square_estimate() {
        let settings = ProjectSettings::default();
        let measured = Room::new("Bath", RoomType::Bathroom, 9.0).with_perimeter(12.0);
        let estimated = Room::new("Bath", RoomType::Bathroom, 9.0);
        assert_eq!(
            calculate_room(&measured, &settings, &Pricing::catalog()),
            calculate_room(&estimated, &settings, &Pricing::catalog())
        );
    }

    #[test]
    fn test_room_total_is_sum_of_lines() {
        let mut rates = BTreeMap::new();
        rates.insert("electrical_point".to_string(), 1000.0);
        let room = Room::new("Living", RoomType::Living, 24.0).with_perimeter(20.0);
        let cost = calculate_room(&room, &ProjectSettings::default(), &Pricing::with_rates(&rates));

        let sum: f64 = cost.materials.iter().map(|m| m.total_cost).sum();
        assert_eq!(cost.total_cost, sum);
        assert_eq!(cost.material("electrical_point").unwrap().total_cost, 12_000.0);
    }

    #[test]
    fn test_zero_area_room_keeps_fixed_items() {
        let room = Room::new("Cupboard", RoomType::Bathroom, 0.0);
        let cost = calculate_room(&room, &ProjectSettings::default(), &Pricing::catalog());
        assert_eq!(cost.material("flooring_antiskid").unwrap().quantity, 0.0);
        assert_eq!(cost.material("wc_ewc").unwrap().quantity, 1.0);
    }
}
