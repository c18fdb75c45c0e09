//! Plain-text tables for the terminal.

use std::collections::BTreeMap;

use boq_core::catalog;
use boq_core::currency::{format_currency, format_quantity};
use boq_core::estimate::{Estimate, EstimateInputs};
use boq_core::file_io::SavedPlan;
use boq_core::project::{Overrides, ProjectSettings};
use boq_core::report::ReportData;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

fn heading(title: &str) {
    println!("{RULE}");
    println!("  {title}");
    println!("{RULE}");
}

pub fn print_estimate(estimate: &Estimate, inputs: &EstimateInputs, report: &ReportData) {
    let code = &inputs.settings.currency;
    let summary = &estimate.calibrated.summary;

    heading("PROJECT COST ESTIMATE");
    println!();
    println!("Plan:");
    if let Some(name) = &report.file_name {
        println!("  File:         {name}");
    }
    println!("  Area:         {}", report.area_display());
    println!("  Walls:        {:.1} m x {:.2} m thick", summary.total_wall_length_m, summary.wall_thickness_m);
    println!("  Wall height:  {} m", inputs.settings.wall_height_m);
    println!(
        "  Openings:     {} doors, {} windows",
        estimate.calibrated.elements.doors, estimate.calibrated.elements.windows
    );
    println!("  Rooms:        {}", report.room_count);
    println!();

    println!("Cost by category:");
    for c in &report.consolidated_report {
        println!(
            "  {:<28} {:>16}  {:>5.1}%",
            c.bucket.label(),
            format_currency(c.cost, code),
            report.share_percent(c.cost)
        );
    }
    println!();

    if !estimate.rooms.is_empty() {
        println!("Rooms:");
        for room in &estimate.rooms {
            println!(
                "  {:<28} {:<12} {:>16}",
                room.room_name,
                room.room_type.label(),
                format_currency(room.total_cost, code)
            );
        }
        println!();
    }

    println!("Bill of quantities:");
    for line in &report.boq {
        let mark = if line.custom_quantity || line.custom_rate { "*" } else { " " };
        println!(
            " {mark}{:<36} {:>12} {:<6} @ {:>10}  {:>16}",
            line.name,
            format_quantity(line.quantity),
            line.unit,
            format_currency(line.unit_rate, code),
            format_currency(line.total_cost, code)
        );
    }
    if report.boq.iter().any(|l| l.custom_quantity || l.custom_rate) {
        println!("  (* custom quantity or rate)");
    }
    println!();

    heading(&format!("TOTAL: {}", format_currency(estimate.total_project_cost, code)));
}

pub fn print_catalog(custom_rates: &BTreeMap<String, f64>) {
    println!(
        "{:<18} {:<36} {:<10} {:>10} {:>10}",
        "ID", "MATERIAL", "UNIT", "DEFAULT", "RATE"
    );
    for m in catalog::all() {
        let rate = custom_rates.get(m.id).copied().unwrap_or(m.default_rate);
        let mark = if custom_rates.contains_key(m.id) { "*" } else { "" };
        println!(
            "{:<18} {:<36} {:<10} {:>10.2} {:>10.2}{mark}",
            m.id, m.name, m.unit, m.default_rate, rate
        );
    }
}

pub fn print_settings(settings: &ProjectSettings, overrides: &Overrides) {
    println!("Currency:     {}", settings.currency);
    println!("Wall height:  {} m", settings.wall_height_m);
    println!("Brick size:   {:?}", settings.brick_size);

    if !overrides.custom_rates.is_empty() {
        println!();
        println!("Custom rates:");
        for (id, rate) in &overrides.custom_rates {
            println!("  {id:<18} {rate}");
        }
    }
    if !overrides.custom_quantities.is_empty() {
        println!();
        println!("Custom quantities:");
        for (id, qty) in &overrides.custom_quantities {
            println!("  {id:<18} {qty}");
        }
    }
}

pub fn print_plans(plans: &[SavedPlan]) {
    if plans.is_empty() {
        println!("No saved plans.");
        return;
    }
    for plan in plans {
        let cost = plan
            .cost_estimation
            .as_ref()
            .map(|r| format_currency(r.total_project_cost, &r.settings.currency))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {:<32} {:>16}",
            plan.id,
            plan.created_at.format("%Y-%m-%d %H:%M"),
            plan.file_name,
            cost
        );
    }
}
