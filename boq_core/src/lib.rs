//! # boq_core - Floor Plan Quantity and Cost Engine
//!
//! `boq_core` turns the geometric summary of a floor plan (as read by an AI
//! vision service) into a priced bill of quantities for a residential build:
//! structural materials for the whole plan, finishing and services per room,
//! user overrides layered on top, and a cost report by category. All inputs
//! and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: estimates are pure functions of [`estimate::EstimateInputs`]
//! - **JSON-First**: every public type implements Serialize/Deserialize
//! - **Total**: calculations never fail; bad calibration text, missing
//!   perimeters and unknown material ids all have defined fallbacks
//! - **Rich Errors**: the I/O edges return structured [`EstimateError`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use boq_core::analysis::AnalysisResult;
//! use boq_core::estimate::{Estimate, EstimateInputs};
//!
//! let raw: AnalysisResult = serde_json::from_str(r#"{
//!     "summary": { "totalAreaSqM": 100, "totalWallLengthM": 80, "wallThicknessM": 0.15 },
//!     "rooms": [ { "name": "Bath", "type": "Bathroom", "areaSqM": 5, "perimeterM": 9 } ],
//!     "elements": { "doors": 4, "windows": 8 }
//! }"#).unwrap();
//!
//! let mut inputs = EstimateInputs::new(raw);
//! inputs.calibration_input = "110".to_string();
//! inputs.overrides.set_rate("cement", 420.0);
//!
//! let estimate = Estimate::compute(&inputs);
//! assert!(estimate.total_project_cost > 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`analysis`] - Analysis result, rooms and plan elements
//! - [`catalog`] - Material ids, default rates, units and report buckets
//! - [`calibration`] - Rescaling a plan to a user-asserted area
//! - [`calculations`] - Structural and per-room quantity calculators
//! - [`estimate`] - Overrides, scaling and consolidation into a BOQ
//! - [`session`] - Mutable working state with memoized recomputation
//! - [`project`] - Project settings and overrides
//! - [`analysis_service`] - Seam to the AI analysis service
//! - [`file_io`] - Settings and saved-plan storage with atomic saves and locking
//! - [`report`], [`pdf`] - Report snapshot and PDF export
//! - [`currency`] - Display formatting for amounts
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types

pub mod analysis;
pub mod analysis_service;
pub mod calculations;
pub mod calibration;
pub mod catalog;
pub mod currency;
pub mod errors;
pub mod estimate;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod pdf;
pub mod project;
pub mod report;
pub mod session;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use analysis::{AnalysisResult, Room, RoomType};
pub use errors::{EstimateError, EstimateResult};
pub use estimate::{Estimate, EstimateInputs};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{JsonFileStore, PlanStore, SavedPlan, SettingsStore};
pub use project::{Overrides, ProjectSettings, SettingsSnapshot};
pub use session::Session;
