//! # Estimating Session
//!
//! The mutable state a user works on between recomputations: the raw
//! analysis, the calibration field, settings and overrides. The estimate is
//! a pure function of that state and is recomputed on demand; the session
//! remembers the last result together with the exact inputs that produced it.
//!
//! ## Analysis requests
//!
//! An analysis call is asynchronous and may be overtaken by a newer one. Each
//! request takes a ticket from [`Session::begin_analysis`]; only the outcome
//! carrying the latest ticket is applied. A failed analysis leaves the
//! previous plan in place.
//!
//! ```rust
//! use boq_core::analysis::{AnalysisResult, PlanElements, PlanSummary};
//! use boq_core::session::Session;
//!
//! let plan = AnalysisResult {
//!     summary: PlanSummary { total_area_sq_m: 80.0, total_wall_length_m: 60.0, wall_thickness_m: 0.23 },
//!     rooms: vec![],
//!     elements: PlanElements::default(),
//! };
//!
//! let mut session = Session::new();
//! let first = session.begin_analysis();
//! let second = session.begin_analysis();
//! assert!(session.complete_analysis(first, Ok(plan.clone())).is_err());
//! session.complete_analysis(second, Ok(plan)).unwrap();
//! assert_eq!(session.calibration_input(), "80.0");
//! assert!(session.estimate().is_some());
//! ```

use tracing::{debug, info, warn};

use crate::analysis::AnalysisResult;
use crate::calibration::{default_target_input, AreaUnit};
use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{Estimate, EstimateInputs};
use crate::project::{Overrides, ProjectSettings, SettingsSnapshot};

/// Handle for one in-flight analysis request
pub type AnalysisTicket = u64;

#[derive(Debug, Default)]
pub struct Session {
    raw: Option<AnalysisResult>,
    calibration_input: String,
    unit: AreaUnit,
    settings: ProjectSettings,
    overrides: Overrides,

    issued: AnalysisTicket,
    last_error: Option<EstimateError>,

    memo: Option<(EstimateInputs, Estimate)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from persisted settings
    pub fn with_snapshot(snapshot: &SettingsSnapshot) -> Self {
        let mut session = Self::new();
        session.apply_snapshot(snapshot);
        session
    }

    // ------------------------------------------------------------------
    // Analysis lifecycle
    // ------------------------------------------------------------------

    /// Register a new analysis request. Any request still in flight is
    /// superseded.
    pub fn begin_analysis(&mut self) -> AnalysisTicket {
        self.issued += 1;
        self.last_error = None;
        debug!(ticket = self.issued, "analysis requested");
        self.issued
    }

    /// Whether `ticket` is the latest issued request
    pub fn is_current(&self, ticket: AnalysisTicket) -> bool {
        ticket == self.issued
    }

    /// Apply the outcome of an analysis request.
    ///
    /// Stale tickets are rejected without touching any state. A failed
    /// outcome is recorded as the last error and returned; the current plan
    /// stays. A successful one replaces the plan and pre-fills the
    /// calibration field with its area in the selected unit.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: EstimateResult<AnalysisResult>,
    ) -> EstimateResult<()> {
        if !self.is_current(ticket) {
            debug!(ticket, latest = self.issued, "discarding stale analysis outcome");
            return Err(EstimateError::AnalysisSuperseded {
                ticket,
                latest: self.issued,
            });
        }

        match outcome {
            Ok(analysis) => {
                info!(
                    ticket,
                    rooms = analysis.room_count(),
                    area_sq_m = analysis.summary.total_area_sq_m,
                    "analysis applied"
                );
                self.calibration_input = default_target_input(&analysis, self.unit);
                self.raw = Some(analysis);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(ticket, error = %err, "analysis failed; keeping previous plan");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Drop the current plan (a new file was chosen). Settings and overrides
    /// are kept.
    pub fn clear_analysis(&mut self) {
        self.raw = None;
        self.calibration_input.clear();
        self.last_error = None;
    }

    pub fn raw_analysis(&self) -> Option<&AnalysisResult> {
        self.raw.as_ref()
    }

    /// Error from the most recent analysis request, if it failed
    pub fn last_error(&self) -> Option<&EstimateError> {
        self.last_error.as_ref()
    }

    // ------------------------------------------------------------------
    // Calibration
    // ------------------------------------------------------------------

    pub fn calibration_input(&self) -> &str {
        &self.calibration_input
    }

    pub fn set_calibration_input(&mut self, text: impl Into<String>) {
        self.calibration_input = text.into();
    }

    pub fn unit(&self) -> AreaUnit {
        self.unit
    }

    /// Switch the area unit, converting the entered value along with it
    pub fn set_unit(&mut self, unit: AreaUnit) {
        self.calibration_input = AreaUnit::convert_input(&self.calibration_input, self.unit, unit);
        self.unit = unit;
    }

    // ------------------------------------------------------------------
    // Settings and overrides
    // ------------------------------------------------------------------

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ProjectSettings) {
        self.settings = settings;
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn set_rate(&mut self, id: impl Into<String>, rate: f64) {
        self.overrides.set_rate(id, rate);
    }

    pub fn set_quantity(&mut self, id: impl Into<String>, quantity: f64) {
        self.overrides.set_quantity(id, quantity);
    }

    pub fn clear_rate(&mut self, id: &str) -> Option<f64> {
        self.overrides.clear_rate(id)
    }

    pub fn clear_quantity(&mut self, id: &str) -> Option<f64> {
        self.overrides.clear_quantity(id)
    }

    /// Layer a fetched snapshot over the in-memory state
    pub fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) {
        snapshot.apply_to(&mut self.settings, &mut self.overrides);
    }

    /// Everything that should be persisted
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot::capture(&self.settings, &self.overrides)
    }

    // ------------------------------------------------------------------
    // Estimate
    // ------------------------------------------------------------------

    /// Current inputs, or `None` before any analysis has been applied
    pub fn inputs(&self) -> Option<EstimateInputs> {
        let raw = self.raw.as_ref()?;
        Some(EstimateInputs {
            raw: raw.clone(),
            calibration_input: self.calibration_input.clone(),
            unit: self.unit,
            settings: self.settings.clone(),
            overrides: self.overrides.clone(),
        })
    }

    /// The estimate for the current state. Recomputed only when an input
    /// changed since the last call.
    pub fn estimate(&mut self) -> Option<&Estimate> {
        let inputs = self.inputs()?;
        let fresh = match &self.memo {
            Some((cached, _)) => *cached != inputs,
            None => true,
        };
        if fresh {
            let estimate = Estimate::compute(&inputs);
            self.memo = Some((inputs, estimate));
        }
        self.memo.as_ref().map(|(_, estimate)| estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::sample_plan;

    fn analysed() -> Session {
        let mut session = Session::new();
        let ticket = session.begin_analysis();
        session.complete_analysis(ticket, Ok(sample_plan())).unwrap();
        session
    }

    #[test]
    fn test_no_estimate_before_analysis() {
        let mut session = Session::new();
        assert!(session.estimate().is_none());
        assert!(session.inputs().is_none());
    }

    #[test]
    fn test_success_prefills_calibration() {
        let session = analysed();
        assert_eq!(session.calibration_input(), "100.0");
        assert!(session.raw_analysis().is_some());
    }

    #[test]
    fn test_prefill_uses_selected_unit() {
        let mut session = Session::new();
        session.set_unit(AreaUnit::SqFt);
        let ticket = session.begin_analysis();
        session.complete_analysis(ticket, Ok(sample_plan())).unwrap();
        assert_eq!(session.calibration_input(), "1076.4");
    }

    #[test]
    fn test_failure_keeps_previous_plan() {
        let mut session = analysed();
        session.set_calibration_input("120");
        let before = session.raw_analysis().cloned();

        let ticket = session.begin_analysis();
        let err = session
            .complete_analysis(ticket, Err(EstimateError::analysis_transient("timeout")))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(session.raw_analysis().cloned(), before);
        assert_eq!(session.calibration_input(), "120");
        assert!(session.last_error().is_some());
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut session = analysed();
        let old = session.begin_analysis();
        let new = session.begin_analysis();

        let mut other = sample_plan();
        other.summary.total_area_sq_m = 55.0;
        let err = session.complete_analysis(old, Ok(other)).unwrap_err();
        assert_eq!(err, EstimateError::AnalysisSuperseded { ticket: old, latest: new });
        assert_eq!(session.raw_analysis().unwrap().summary.total_area_sq_m, 100.0);

        // A stale failure is not recorded either
        let _ = session.complete_analysis(old, Err(EstimateError::analysis_permanent("bad")));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_unit_toggle_converts_input() {
        let mut session = analysed();
        session.set_unit(AreaUnit::SqFt);
        assert_eq!(session.calibration_input(), "1076.4");
        session.set_unit(AreaUnit::SqM);
        assert_eq!(session.calibration_input(), "100.0");
    }

    #[test]
    fn test_estimate_is_memoized_until_inputs_change() {
        let mut session = analysed();
        let first = session.estimate().cloned().unwrap();
        let again = session.estimate().cloned().unwrap();
        assert_eq!(first, again);

        session.set_rate("cement", 500.0);
        let repriced = session.estimate().cloned().unwrap();
        assert!(repriced.total_project_cost > first.total_project_cost);

        session.clear_rate("cement");
        assert_eq!(session.estimate().cloned().unwrap(), first);
    }

    #[test]
    fn test_recalibration_keys_off_raw_plan() {
        let mut session = analysed();
        session.set_calibration_input("120");
        let once = session.estimate().cloned().unwrap();
        session.set_calibration_input("150");
        session.estimate();
        session.set_calibration_input("120");
        assert_eq!(session.estimate().cloned().unwrap(), once);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = analysed();
        session.set_quantity("bricks", 18_000.0);
        session.set_rate("steel", 80.0);
        let snapshot = session.snapshot();

        let restored = Session::with_snapshot(&snapshot);
        assert_eq!(restored.overrides(), session.overrides());
        assert_eq!(restored.settings(), session.settings());
    }

    #[test]
    fn test_clear_analysis_keeps_overrides() {
        let mut session = analysed();
        session.set_rate("steel", 80.0);
        session.clear_analysis();
        assert!(session.raw_analysis().is_none());
        assert_eq!(session.calibration_input(), "");
        assert_eq!(session.overrides().rate("steel"), Some(80.0));
    }
}
