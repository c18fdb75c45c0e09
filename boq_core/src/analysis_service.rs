//! # Analysis Service Seam
//!
//! The AI vision model that reads a floor plan lives outside this crate. The
//! engine only sees the [`AnalysisService`] trait: hand it an uploaded plan,
//! get back an [`AnalysisResult`] or an `AnalysisFailed` error that says
//! whether retrying could help.
//!
//! [`parse_analysis_response`] turns a raw model response body into a
//! validated analysis and is shared by every implementation.
//! [`RecordedAnalysisService`] replays a response saved to disk, which is how
//! the CLI and tests drive the engine without network access.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::analysis::AnalysisResult;
use crate::errors::{EstimateError, EstimateResult};

/// Instructions sent alongside the image. Implementations that call a model
/// should request JSON matching [`AnalysisResult`].
pub const ANALYSIS_PROMPT: &str = "\
Analyze this construction floor plan as a quantity surveyor.
Report: total built-up area (sq m), total wall length (m), typical wall thickness (m, usually 0.15 - 0.23).
For every room give name, type (Bedroom, Kitchen, Bathroom, Living, Dining, Corridor or Other), area (sq m) and perimeter (m), estimating the perimeter when it is not labelled.
Count the visible doors and windows.
Return only JSON.";

/// Content types the analysis model accepts
pub const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "application/pdf"];

/// An uploaded plan, image or PDF
#[derive(Debug, Clone, PartialEq)]
pub struct PlanUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PlanUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        PlanUpload {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a plan from disk, taking the content type from the extension
    pub fn from_path(path: &Path) -> EstimateResult<Self> {
        let mime_type = mime_for_path(path).ok_or_else(|| {
            EstimateError::invalid_input(
                "plan",
                path.display().to_string(),
                "Unsupported file type (expected PNG, JPEG, WebP or PDF)",
            )
        })?;
        let bytes = std::fs::read(path)
            .map_err(|e| EstimateError::file_error("read", path.display().to_string(), e.to_string()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(PlanUpload::new(file_name, mime_type, bytes))
    }

    /// Reject uploads the model cannot read
    pub fn validate(&self) -> EstimateResult<()> {
        if self.bytes.is_empty() {
            return Err(EstimateError::invalid_input("plan", &self.file_name, "File is empty"));
        }
        if !SUPPORTED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(EstimateError::invalid_input(
                "plan",
                &self.mime_type,
                "Unsupported content type",
            ));
        }
        Ok(())
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Producer of raw analyses.
pub trait AnalysisService {
    fn analyze(&self, upload: &PlanUpload) -> EstimateResult<AnalysisResult>;
}

/// Parse and validate a model response body.
///
/// A body wrapped in a Markdown code fence is accepted. Anything that cannot
/// be turned into sane geometry is a permanent failure; sending the same plan
/// again will not fix it.
pub fn parse_analysis_response(body: &str) -> EstimateResult<AnalysisResult> {
    let text = strip_code_fence(body.trim());
    if text.is_empty() {
        return Err(EstimateError::analysis_permanent("No data returned from AI"));
    }

    let analysis: AnalysisResult = serde_json::from_str(text).map_err(|e| {
        EstimateError::analysis_permanent(format!("Response is not a valid analysis: {e}"))
    })?;
    validate_geometry(&analysis)?;

    debug!(
        rooms = analysis.room_count(),
        area_sq_m = analysis.summary.total_area_sq_m,
        "parsed analysis response"
    );
    Ok(analysis)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn validate_geometry(analysis: &AnalysisResult) -> EstimateResult<()> {
    let bad = |what: String, value: f64| {
        EstimateError::analysis_permanent(format!("{what} must be a non-negative number, got {value}"))
    };
    let ok = |v: f64| v.is_finite() && v >= 0.0;

    let s = &analysis.summary;
    for (what, value) in [
        ("totalAreaSqM", s.total_area_sq_m),
        ("totalWallLengthM", s.total_wall_length_m),
        ("wallThicknessM", s.wall_thickness_m),
    ] {
        if !ok(value) {
            return Err(bad(what.to_string(), value));
        }
    }

    for room in &analysis.rooms {
        if !ok(room.area_sq_m) {
            return Err(bad(format!("area of room '{}'", room.display_name()), room.area_sq_m));
        }
        if let Some(p) = room.perimeter_m {
            if !ok(p) {
                return Err(bad(format!("perimeter of room '{}'", room.display_name()), p));
            }
        }
    }
    Ok(())
}

/// Replays a model response saved as a file.
#[derive(Debug, Clone)]
pub struct RecordedAnalysisService {
    response_path: PathBuf,
}

impl RecordedAnalysisService {
    pub fn new(response_path: impl Into<PathBuf>) -> Self {
        RecordedAnalysisService {
            response_path: response_path.into(),
        }
    }

    pub fn response_path(&self) -> &Path {
        &self.response_path
    }
}

impl AnalysisService for RecordedAnalysisService {
    fn analyze(&self, upload: &PlanUpload) -> EstimateResult<AnalysisResult> {
        debug!(file = %upload.file_name, response = %self.response_path.display(), "replaying recorded analysis");
        let body = std::fs::read_to_string(&self.response_path).map_err(|e| {
            warn!(path = %self.response_path.display(), error = %e, "recorded analysis unreadable");
            EstimateError::analysis_transient(format!(
                "Could not read {}: {e}",
                self.response_path.display()
            ))
        })?;
        parse_analysis_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BODY: &str = r#"{
        "summary": { "totalAreaSqM": 100.0, "totalWallLengthM": 80.0, "wallThicknessM": 0.15 },
        "rooms": [ { "name": "Bath", "type": "Bathroom", "areaSqM": 5.0, "perimeterM": 9.0 } ],
        "elements": { "doors": 4, "windows": 8 }
    }"#;

    fn permanent(err: &EstimateError) -> bool {
        matches!(err, EstimateError::AnalysisFailed { retryable: false, .. })
    }

    #[test]
    fn test_parse_valid_body() {
        let analysis = parse_analysis_response(BODY).unwrap();
        assert_eq!(analysis.room_count(), 1);
        assert_eq!(analysis.elements.doors, 4);
    }

    #[test]
    fn test_parse_fenced_body() {
        let fenced = format!("```json\n{BODY}\n```");
        assert_eq!(parse_analysis_response(&fenced).unwrap(), parse_analysis_response(BODY).unwrap());
    }

    #[test]
    fn test_empty_body() {
        let err = parse_analysis_response("  \n").unwrap_err();
        assert!(permanent(&err));
        assert!(err.to_string().contains("No data returned from AI"));
    }

    #[test]
    fn test_malformed_body_is_permanent() {
        let err = parse_analysis_response("{ \"summary\": ").unwrap_err();
        assert!(permanent(&err));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_negative_geometry_rejected() {
        let body = BODY.replace("\"totalWallLengthM\": 80.0", "\"totalWallLengthM\": -80.0");
        assert!(permanent(&parse_analysis_response(&body).unwrap_err()));

        let body = BODY.replace("\"perimeterM\": 9.0", "\"perimeterM\": -9.0");
        let err = parse_analysis_response(&body).unwrap_err();
        assert!(err.to_string().contains("Bath"));
    }

    #[test]
    fn test_recorded_service_replays_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BODY.as_bytes()).unwrap();
        let service = RecordedAnalysisService::new(file.path());
        let upload = PlanUpload::new("plan.png", "image/png", vec![1, 2, 3]);
        assert_eq!(service.analyze(&upload).unwrap().summary.total_area_sq_m, 100.0);
    }

    #[test]
    fn test_missing_recording_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let service = RecordedAnalysisService::new(dir.path().join("missing.json"));
        let upload = PlanUpload::new("plan.png", "image/png", vec![1]);
        let err = service.analyze(&upload).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_upload_validation() {
        assert!(PlanUpload::new("a.png", "image/png", vec![0]).validate().is_ok());
        assert!(PlanUpload::new("a.png", "image/png", vec![]).validate().is_err());
        assert!(PlanUpload::new("a.gif", "image/gif", vec![0]).validate().is_err());
    }

    #[test]
    fn test_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Plan.PDF");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        let upload = PlanUpload::from_path(&path).unwrap();
        assert_eq!(upload.mime_type, "application/pdf");
        assert_eq!(upload.file_name, "Plan.PDF");

        let txt = dir.path().join("plan.txt");
        std::fs::write(&txt, b"x").unwrap();
        assert!(PlanUpload::from_path(&txt).is_err());
    }
}
