//! # Error Types
//!
//! Structured error types for boq_core. The calculation engine itself is
//! total and never returns these; they come from the collaborator seams
//! (AI analysis, persistence, export) and carry enough context for a caller
//! to decide whether to retry.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::errors::{EstimateError, EstimateResult};
//!
//! fn require_user(user_key: &str) -> EstimateResult<()> {
//!     if user_key.trim().is_empty() {
//!         return Err(EstimateError::invalid_input(
//!             "user_key",
//!             user_key,
//!             "User key must not be blank",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_user("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for boq_core operations
pub type EstimateResult<T> = Result<T, EstimateError>;

/// Structured error type for everything outside the pure calculation path.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EstimateError {
    /// An input value is invalid (blank key, malformed override, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The AI analysis service failed to produce a usable result
    #[error("Floor plan analysis failed: {reason}")]
    AnalysisFailed { reason: String, retryable: bool },

    /// An analysis finished after a newer request was started
    #[error("Analysis request #{ticket} was superseded by request #{latest}")]
    AnalysisSuperseded { ticket: u64, latest: u64 },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// A stored record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EstimateError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EstimateError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Analysis failure that may succeed if the request is repeated
    pub fn analysis_transient(reason: impl Into<String>) -> Self {
        EstimateError::AnalysisFailed {
            reason: reason.into(),
            retryable: true,
        }
    }

    /// Analysis failure that will not succeed on retry (bad plan, bad response)
    pub fn analysis_permanent(reason: impl Into<String>) -> Self {
        EstimateError::AnalysisFailed {
            reason: reason.into(),
            retryable: false,
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EstimateError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        EstimateError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        EstimateError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Wrap a serde_json error
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        EstimateError::SerializationError {
            reason: err.to_string(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            EstimateError::FileLocked { .. } => true,
            EstimateError::AnalysisFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EstimateError::InvalidInput { .. } => "INVALID_INPUT",
            EstimateError::AnalysisFailed { .. } => "ANALYSIS_FAILED",
            EstimateError::AnalysisSuperseded { .. } => "ANALYSIS_SUPERSEDED",
            EstimateError::FileError { .. } => "FILE_ERROR",
            EstimateError::FileLocked { .. } => "FILE_LOCKED",
            EstimateError::SerializationError { .. } => "SERIALIZATION_ERROR",
            EstimateError::VersionMismatch { .. } => "VERSION_MISMATCH",
            EstimateError::NotFound { .. } => "NOT_FOUND",
            EstimateError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = EstimateError::analysis_transient("Service unavailable (503)");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"AnalysisFailed\""));
        let roundtrip: EstimateError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(EstimateError::not_found("Plan", "x").error_code(), "NOT_FOUND");
        assert_eq!(
            EstimateError::analysis_permanent("bad").error_code(),
            "ANALYSIS_FAILED"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(EstimateError::analysis_transient("timeout").is_recoverable());
        assert!(!EstimateError::analysis_permanent("not a floor plan").is_recoverable());
        assert!(EstimateError::file_locked("a.json", "someone", "now").is_recoverable());
        assert!(!EstimateError::serialization("eof").is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = EstimateError::not_found("Saved plan", "1234");
        assert_eq!(err.to_string(), "Saved plan not found: 1234");
    }
}
