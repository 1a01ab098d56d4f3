use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the external analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("analysis service responded with {status}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid analysis response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("analysis timed out after {0}")]
    Timeout(humantime::Duration),
    #[error("invalid analysis endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("{0}")]
    Message(String),
    /// The service failed without saying why.
    #[error("analysis failed")]
    Unknown,
}

impl AnalysisError {
    /// Human-readable text carried by the failure, if it has any.
    pub fn message(&self) -> Option<String> {
        match self {
            AnalysisError::Unknown => None,
            AnalysisError::Message(m) if m.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    TransientServerOverload,
    GenericFailure,
}

/// User-facing error shown in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Rejected form input, reported by the presentation layer before submit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("address is required")]
    MissingAddress,
    #[error("living space must be at least {min} m² (got {value})")]
    SizeTooSmall { value: f64, min: f64 },
    #[error("rooms must be at least 1 in steps of 0.5 (got {0})")]
    InvalidRooms(f64),
    #[error("year built must be between {min} and {max} (got {value})")]
    YearBuiltOutOfRange { value: i32, min: i32, max: i32 },
    #[error("current cold rent must not be negative (got {0})")]
    NegativeRent(f64),
    #[error("unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn message_is_absent_for_unknown_and_blank_failures() {
        assert_eq!(AnalysisError::Unknown.message(), None);
        assert_eq!(AnalysisError::Message("  ".into()).message(), None);
        assert_eq!(
            AnalysisError::Message("quota exceeded".into()).message().as_deref(),
            Some("quota exceeded")
        );
    }

    #[test]
    fn status_message_carries_status_line() {
        let err = AnalysisError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        let msg = err.message().unwrap();
        assert!(msg.contains("500"));
        assert!(msg.contains("Internal Server Error"));
    }

    #[test]
    fn timeout_message_is_humanized() {
        let err = AnalysisError::Timeout(Duration::from_secs(60).into());
        assert_eq!(err.to_string(), "analysis timed out after 1m");
    }
}
