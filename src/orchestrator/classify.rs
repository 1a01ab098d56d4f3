//! Maps analysis failures to the message shown in the error banner.
//!
//! Known limitation: this is a substring heuristic on the failure text, not
//! structured error typing. Any message that merely mentions "500" (say,
//! "limit of 5000 requests reached") is reported as an overload too.

use crate::error::{AnalysisError, ClassifiedError, ErrorKind};

pub const SERVER_OVERLOAD_MESSAGE: &str =
    "Der KI-Server ist gerade überlastet. Bitte versuchen Sie es in wenigen Sekunden erneut.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Bei der Analyse ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut.";

const UNREACHABLE_MESSAGE: &str =
    "Der Analysedienst ist nicht erreichbar. Bitte versuchen Sie es erneut.";
const INVALID_RESPONSE_MESSAGE: &str =
    "Die Antwort des Analysedienstes konnte nicht gelesen werden. Bitte versuchen Sie es erneut.";
const INVALID_ENDPOINT_MESSAGE: &str = "Die Adresse des Analysedienstes ist ungültig.";

const OVERLOAD_MARKERS: [&str; 2] = ["500", "Internal Server Error"];

/// Overload detection looks at the full failure text. Otherwise a message sent by the
/// service is shown verbatim, and failures of the call itself get a German banner text.
pub fn classify(err: &AnalysisError) -> ClassifiedError {
    let classified = classify_message(err.message().as_deref());
    if classified.kind == ErrorKind::TransientServerOverload {
        return classified;
    }
    let banner = match err {
        AnalysisError::Message(_) | AnalysisError::Unknown => return classified,
        AnalysisError::Status { status, .. } => format!(
            "Der Analysedienst antwortete mit Status {}. Bitte versuchen Sie es erneut.",
            status.as_u16()
        ),
        AnalysisError::Timeout(after) => format!(
            "Der Analysedienst hat nach {after} nicht geantwortet. Bitte versuchen Sie es erneut."
        ),
        AnalysisError::Http(_) => UNREACHABLE_MESSAGE.to_string(),
        AnalysisError::Decode(_) => INVALID_RESPONSE_MESSAGE.to_string(),
        AnalysisError::InvalidEndpoint(_) => INVALID_ENDPOINT_MESSAGE.to_string(),
    };
    ClassifiedError {
        kind: ErrorKind::GenericFailure,
        message: banner,
    }
}

pub fn classify_message(message: Option<&str>) -> ClassifiedError {
    match message {
        Some(m) if OVERLOAD_MARKERS.iter().any(|marker| m.contains(marker)) => ClassifiedError {
            kind: ErrorKind::TransientServerOverload,
            message: SERVER_OVERLOAD_MESSAGE.to_string(),
        },
        Some(m) if !m.trim().is_empty() => ClassifiedError {
            kind: ErrorKind::GenericFailure,
            message: m.to_string(),
        },
        _ => ClassifiedError {
            kind: ErrorKind::GenericFailure,
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        },
    }
}
