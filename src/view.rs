use crate::model::{AnalysisResult, RequestState, SubmissionInput};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Idle,
    Loading,
    Success,
    Error,
}

/// What presentation needs to draw the widget for one request state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub mode: ViewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<SubmissionInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the retry action is offered.
    pub retryable: bool,
}

impl ViewState {
    fn empty(mode: ViewMode) -> Self {
        Self {
            mode,
            progress: None,
            label: None,
            input: None,
            result: None,
            error: None,
            retryable: false,
        }
    }
}

pub fn project(state: &RequestState) -> ViewState {
    match state {
        RequestState::Idle => ViewState::empty(ViewMode::Idle),
        RequestState::Pending {
            input, progress, ..
        } => ViewState {
            progress: Some(progress.percent),
            label: Some(progress.label.clone()),
            input: Some(input.clone()),
            ..ViewState::empty(ViewMode::Loading)
        },
        RequestState::Succeeded { input, result } => ViewState {
            input: Some(input.clone()),
            result: Some(result.clone()),
            ..ViewState::empty(ViewMode::Success)
        },
        RequestState::Failed { input, error } => ViewState {
            input: Some(input.clone()),
            error: Some(error.message.clone()),
            retryable: true,
            ..ViewState::empty(ViewMode::Error)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifiedError, ErrorKind};
    use crate::model::{Condition, EpisodeId, ProgressSnapshot, PropertyType};

    fn input() -> SubmissionInput {
        SubmissionInput {
            address: "Musterstr. 1".into(),
            property_type: PropertyType::Apartment,
            size_sqm: 60.0,
            rooms: 2.0,
            year_built: 1990,
            condition: Condition::WellKept,
            current_cold_rent: 500.0,
        }
    }

    #[test]
    fn idle_has_nothing_to_show() {
        let view = project(&RequestState::Idle);
        assert_eq!(view.mode, ViewMode::Idle);
        assert_eq!(view.progress, None);
        assert_eq!(view.input, None);
        assert!(!view.retryable);
    }

    #[test]
    fn pending_shows_progress_and_label() {
        let view = project(&RequestState::Pending {
            episode: EpisodeId(3),
            input: input(),
            progress: ProgressSnapshot::new(42.5, "Analysiere Lage & Umfeld..."),
        });
        assert_eq!(view.mode, ViewMode::Loading);
        assert_eq!(view.progress, Some(42.5));
        assert_eq!(view.label.as_deref(), Some("Analysiere Lage & Umfeld..."));
        assert_eq!(view.result, None);
    }

    #[test]
    fn success_pairs_result_with_its_input() {
        let result = AnalysisResult::new(serde_json::json!({ "marketRent": 720 }));
        let view = project(&RequestState::Succeeded {
            input: input(),
            result: result.clone(),
        });
        assert_eq!(view.mode, ViewMode::Success);
        assert_eq!(view.input, Some(input()));
        assert_eq!(view.result, Some(result));
        assert_eq!(view.error, None);
    }

    #[test]
    fn failure_is_retryable_with_message() {
        let view = project(&RequestState::Failed {
            input: input(),
            error: ClassifiedError {
                kind: ErrorKind::GenericFailure,
                message: "kaputt".into(),
            },
        });
        assert_eq!(view.mode, ViewMode::Error);
        assert_eq!(view.error.as_deref(), Some("kaputt"));
        assert!(view.retryable);
    }

    #[test]
    fn serializes_without_empty_fields() {
        let json = serde_json::to_value(project(&RequestState::Idle)).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "idle", "retryable": false }));
    }
}
