//! Text rendering of the widget for CLI output.
//!
//! Each view mode renders to a different number of lines; the CLI measures that
//! line count as the widget's content height.

use crate::model::SubmissionInput;
use crate::view::{ViewMode, ViewState};
use anyhow::{Context, Result};

const BAR_WIDTH: usize = 30;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the text rendering of a view state.
pub fn build_text_summary(view: &ViewState) -> Result<TextSummary> {
    let mut lines = Vec::new();

    match view.mode {
        ViewMode::Idle => {
            lines.push("Ihre Immobilien-Daten".to_string());
            lines.push("Geben Sie die Eckdaten ein für eine präzise KI-Analyse.".to_string());
        }
        ViewMode::Loading => {
            let percent = view.progress.unwrap_or(0.0);
            lines.push(format!(
                "[{}] {:>3.0}%  {}",
                progress_bar(percent),
                percent,
                view.label.as_deref().unwrap_or_default()
            ));
        }
        ViewMode::Success => {
            if let Some(input) = view.input.as_ref() {
                push_input(&mut lines, input);
            }
            if let Some(result) = view.result.as_ref() {
                lines.push("Ergebnis:".to_string());
                let pretty = serde_json::to_string_pretty(result.as_value())
                    .context("failed to format analysis result")?;
                lines.extend(pretty.lines().map(|l| format!("  {l}")));
            }
        }
        ViewMode::Error => {
            lines.push(format!(
                "Fehler: {}",
                view.error.as_deref().unwrap_or_default()
            ));
            if view.retryable {
                lines.push("Erneut versuchen? (--retries)".to_string());
            }
        }
    }

    Ok(TextSummary { lines })
}

fn push_input(lines: &mut Vec<String>, input: &SubmissionInput) {
    lines.push(format!("Adresse: {}", input.address));
    lines.push(format!(
        "Objekt: {}, {} m², {} Zimmer, Baujahr {}, {}",
        input.property_type, input.size_sqm, input.rooms, input.year_built, input.condition
    ));
    lines.push(format!("Aktuelle Kaltmiete: {:.2} €", input.current_cold_rent));
}

fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifiedError, ErrorKind};
    use crate::model::{AnalysisResult, Condition, PropertyType, RequestState};
    use crate::view::project;

    fn input() -> SubmissionInput {
        SubmissionInput {
            address: "Musterstr. 1".into(),
            property_type: PropertyType::Apartment,
            size_sqm: 60.0,
            rooms: 2.5,
            year_built: 1990,
            condition: Condition::WellKept,
            current_cold_rent: 500.0,
        }
    }

    #[test]
    fn loading_renders_a_bar() {
        let view = ViewState {
            mode: ViewMode::Loading,
            progress: Some(50.0),
            label: Some("Vergleiche Marktmieten...".into()),
            input: None,
            result: None,
            error: None,
            retryable: false,
        };
        let summary = build_text_summary(&view).unwrap();
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(
            summary.lines[0],
            format!("[{}{}]  50%  Vergleiche Marktmieten...", "#".repeat(15), ".".repeat(15))
        );
    }

    #[test]
    fn success_lists_input_and_result() {
        let view = project(&RequestState::Succeeded {
            input: input(),
            result: AnalysisResult::new(serde_json::json!({ "marketRent": 720 })),
        });
        let lines = build_text_summary(&view).unwrap().lines;
        assert_eq!(lines[0], "Adresse: Musterstr. 1");
        assert_eq!(lines[1], "Objekt: Wohnung, 60 m², 2.5 Zimmer, Baujahr 1990, Gepflegt");
        assert_eq!(lines[2], "Aktuelle Kaltmiete: 500.00 €");
        assert_eq!(lines[3], "Ergebnis:");
        assert!(lines.iter().any(|l| l.contains("\"marketRent\": 720")));
    }

    #[test]
    fn error_banner_offers_retry() {
        let idle = build_text_summary(&project(&RequestState::Idle)).unwrap();
        let failed = build_text_summary(&project(&RequestState::Failed {
            input: input(),
            error: ClassifiedError {
                kind: ErrorKind::GenericFailure,
                message: "kaputt".into(),
            },
        }))
        .unwrap();
        assert_eq!(idle.lines[0], "Ihre Immobilien-Daten");
        assert_eq!(failed.lines, vec!["Fehler: kaputt", "Erneut versuchen? (--retries)"]);
    }
}
