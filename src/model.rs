use crate::error::{ClassifiedError, FormError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for one widget instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Upper bound for a single analysis call before it is treated as failed.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long the 100% step stays visible before the result is shown.
    #[serde(with = "humantime_serde")]
    pub finish_delay: Duration,
    pub progress: ProgressConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8787/api/analyze".into(),
            user_agent: format!("rent-widget/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
            finish_delay: Duration::from_millis(600),
            progress: ProgressConfig::default(),
        }
    }
}

/// Tuning for the simulated progress curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    pub ceiling: f64,
    pub floor_jump: f64,
    pub decay_factor: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(400),
            ceiling: crate::progress::PROGRESS_CEILING,
            floor_jump: 0.5,
            decay_factor: 6.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "Wohnung")]
    Apartment,
    #[serde(rename = "Haus")]
    House,
    #[serde(rename = "Mehrfamilienhaus")]
    MultiFamilyHouse,
    #[serde(rename = "Gewerbe")]
    Commercial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::Apartment,
        PropertyType::House,
        PropertyType::MultiFamilyHouse,
        PropertyType::Commercial,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PropertyType::Apartment => "Wohnung",
            PropertyType::House => "Haus",
            PropertyType::MultiFamilyHouse => "Mehrfamilienhaus",
            PropertyType::Commercial => "Gewerbe",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::MultiFamilyHouse => "multi-family-house",
            PropertyType::Commercial => "commercial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the CLI slug (`multi-family-house`) or the display label.
impl FromStr for PropertyType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PropertyType::ALL
            .into_iter()
            .find(|t| t.slug().eq_ignore_ascii_case(needle) || t.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| FormError::UnknownValue {
                field: "property type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Renovierungsbedürftig")]
    NeedsRenovation,
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Gepflegt")]
    WellKept,
    #[serde(rename = "Saniert")]
    Renovated,
    #[serde(rename = "Neuwertig")]
    NewBuild,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::NeedsRenovation,
        Condition::Normal,
        Condition::WellKept,
        Condition::Renovated,
        Condition::NewBuild,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Condition::NeedsRenovation => "Renovierungsbedürftig",
            Condition::Normal => "Normal",
            Condition::WellKept => "Gepflegt",
            Condition::Renovated => "Saniert",
            Condition::NewBuild => "Neuwertig",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Condition::NeedsRenovation => "needs-renovation",
            Condition::Normal => "normal",
            Condition::WellKept => "well-kept",
            Condition::Renovated => "renovated",
            Condition::NewBuild => "new-build",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Condition::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(needle) || c.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| FormError::UnknownValue {
                field: "condition",
                value: s.to_string(),
            })
    }
}

/// Snapshot of the form fields taken at submit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionInput {
    pub address: String,
    pub property_type: PropertyType,
    pub size_sqm: f64,
    /// Half rooms are allowed (e.g. 2.5).
    pub rooms: f64,
    pub year_built: i32,
    pub condition: Condition,
    pub current_cold_rent: f64,
}

/// Structured valuation returned by the analysis service.
///
/// The core never looks inside; it only pairs it with the input that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(serde_json::Value);

impl AnalysisResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Identity of one submit-to-resolution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId(pub u64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percent: f64,
    pub label: String,
}

impl ProgressSnapshot {
    pub fn new(percent: f64, label: impl Into<String>) -> Self {
        Self {
            percent,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RequestState {
    Idle,
    Pending {
        episode: EpisodeId,
        input: SubmissionInput,
        progress: ProgressSnapshot,
    },
    Succeeded {
        input: SubmissionInput,
        result: AnalysisResult,
    },
    Failed {
        input: SubmissionInput,
        error: ClassifiedError,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    /// Input of the episode this state belongs to, if any.
    pub fn input(&self) -> Option<&SubmissionInput> {
        match self {
            RequestState::Idle => None,
            RequestState::Pending { input, .. }
            | RequestState::Succeeded { input, .. }
            | RequestState::Failed { input, .. } => Some(input),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WidgetEvent {
    StateChanged { state: RequestState },
    Info(InfoEvent),
}

/// Structured info events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    EpisodeStarted { episode: EpisodeId, superseded: Option<EpisodeId> },
    StaleResultDropped { episode: EpisodeId },
    RetryIgnored,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::EpisodeStarted {
                episode,
                superseded: Some(prev),
            } => format!("Analysis {episode} started (supersedes {prev})"),
            InfoEvent::EpisodeStarted {
                episode,
                superseded: None,
            } => format!("Analysis {episode} started"),
            InfoEvent::StaleResultDropped { episode } => {
                format!("Discarded late result of superseded analysis {episode}")
            }
            InfoEvent::RetryIgnored => "Nothing to retry".to_string(),
        }
    }
}

/// One-way notification to the embedding host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "setHeight")]
pub struct HostMessage {
    pub height: u32,
}

impl HostMessage {
    pub fn set_height(height: u32) -> Self {
        Self { height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> SubmissionInput {
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
    fn submission_input_uses_camel_case_and_german_labels() {
        let json = serde_json::to_value(sample_input()).unwrap();
        assert_eq!(json["address"], "Musterstr. 1");
        assert_eq!(json["propertyType"], "Wohnung");
        assert_eq!(json["sizeSqm"], 60.0);
        assert_eq!(json["yearBuilt"], 1990);
        assert_eq!(json["condition"], "Gepflegt");
        assert_eq!(json["currentColdRent"], 500.0);
    }

    #[test]
    fn host_message_has_set_height_shape() {
        let json = serde_json::to_string(&HostMessage::set_height(640)).unwrap();
        assert_eq!(json, r#"{"type":"setHeight","height":640}"#);
    }

    #[test]
    fn enums_parse_from_slug_or_label() {
        assert_eq!("well-kept".parse::<Condition>().unwrap(), Condition::WellKept);
        assert_eq!("Saniert".parse::<Condition>().unwrap(), Condition::Renovated);
        assert_eq!(
            "multi-family-house".parse::<PropertyType>().unwrap(),
            PropertyType::MultiFamilyHouse
        );
        assert_eq!("haus".parse::<PropertyType>().unwrap(), PropertyType::House);
        assert!("castle".parse::<PropertyType>().is_err());
    }

    #[test]
    fn request_state_exposes_its_input() {
        assert!(RequestState::Idle.input().is_none());
        let state = RequestState::Pending {
            episode: EpisodeId(1),
            input: sample_input(),
            progress: ProgressSnapshot::new(0.0, "x"),
        };
        assert!(state.is_pending());
        assert_eq!(state.input(), Some(&sample_input()));
    }
}
