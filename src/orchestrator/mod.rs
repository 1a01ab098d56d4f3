//! Analysis request orchestration.
//!
//! This module owns the submission lifecycle (submit, supersede, retry), mirrors
//! simulated progress into the request state and classifies failures. UI/CLI layers
//! talk to it through [`OrchestratorHandle`] and observe [`crate::model::WidgetEvent`]s.

mod classify;
mod controller;

pub use classify::{classify, classify_message, GENERIC_FAILURE_MESSAGE, SERVER_OVERLOAD_MESSAGE};
pub use controller::{AnalysisOrchestrator, OrchestratorHandle};
