//! Core of the embeddable rental potential widget.
//!
//! A submission is handed to an [`orchestrator::AnalysisOrchestrator`], which runs
//! the external analysis call alongside a [`progress::ProgressSimulator`], keeps a
//! single [`model::RequestState`] and reports every transition. Presentation layers
//! project that state with [`view::project`] and keep the host frame sized through
//! [`resize::ResizeReporter`].

pub mod cli;
pub mod error;
pub mod form;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod resize;
pub mod service;
pub mod text_summary;
pub mod view;
