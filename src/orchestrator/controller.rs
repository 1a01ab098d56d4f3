//! Analysis lifecycle controller.
//!
//! Owns the single `RequestState` and every transition of it. Progress ticks,
//! analysis resolutions and the finish step all arrive tagged with the episode
//! they were started for; anything not tagged with the current episode is dropped.

use super::classify::classify;
use crate::error::AnalysisError;
use crate::model::{
    AnalysisResult, EpisodeId, InfoEvent, ProgressSnapshot, RequestState, SubmissionInput,
    WidgetConfig, WidgetEvent,
};
use crate::progress::{self, ProgressHandle, ProgressSimulator, SUCCESS_LABEL};
use crate::service::AnalysisService;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Commands emitted by presentation layers.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Submit(SubmissionInput),
    Retry,
    Shutdown,
}

/// Internal signals from the timelines an episode spawns.
enum Signal {
    Tick {
        episode: EpisodeId,
        snapshot: ProgressSnapshot,
    },
    Resolved {
        episode: EpisodeId,
        outcome: Result<AnalysisResult, AnalysisError>,
    },
}

/// The 100% step shown between resolution and `Succeeded`.
struct Finishing {
    episode: EpisodeId,
    input: SubmissionInput,
    result: AnalysisResult,
    deadline: Instant,
}

/// Cheap handle for submitting work to a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    cmd_tx: UnboundedSender<Command>,
    state_rx: watch::Receiver<RequestState>,
}

impl OrchestratorHandle {
    /// Start a new episode. Supersedes any episode still in flight.
    pub fn submit(&self, input: SubmissionInput) {
        self.send(Command::Submit(input));
    }

    /// Resubmit the input of the last failed episode. No-op unless the state is `Failed`.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Stop the controller task. In-flight analysis calls are left to finish unobserved.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Current state.
    pub fn state(&self) -> RequestState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state_rx.clone()
    }

    fn send(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("orchestrator is not running; command dropped");
        }
    }
}

pub struct AnalysisOrchestrator;

impl AnalysisOrchestrator {
    /// Spawn the controller task on the current runtime.
    pub fn spawn(
        cfg: WidgetConfig,
        service: Arc<dyn AnalysisService>,
        event_tx: UnboundedSender<WidgetEvent>,
    ) -> (OrchestratorHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RequestState::Idle);
        let controller = Controller::new(cfg, service, event_tx, state_tx);
        let handle = tokio::spawn(run_controller(controller, cmd_rx));
        (OrchestratorHandle { cmd_tx, state_rx }, handle)
    }
}

struct Controller {
    cfg: WidgetConfig,
    service: Arc<dyn AnalysisService>,
    event_tx: UnboundedSender<WidgetEvent>,
    state_tx: watch::Sender<RequestState>,
    signal_tx: UnboundedSender<Signal>,
    signal_rx: UnboundedReceiver<Signal>,
    state: RequestState,
    last_episode: u64,
    current: Option<EpisodeId>,
    progress: Option<ProgressHandle>,
    finishing: Option<Finishing>,
}

impl Controller {
    fn new(
        cfg: WidgetConfig,
        service: Arc<dyn AnalysisService>,
        event_tx: UnboundedSender<WidgetEvent>,
        state_tx: watch::Sender<RequestState>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            service,
            event_tx,
            state_tx,
            signal_tx,
            signal_rx,
            state: RequestState::Idle,
            last_episode: 0,
            current: None,
            progress: None,
            finishing: None,
        }
    }

    fn set_state(&mut self, state: RequestState) {
        self.state = state.clone();
        self.state_tx.send_replace(state.clone());
        let _ = self.event_tx.send(WidgetEvent::StateChanged { state });
    }

    fn info(&self, info: InfoEvent) {
        let _ = self.event_tx.send(WidgetEvent::Info(info));
    }

    fn stop_progress(&mut self) {
        if let Some(handle) = self.progress.take() {
            handle.cancel();
        }
    }

    fn begin_episode(&mut self, input: SubmissionInput) {
        // Supersede whatever is still running: its timer stops now, its call result
        // will arrive with an outdated tag.
        self.stop_progress();
        self.finishing = None;
        let superseded = self.current.filter(|_| self.state.is_pending());

        self.last_episode += 1;
        let episode = EpisodeId(self.last_episode);
        self.current = Some(episode);
        tracing::info!(%episode, superseded = ?superseded, address = %input.address, "starting analysis");

        self.set_state(RequestState::Pending {
            episode,
            input: input.clone(),
            progress: ProgressSnapshot::new(0.0, progress::START_LABEL),
        });
        self.info(InfoEvent::EpisodeStarted {
            episode,
            superseded,
        });

        let simulator = match self.cfg.progress.seed {
            // Distinct but reproducible curve per episode.
            Some(seed) => ProgressSimulator::with_rng(
                self.cfg.progress.clone(),
                StdRng::seed_from_u64(seed.wrapping_add(episode.0)),
            ),
            None => ProgressSimulator::new(self.cfg.progress.clone()),
        };
        let tick_tx = self.signal_tx.clone();
        self.progress = Some(simulator.start(move |snapshot| {
            let _ = tick_tx.send(Signal::Tick { episode, snapshot });
        }));

        let call = self.service.analyze(input);
        let timeout = self.cfg.request_timeout;
        let resolve_tx = self.signal_tx.clone();
        // Never aborted: a superseded call runs to completion and its result is discarded.
        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AnalysisError::Timeout(timeout.into())),
            };
            let _ = resolve_tx.send(Signal::Resolved { episode, outcome });
        });
    }

    fn retry(&mut self) {
        match &self.state {
            RequestState::Failed { input, .. } => {
                let input = input.clone();
                tracing::info!("retrying failed analysis");
                self.begin_episode(input);
            }
            _ => {
                tracing::debug!("retry ignored, last analysis did not fail");
                self.info(InfoEvent::RetryIgnored);
            }
        }
    }

    fn on_tick(&mut self, episode: EpisodeId, snapshot: ProgressSnapshot) {
        if self.current != Some(episode) || self.finishing.is_some() {
            tracing::trace!(%episode, "dropping stale progress tick");
            return;
        }
        let RequestState::Pending {
            input,
            progress: shown,
            ..
        } = &self.state
        else {
            return;
        };

        // Never past the ceiling, never backwards.
        let percent = snapshot
            .percent
            .min(self.cfg.progress.ceiling)
            .max(shown.percent);
        if percent == shown.percent {
            return;
        }
        let next = RequestState::Pending {
            episode,
            input: input.clone(),
            progress: ProgressSnapshot::new(percent, progress::label_for(percent)),
        };
        self.set_state(next);
    }

    fn on_resolved(
        &mut self,
        episode: EpisodeId,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) {
        if self.current != Some(episode) {
            tracing::debug!(%episode, current = ?self.current, "discarding result of superseded analysis");
            self.info(InfoEvent::StaleResultDropped { episode });
            return;
        }
        let RequestState::Pending { input, .. } = &self.state else {
            return;
        };
        let input = input.clone();
        self.stop_progress();

        match outcome {
            Ok(result) => {
                tracing::info!(%episode, "analysis succeeded");
                self.set_state(RequestState::Pending {
                    episode,
                    input: input.clone(),
                    progress: ProgressSnapshot::new(100.0, SUCCESS_LABEL),
                });
                self.finishing = Some(Finishing {
                    episode,
                    input,
                    result,
                    deadline: Instant::now() + self.cfg.finish_delay,
                });
            }
            Err(e) => {
                tracing::warn!(%episode, error = %e, "analysis failed");
                let error = classify(&e);
                self.set_state(RequestState::Failed { input, error });
            }
        }
    }

    fn on_finished(&mut self) {
        let Some(done) = self.finishing.take() else {
            return;
        };
        if self.current != Some(done.episode) {
            return;
        }
        self.set_state(RequestState::Succeeded {
            input: done.input,
            result: done.result,
        });
    }

    fn shutdown(&mut self) {
        self.stop_progress();
        self.finishing = None;
    }
}

/// Drive the controller until shutdown or until every handle is dropped.
async fn run_controller(mut ctl: Controller, mut cmd_rx: UnboundedReceiver<Command>) {
    loop {
        // Copy the deadline out so the select branch does not borrow the controller.
        let finish_at = ctl.finishing.as_ref().map(|f| f.deadline);

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Submit(input)) => ctl.begin_episode(input),
                    Some(Command::Retry) => ctl.retry(),
                    Some(Command::Shutdown) | None => {
                        ctl.shutdown();
                        break;
                    }
                }
            }
            Some(signal) = ctl.signal_rx.recv() => {
                match signal {
                    Signal::Tick { episode, snapshot } => ctl.on_tick(episode, snapshot),
                    Signal::Resolved { episode, outcome } => ctl.on_resolved(episode, outcome),
                }
            }
            _ = async move {
                match finish_at {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => futures::future::pending().await,
                }
            } => {
                ctl.on_finished();
            }
        }
    }
    tracing::debug!("orchestrator stopped");
}
