use crate::form;
use crate::model::{
    AnalysisResult, Condition, ProgressConfig, PropertyType, RequestState, SubmissionInput,
    WidgetConfig, WidgetEvent,
};
use crate::orchestrator::AnalysisOrchestrator;
use crate::resize::{JsonLineSink, LayoutEvent, MeasuredElement, ResizeReporter};
use crate::service::{AnalysisService, HttpAnalysisService};
use crate::text_summary::build_text_summary;
use crate::view;
use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Approximate rendered height of one text line, in CSS pixels.
const LINE_HEIGHT_PX: u32 = 24;
/// Header, paddings and borders around the content.
const FRAME_PADDING_PX: u32 = 96;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
///
/// Locks per line: the log subscriber and the host sink write to the same streams.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            let _ = match line {
                OutputLine::Stdout(msg) => writeln!(std::io::stdout().lock(), "{}", msg),
                OutputLine::Stderr(msg) => writeln!(std::io::stderr().lock(), "{}", msg),
            };
        }

        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "rent-widget",
    version,
    about = "AI rental potential analysis with live progress feedback"
)]
pub struct Cli {
    /// Property address, e.g. "Musterstraße 1, 10115 Berlin"
    #[arg(long)]
    pub address: String,

    /// Property type: apartment, house, multi-family-house, commercial
    #[arg(long, default_value = "apartment")]
    pub property_type: PropertyType,

    /// Living space in m² (at least 10)
    #[arg(long, default_value_t = 60.0)]
    pub size_sqm: f64,

    /// Number of rooms, half rooms allowed
    #[arg(long, default_value_t = 2.0)]
    pub rooms: f64,

    /// Year of construction
    #[arg(long, default_value_t = 1990)]
    pub year_built: i32,

    /// Condition: needs-renovation, normal, well-kept, renovated, new-build
    #[arg(long, default_value = "well-kept")]
    pub condition: Condition,

    /// Current cold rent in EUR
    #[arg(long, default_value_t = 500.0)]
    pub current_cold_rent: f64,

    /// URL of the analysis service
    #[arg(long, default_value = "http://localhost:8787/api/analyze")]
    pub endpoint: String,

    /// Print JSON result and exit
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output
    #[arg(long)]
    pub quiet: bool,

    /// Interval between simulated progress steps
    #[arg(long, default_value = "400ms")]
    pub tick_interval: humantime::Duration,

    /// How long 100% stays visible before the result is shown
    #[arg(long, default_value = "600ms")]
    pub finish_delay: humantime::Duration,

    /// Give up on the analysis service after this long
    #[arg(long, default_value = "60s")]
    pub request_timeout: humantime::Duration,

    /// Press "retry" up to this many times after a failed analysis
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Emit `setHeight` host messages as JSON lines on stdout
    #[arg(long)]
    pub host_messages: bool,

    /// Seed for the simulated progress curve
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Build the submission from the form flags.
pub fn build_input(args: &Cli) -> SubmissionInput {
    SubmissionInput {
        address: args.address.trim().to_string(),
        property_type: args.property_type,
        size_sqm: args.size_sqm,
        rooms: args.rooms,
        year_built: args.year_built,
        condition: args.condition,
        current_cold_rent: args.current_cold_rent,
    }
}

/// Build a `WidgetConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> WidgetConfig {
    WidgetConfig {
        endpoint: args.endpoint.clone(),
        user_agent: format!("rent-widget/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.request_timeout),
        finish_delay: Duration::from(args.finish_delay),
        progress: ProgressConfig {
            tick_interval: Duration::from(args.tick_interval),
            seed: args.seed,
            ..ProgressConfig::default()
        },
    }
}

/// Line count of the latest rendering, measured as the widget's height.
#[derive(Default)]
struct RenderedView {
    lines: AtomicU32,
}

impl RenderedView {
    fn update(&self, lines: &[String]) {
        self.lines.store(lines.len() as u32, Ordering::Relaxed);
    }
}

impl MeasuredElement for RenderedView {
    fn content_height(&self) -> u32 {
        self.lines.load(Ordering::Relaxed) * LINE_HEIGHT_PX + FRAME_PADDING_PX
    }
}

/// JSON output for `--json`.
#[derive(Serialize)]
struct Report<'a> {
    completed_at_utc: String,
    input: &'a SubmissionInput,
    result: &'a AnalysisResult,
}

/// Forward terminal resizes to the resize reporter until either side goes away.
async fn forward_viewport_resizes<S>(mut resizes: S, layout_tx: mpsc::UnboundedSender<LayoutEvent>)
where
    S: Stream<Item = ()> + Unpin,
{
    while resizes.next().await.is_some() {
        if layout_tx.send(LayoutEvent::ViewportResized).is_err() {
            break;
        }
    }
}

#[cfg(unix)]
fn terminal_resizes() -> Option<BoxStream<'static, ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::window_change()) {
        Ok(winch) => Some(
            futures::stream::unfold(winch, |mut winch| async move {
                winch.recv().await.map(|()| ((), winch))
            })
            .boxed(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "cannot watch terminal resizes");
            None
        }
    }
}

#[cfg(not(unix))]
fn terminal_resizes() -> Option<BoxStream<'static, ()>> {
    None
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let service = HttpAnalysisService::new(&cfg).context("failed to set up analysis client")?;
    run_with_service(args, Arc::new(service)).await
}

/// Drive one analysis against `service`, including user retries, and print the outcome.
pub async fn run_with_service(args: Cli, service: Arc<dyn AnalysisService>) -> Result<()> {
    let cfg = build_config(&args);
    let input = build_input(&args);
    form::validate(&input, form::current_year()).context("invalid property data")?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WidgetEvent>();
    let (handle, controller) = AnalysisOrchestrator::spawn(cfg, service, event_tx);

    let rendered = Arc::new(RenderedView::default());
    let (layout_tx, layout_rx) = mpsc::unbounded_channel::<LayoutEvent>();
    let mut resize_forwarder = None;
    let _observation = if args.host_messages {
        if let Some(resizes) = terminal_resizes() {
            resize_forwarder = Some(tokio::spawn(forward_viewport_resizes(
                resizes,
                layout_tx.clone(),
            )));
        }
        let sink = Arc::new(JsonLineSink::new(std::io::stdout()));
        Some(ResizeReporter::observe(rendered.clone(), sink, layout_rx))
    } else {
        None
    };

    handle.submit(input);
    let mut retries_left = args.retries;

    let outcome = loop {
        tokio::select! {
            ev = event_rx.recv() => {
                let Some(ev) = ev else {
                    break Err(anyhow::anyhow!("analysis orchestrator stopped unexpectedly"));
                };
                let state = match ev {
                    WidgetEvent::Info(info) => {
                        tracing::debug!("{}", info.to_message());
                        continue;
                    }
                    WidgetEvent::StateChanged { state } => state,
                };

                let summary = build_text_summary(&view::project(&state))?;
                rendered.update(&summary.lines);
                let _ = layout_tx.send(LayoutEvent::ViewStateChanged);

                match state {
                    RequestState::Idle => {}
                    RequestState::Pending { .. } => {
                        if !args.json && !args.quiet {
                            for line in summary.lines {
                                let _ = out_tx.send(OutputLine::Stderr(line));
                            }
                        }
                    }
                    RequestState::Succeeded { input, result } => {
                        break Ok((input, result, summary));
                    }
                    RequestState::Failed { error, .. } => {
                        if retries_left == 0 {
                            break Err(anyhow::anyhow!(error.message));
                        }
                        retries_left -= 1;
                        let _ = out_tx.send(OutputLine::Stderr(format!(
                            "{} Neuer Versuch ({} verbleibend)...",
                            error.message, retries_left
                        )));
                        handle.retry();
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break Err(anyhow::anyhow!("interrupted"));
            }
        }
    };

    handle.shutdown();
    let _ = controller.await;
    if let Some(forwarder) = resize_forwarder {
        forwarder.abort();
    }

    let res = match outcome {
        Ok((input, result, summary)) => {
            if args.json {
                let report = Report {
                    completed_at_utc: time::OffsetDateTime::now_utc()
                        .format(&time::format_description::well_known::Rfc3339)
                        .unwrap_or_else(|_| "now".into()),
                    input: &input,
                    result: &result,
                };
                let out = serde_json::to_string_pretty(&report)?;
                let _ = out_tx.send(OutputLine::Stdout(out));
            } else {
                for line in summary.lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            Ok(())
        }
        Err(e) => Err(e),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}
