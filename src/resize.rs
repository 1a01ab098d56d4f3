//! Host-frame height synchronization.
//!
//! The embedding page sizes its frame from `setHeight` messages, so every event
//! that can change the widget's height triggers a report. Reports are not
//! de-duplicated: an extra report is harmless, a missed one breaks the layout.

use crate::model::HostMessage;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One-way channel to the embedding host. No acknowledgement is expected.
pub trait HostSink: Send + Sync {
    fn report(&self, message: HostMessage);
}

impl<F> HostSink for F
where
    F: Fn(HostMessage) + Send + Sync,
{
    fn report(&self, message: HostMessage) {
        self(message)
    }
}

/// Writes each host message as one JSON line.
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> HostSink for JsonLineSink<W> {
    fn report(&self, message: HostMessage) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = write_line(&mut *writer, &message) {
            tracing::warn!(error = %e, "failed to forward host message");
        }
    }
}

/// One `write_all` per message so lines from other writers on a shared stream never split it.
fn write_line<W: Write>(writer: &mut W, message: &HostMessage) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()
}

/// Something with a rendered height.
pub trait MeasuredElement: Send + Sync {
    fn content_height(&self) -> u32;
}

/// Events that may change the reported height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEvent {
    /// The observed element's box size changed.
    ContentResized,
    /// The containing viewport was resized.
    ViewportResized,
    /// The view state changed; loading, form, result and error differ in height.
    ViewStateChanged,
}

pub struct ResizeReporter;

impl ResizeReporter {
    /// Report the element's height now and on every layout event until stopped.
    ///
    /// The first report happens before this returns.
    pub fn observe<E, S>(
        element: Arc<E>,
        sink: Arc<S>,
        mut events: UnboundedReceiver<LayoutEvent>,
    ) -> ResizeObservation
    where
        E: MeasuredElement + ?Sized + 'static,
        S: HostSink + ?Sized + 'static,
    {
        report(element.as_ref(), sink.as_ref());

        let token = CancellationToken::new();
        let stop = token.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    ev = events.recv() => match ev {
                        Some(ev) => {
                            tracing::trace!(?ev, "layout changed");
                            report(element.as_ref(), sink.as_ref());
                        }
                        None => break,
                    },
                }
            }
        });
        ResizeObservation { token, task }
    }
}

fn report<E, S>(element: &E, sink: &S)
where
    E: MeasuredElement + ?Sized,
    S: HostSink + ?Sized,
{
    sink.report(HostMessage::set_height(element.content_height()));
}

/// Running observation. Dropping it stops reporting.
pub struct ResizeObservation {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ResizeObservation {
    pub fn stop(&self) {
        self.token.cancel();
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.task.is_finished()
    }
}

impl Drop for ResizeObservation {
    fn drop(&mut self) {
        self.stop();
    }
}
