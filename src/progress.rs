//! Simulated progress feedback while an analysis is in flight.
//!
//! The curve is unrelated to real request progress: it advances quickly at
//! first and decelerates towards [`PROGRESS_CEILING`], which it never passes.
//! Only the orchestrator may show 100%, and only after the call resolved.

use crate::model::{ProgressConfig, ProgressSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Highest percent shown before the analysis call resolves.
pub const PROGRESS_CEILING: f64 = 92.0;

pub const START_LABEL: &str = "Starte Analyse...";
pub const SUCCESS_LABEL: &str = "Analyse abgeschlossen!";

/// Lower bound of each status phase, in ascending order.
const PHASES: [(f64, &str); 4] = [
    (0.0, START_LABEL),
    (25.0, "Analysiere Lage & Umfeld..."),
    (55.0, "Vergleiche Marktmieten..."),
    (80.0, "Berechne Mietpotenzial..."),
];

/// Status phrase for a given percent.
pub fn label_for(percent: f64) -> &'static str {
    PHASES
        .iter()
        .rev()
        .find(|(from, _)| percent >= *from)
        .map(|(_, label)| *label)
        .unwrap_or(START_LABEL)
}

/// Advance `percent` by one tick. `roll` is a uniform sample in `[0, 1)`.
pub fn next_percent(percent: f64, cfg: &ProgressConfig, roll: f64) -> f64 {
    let remaining = (cfg.ceiling - percent).max(0.0);
    let jump = (roll * remaining / cfg.decay_factor.max(1.0)).max(cfg.floor_jump);
    (percent + jump).min(cfg.ceiling)
}

type TickFn = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub struct ProgressSimulator {
    cfg: ProgressConfig,
    rng: StdRng,
}

impl ProgressSimulator {
    pub fn new(cfg: ProgressConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, rng }
    }

    pub fn with_rng(cfg: ProgressConfig, rng: StdRng) -> Self {
        Self { cfg, rng }
    }

    /// Start ticking on the current tokio runtime.
    ///
    /// `on_tick` runs on the timer task and must not call back into the
    /// returned handle.
    pub fn start<F>(self, on_tick: F) -> ProgressHandle
    where
        F: FnMut(ProgressSnapshot) + Send + 'static,
    {
        let token = CancellationToken::new();
        let slot: Arc<Mutex<Option<TickFn>>> = Arc::new(Mutex::new(Some(Box::new(on_tick))));
        let task = tokio::spawn(tick_loop(self.cfg, self.rng, token.clone(), slot.clone()));
        ProgressHandle { token, slot, task }
    }
}

fn lock_slot(slot: &Mutex<Option<TickFn>>) -> MutexGuard<'_, Option<TickFn>> {
    // A panicking callback must not wedge cancellation.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn tick_loop(
    cfg: ProgressConfig,
    mut rng: StdRng,
    token: CancellationToken,
    slot: Arc<Mutex<Option<TickFn>>>,
) {
    let mut interval = tokio::time::interval(cfg.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let mut percent = 0.0;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        percent = next_percent(percent, &cfg, rng.gen::<f64>());
        let snapshot = ProgressSnapshot::new(percent, label_for(percent));
        {
            let mut guard = lock_slot(&slot);
            if token.is_cancelled() {
                break;
            }
            match guard.as_mut() {
                Some(on_tick) => on_tick(snapshot),
                None => break,
            }
        }

        if percent >= cfg.ceiling {
            break;
        }
    }

    lock_slot(&slot).take();
}

/// Handle to a running simulator. Dropping it cancels the simulator.
pub struct ProgressHandle {
    token: CancellationToken,
    slot: Arc<Mutex<Option<TickFn>>>,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    /// Stop ticking. Once this returns, `on_tick` is never invoked again.
    ///
    /// Idempotent, and safe after the simulator reached the ceiling on its own.
    pub fn cancel(&self) {
        self.token.cancel();
        // Waits out a tick that is mid-callback, then drops the callback.
        lock_slot(&self.slot).take();
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the timer task exited, either by cancellation or at the ceiling.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn cfg() -> ProgressConfig {
        ProgressConfig {
            tick_interval: Duration::from_millis(400),
            seed: Some(7),
            ..ProgressConfig::default()
        }
    }

    #[test]
    fn labels_follow_four_phases() {
        assert_eq!(label_for(0.0), START_LABEL);
        assert_eq!(label_for(24.9), START_LABEL);
        assert_eq!(label_for(25.0), "Analysiere Lage & Umfeld...");
        assert_eq!(label_for(60.0), "Vergleiche Marktmieten...");
        assert_eq!(label_for(92.0), "Berechne Mietpotenzial...");
        assert_eq!(label_for(100.0), "Berechne Mietpotenzial...");
    }

    #[test]
    fn jumps_shrink_towards_ceiling_and_never_pass_it() {
        let cfg = cfg();
        let early = next_percent(0.0, &cfg, 0.9) - 0.0;
        let late = next_percent(80.0, &cfg, 0.9) - 80.0;
        assert!(early > late);

        // Floor jump applies even with a zero roll.
        assert_eq!(next_percent(10.0, &cfg, 0.0), 10.5);
        // Floor jump is clamped at the ceiling.
        assert_eq!(next_percent(91.8, &cfg, 0.0), PROGRESS_CEILING);
        assert_eq!(next_percent(PROGRESS_CEILING, &cfg, 0.99), PROGRESS_CEILING);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_monotonic_and_capped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ProgressSimulator::new(cfg()).start(move |s| {
            let _ = tx.send(s);
        });

        let mut last = 0.0;
        let mut count = 0;
        // The channel closes once the simulator reaches the ceiling and drops the callback.
        while let Some(snapshot) = rx.recv().await {
            assert!(snapshot.percent >= last);
            assert!(snapshot.percent <= PROGRESS_CEILING);
            assert_eq!(snapshot.label, label_for(snapshot.percent));
            last = snapshot.percent;
            count += 1;
            if count > 1_000 {
                break;
            }
        }
        assert_eq!(last, PROGRESS_CEILING);
        assert!(handle.is_finished());
        // Cancelling after natural completion is fine, twice.
        handle.cancel();
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ProgressSimulator::new(cfg()).start(move |s| {
            let _ = tx.send(s);
        });

        tokio::time::sleep(Duration::from_millis(1_300)).await;
        let mut seen = 0;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 3);

        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::sleep(Duration::from_secs(30)).await;
        // Callback (and its sender) were dropped: the channel is closed and empty.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ProgressSimulator::new(cfg()).start(move |s| {
            let _ = tx.send(s);
        });
        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.recv().await.is_none());
    }
}
