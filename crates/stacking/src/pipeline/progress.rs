//! Progress reporting and the run's completion barrier.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// What a progress event reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A milestone inside one item (unpacking, building, translating)
    Step,
    /// A composite was written
    Built,
    /// The composite already existed
    Skipped,
    /// The item failed; carries the error class
    Failed { error: &'static str },
    /// The worker stopped; emitted exactly once per worker
    Terminated { abnormal: bool },
}

/// One message from a worker to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub worker: usize,
    pub message: String,
    pub kind: EventKind,
}

impl ProgressEvent {
    pub fn new(worker: usize, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            worker,
            message: message.into(),
            kind,
        }
    }

    pub fn step(worker: usize, message: impl Into<String>) -> Self {
        Self::new(worker, EventKind::Step, message)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Terminated { .. })
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker{}: {}", self.worker, self.message)
    }
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Terminal events observed
    pub terminated: usize,
    /// Workers that stopped outside the per-item boundary
    pub abnormal: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Items that reached a final outcome.
    pub fn processed(&self) -> usize {
        self.built + self.skipped + self.failed
    }

    fn record(&mut self, event: &ProgressEvent) {
        match event.kind {
            EventKind::Step => {}
            EventKind::Built => self.built += 1,
            EventKind::Skipped => self.skipped += 1,
            EventKind::Failed { .. } => self.failed += 1,
            EventKind::Terminated { abnormal } => {
                self.terminated += 1;
                if abnormal {
                    self.abnormal += 1;
                }
            }
        }
    }
}

/// Single consumer of every [`ProgressEvent`].
///
/// Logs each event and returns once it has counted one terminal event per
/// worker.
pub struct ProgressAggregator {
    rx: ProgressReceiver,
    workers: usize,
}

impl ProgressAggregator {
    pub fn new(rx: ProgressReceiver, workers: usize) -> Self {
        Self { rx, workers }
    }

    pub async fn run(mut self) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        while summary.terminated < self.workers {
            let Some(event) = self.rx.recv().await else {
                warn!(
                    expected = self.workers,
                    observed = summary.terminated,
                    "Progress channel closed before every worker terminated"
                );
                break;
            };

            log_event(&event);
            summary.record(&event);
        }

        summary.elapsed = started.elapsed();
        summary
    }
}

fn log_event(event: &ProgressEvent) {
    match &event.kind {
        EventKind::Failed { error: kind } => {
            error!(worker = event.worker, error_kind = *kind, "{}", event.message)
        }
        EventKind::Terminated { abnormal: true } => {
            warn!(worker = event.worker, "{}", event.message)
        }
        _ => info!(worker = event.worker, "{}", event.message),
    }
}
