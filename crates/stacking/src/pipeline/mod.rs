//! Concurrent archive-to-composite pipeline.
//!
//! One [`Dispatcher`] fills a bounded [`WorkQueue`] with archives followed by
//! one [`WorkItem::Shutdown`] per worker. Each [`Worker`] owns a private
//! [`crate::Workspace`], processes archives one at a time and reports to the
//! [`ProgressAggregator`], which ends the run after one terminal event per
//! worker.

mod pool;
mod progress;
mod queue;
mod worker;

use std::path::PathBuf;

pub use pool::{run_pipeline, WorkerPool};
pub use progress::{
    progress_channel, EventKind, ProgressAggregator, ProgressEvent, ProgressReceiver,
    ProgressSender, RunSummary,
};
pub use queue::{work_queue, Dispatched, Dispatcher, WorkItem, WorkQueue, WorkSender};
pub use worker::{Worker, WorkerContext, WorkerExit, WorkerState};

/// Successful result of processing one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A new composite was written at this path
    Built(PathBuf),
    /// The composite already existed; nothing was extracted or built
    AlreadyProcessed(PathBuf),
}
