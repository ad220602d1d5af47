//! Wiring of dispatcher, supervised workers and the aggregator.

use std::sync::Arc;

use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::progress::{
    progress_channel, EventKind, ProgressAggregator, ProgressEvent, ProgressSender, RunSummary,
};
use super::queue::{work_queue, Dispatcher};
use super::worker::{panic_message, Worker, WorkerContext, WorkerExit};
use crate::config::StackerConfig;
use crate::error::{Result, StackError};
use crate::raster::RasterTool;
use crate::scanner::Scanner;
use crate::stack::StackBuilder;

/// A fixed number of workers fed by one dispatcher.
pub struct WorkerPool {
    config: StackerConfig,
    tool: Arc<dyn RasterTool>,
}

impl WorkerPool {
    pub fn new(config: StackerConfig, tool: Arc<dyn RasterTool>) -> Self {
        Self { config, tool }
    }

    /// Process every archive under the input directory.
    ///
    /// Returns once every worker has terminated. Per-item failures only show
    /// up in the summary; an error here means the configuration was invalid,
    /// the input tree could not be scanned, or no worker was left to take
    /// the remaining archives.
    pub async fn run(self) -> Result<RunSummary> {
        let config = self.config;
        config.validate()?;

        fs::create_dir_all(&config.output_dir).await?;
        fs::create_dir_all(&config.work_dir).await?;

        info!(
            input = %config.input_dir.display(),
            output = %config.output_dir.display(),
            product = %config.product,
            workers = config.workers,
            "Starting stacking run"
        );

        let (work_tx, queue) = work_queue(config.queue_capacity);
        let (events, event_rx) = progress_channel();
        let aggregator = tokio::spawn(ProgressAggregator::new(event_rx, config.workers).run());

        let ctx = Arc::new(WorkerContext {
            product: config.product.clone(),
            output_dir: config.output_dir.clone(),
            work_dir: config.work_dir.clone(),
            builder: StackBuilder::new(self.tool),
        });

        let supervisors: Vec<JoinHandle<()>> = (0..config.workers)
            .map(|index| {
                let worker = Worker::new(index, queue.clone(), events.clone(), ctx.clone());
                tokio::spawn(supervise(worker, events.clone()))
            })
            .collect();
        drop(events);
        drop(queue);

        let dispatcher = Dispatcher::new(
            Scanner::new(&config.input_dir, &config.product),
            config.workers,
        );
        let dispatched = tokio::task::spawn_blocking(move || dispatcher.dispatch(work_tx))
            .await
            .map_err(|e| StackError::WorkerFatal(format!("dispatcher task failed: {}", e)))
            .and_then(|result| result);

        let summary = aggregator
            .await
            .map_err(|e| StackError::WorkerFatal(format!("progress aggregator failed: {}", e)))?;
        for supervisor in supervisors {
            if let Err(e) = supervisor.await {
                error!(error = %e, "Worker supervisor failed");
            }
        }

        debug!(
            terminated = summary.terminated,
            abnormal = summary.abnormal,
            "All workers terminated"
        );

        match dispatched {
            Ok(_) => Ok(summary),
            Err(e) => {
                error!(error = %e, "Dispatch aborted");
                Err(e)
            }
        }
    }
}

/// Run `worker` to completion and report its single terminal event.
///
/// The event is marked abnormal when the worker returned an error or
/// panicked, so the aggregator's count completes either way.
async fn supervise(worker: Worker, events: ProgressSender) {
    let index = worker.index();
    let event = match tokio::spawn(worker.run()).await {
        Ok(Ok(WorkerExit::Shutdown)) => ProgressEvent::new(
            index,
            EventKind::Terminated { abnormal: false },
            format!("Worker {} received shutdown token", index),
        ),
        Ok(Ok(WorkerExit::QueueClosed)) => ProgressEvent::new(
            index,
            EventKind::Terminated { abnormal: false },
            format!("Worker {} stopped: work queue closed", index),
        ),
        Ok(Err(e)) => ProgressEvent::new(
            index,
            EventKind::Terminated { abnormal: true },
            format!("Worker {} terminated abnormally: {}", index, e),
        ),
        Err(join_error) => {
            let reason = match join_error.try_into_panic() {
                Ok(panic) => panic_message(panic.as_ref()),
                Err(e) => e.to_string(),
            };
            ProgressEvent::new(
                index,
                EventKind::Terminated { abnormal: true },
                format!("Worker {} terminated abnormally: {}", index, reason),
            )
        }
    };
    // The aggregator outlives every supervisor, so this only fails if it crashed.
    let _ = events.send(event);
}

/// Convenience wrapper around [`WorkerPool::run`].
pub async fn run_pipeline(config: StackerConfig, tool: Arc<dyn RasterTool>) -> Result<RunSummary> {
    WorkerPool::new(config, tool).run().await
}
