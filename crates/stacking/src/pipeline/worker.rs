//! Per-worker processing loop.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use scene_common::{ProductCode, SceneId};
use tracing::debug;

use super::progress::{EventKind, ProgressEvent, ProgressSender};
use super::queue::{WorkItem, WorkQueue};
use super::ItemOutcome;
use crate::bands::BandSet;
use crate::error::{Result, StackError};
use crate::extract::extract;
use crate::stack::{output_path, StackBuilder, StackJob, StackPhase};
use crate::workspace::Workspace;

/// Settings shared read-only by every worker of a run.
#[derive(Clone)]
pub struct WorkerContext {
    pub product: ProductCode,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub builder: StackBuilder,
}

/// Position of a worker in its processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Extracting,
    Resolving,
    Building,
    Failed,
    Cleaning,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why a worker left its loop normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Received its shutdown token
    Shutdown,
    /// The queue closed and drained without a token
    QueueClosed,
}

/// One consumer of the work queue with its own workspace.
pub struct Worker {
    index: usize,
    queue: WorkQueue,
    events: ProgressSender,
    ctx: Arc<WorkerContext>,
}

impl Worker {
    pub fn new(
        index: usize,
        queue: WorkQueue,
        events: ProgressSender,
        ctx: Arc<WorkerContext>,
    ) -> Self {
        Self {
            index,
            queue,
            events,
            ctx,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Pull and process items until a shutdown token arrives.
    ///
    /// Item failures are reported and do not end the loop. An error returned
    /// from here means the worker itself broke (its workspace could not be
    /// created, emptied or removed). The terminal event is not sent here; the
    /// supervisor emits it once this future completes.
    pub async fn run(self) -> Result<WorkerExit> {
        let workspace = Workspace::create(&self.ctx.work_dir, self.index).await?;
        self.transition(WorkerState::Idle);

        let exit = loop {
            let archive = match self.queue.next().await {
                Some(WorkItem::Archive(archive)) => archive,
                Some(WorkItem::Shutdown) => break WorkerExit::Shutdown,
                None => break WorkerExit::QueueClosed,
            };

            let outcome = AssertUnwindSafe(self.process(&workspace, &archive))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(StackError::WorkerFatal(panic_message(panic.as_ref()))));

            match outcome {
                Ok(ItemOutcome::Built(output)) => self.emit(
                    EventKind::Built,
                    format!("Built {}", output.display()),
                ),
                Ok(ItemOutcome::AlreadyProcessed(output)) => self.emit(
                    EventKind::Skipped,
                    format!("Skipped {}: {} exists", archive.display(), output.display()),
                ),
                Err(e) => {
                    self.transition(WorkerState::Failed);
                    self.emit(
                        EventKind::Failed { error: e.kind() },
                        format!("{} processing {}: {}", e.kind(), archive.display(), e),
                    );
                }
            }

            self.transition(WorkerState::Cleaning);
            workspace.purge().await?;
            self.transition(WorkerState::Idle);
        };

        self.transition(WorkerState::ShuttingDown);
        workspace.remove().await?;
        self.transition(WorkerState::Terminated);
        Ok(exit)
    }

    async fn process(&self, workspace: &Workspace, archive: &Path) -> Result<ItemOutcome> {
        let ctx = &self.ctx;
        let scene = SceneId::from_archive_path(archive, &ctx.product)?;

        let output = output_path(&ctx.output_dir, &scene, &ctx.product);
        if output.exists() {
            return Ok(ItemOutcome::AlreadyProcessed(output));
        }

        self.transition(WorkerState::Extracting);
        self.emit_step(format!("Unpacking {}", archive.display()));
        let src = archive.to_path_buf();
        let dest = workspace.path().to_path_buf();
        let files = tokio::task::spawn_blocking(move || extract(&src, &dest))
            .await
            .map_err(|e| StackError::WorkerFatal(format!("extraction task failed: {}", e)))??;
        debug!(worker = self.index, files = files.len(), "Unpacked");

        self.transition(WorkerState::Resolving);
        let bands = BandSet::resolve(&scene, &ctx.product).locate(workspace.path())?;

        self.transition(WorkerState::Building);
        let job = StackJob::new(scene, &ctx.product, bands, workspace.path(), &ctx.output_dir);
        let output = ctx
            .builder
            .build(&job, |phase| match phase {
                StackPhase::BuildingDescriptor => {
                    self.emit_step(format!("Building VRT stack for {}", job.scene))
                }
                StackPhase::Materializing => self.emit_step(format!(
                    "Calling translate for {}",
                    job.output.display()
                )),
            })
            .await?;

        Ok(ItemOutcome::Built(output))
    }

    fn transition(&self, state: WorkerState) {
        debug!(worker = self.index, state = %state, "Worker state");
    }

    fn emit_step(&self, message: String) {
        self.emit(EventKind::Step, message);
    }

    fn emit(&self, kind: EventKind, message: String) {
        if self
            .events
            .send(ProgressEvent::new(self.index, kind, message))
            .is_err()
        {
            debug!(worker = self.index, "Progress channel closed");
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
