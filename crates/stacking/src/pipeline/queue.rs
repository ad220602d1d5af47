//! Bounded work queue and the single producer that fills it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Result, StackError};
use crate::scanner::Scanner;

/// One unit pulled from the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Archive to turn into a composite
    Archive(PathBuf),
    /// Poison pill: the worker that receives it stops
    Shutdown,
}

/// Producer half of the work queue.
pub type WorkSender = mpsc::Sender<WorkItem>;

/// Consumer half of the work queue, shared by every worker.
///
/// Each item is handed to exactly one caller of [`WorkQueue::next`].
#[derive(Debug, Clone)]
pub struct WorkQueue {
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl WorkQueue {
    /// Wait for the next item; `None` once the producer is gone and the
    /// queue is drained.
    pub async fn next(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }
}

/// Create a work queue holding at most `capacity` pending items.
pub fn work_queue(capacity: usize) -> (WorkSender, WorkQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        tx,
        WorkQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Counts reported by a finished dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub archives: usize,
    pub tokens: usize,
}

/// Enqueues every scanned archive, then one [`WorkItem::Shutdown`] per worker.
///
/// Runs on a blocking thread: the directory walk is synchronous and
/// [`mpsc::Sender::blocking_send`] applies the queue's backpressure.
#[derive(Debug)]
pub struct Dispatcher {
    scanner: Scanner,
    workers: usize,
}

impl Dispatcher {
    pub fn new(scanner: Scanner, workers: usize) -> Self {
        Self { scanner, workers }
    }

    /// Fill the queue. Must not be called from an async context.
    ///
    /// A scan error stops dispatch before any token is sent; dropping the
    /// sender then closes the queue, which workers treat as shutdown.
    pub fn dispatch(self, tx: WorkSender) -> Result<Dispatched> {
        let root = self.scanner.root().to_path_buf();
        let mut archives = 0;

        for archive in self.scanner {
            let archive = archive?;
            debug!(archive = %archive.display(), "Enqueueing archive");
            send(&tx, WorkItem::Archive(archive))?;
            archives += 1;
        }

        // Every archive is queued; a closed queue now only means no worker
        // is left to need its token.
        let mut tokens = 0;
        while tokens < self.workers {
            if tx.blocking_send(WorkItem::Shutdown).is_err() {
                warn!(
                    sent = tokens,
                    expected = self.workers,
                    "Work queue closed before every shutdown token was delivered"
                );
                break;
            }
            tokens += 1;
        }

        info!(
            root = %root.display(),
            archives = archives,
            tokens = tokens,
            "Dispatch complete"
        );

        Ok(Dispatched { archives, tokens })
    }
}

fn send(tx: &WorkSender, item: WorkItem) -> Result<()> {
    tx.blocking_send(item)
        .map_err(|_| StackError::WorkerFatal("work queue closed: no workers left".to_string()))
}
