//! Module for managing the background tasks that serve queued sub-batches.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::{runtime::Handle, sync::Notify, task::JoinHandle};
use tracing::{debug, warn};

/// A handle for one pool worker running as a tokio task.
///
/// All workers of a pool share one notifier: a submission wakes whichever
/// worker is idle. Each worker has its own running flag so it can be stopped
/// independently.
///
/// # Example
///
/// ```ignore
/// let notifier = Arc::new(Notify::new());
/// let worker = WorkerHandle::new(0, notifier.clone(), |running, notifier| {
///     tokio::spawn(async move {
///         while running.load(Ordering::SeqCst) {
///             notifier.notified().await;
///             // pull work from the shared queue
///         }
///     })
/// });
///
/// notifier.notify_one();
/// // worker is shut down when dropped
/// ```
pub struct WorkerHandle {
    /// Position of the worker in its pool
    index: usize,

    /// Flag indicating whether the background task should continue running
    running: Arc<AtomicBool>,

    /// Handle to the spawned task, `None` once shutdown has been initiated
    handle: Option<JoinHandle<()>>,

    /// Notifier shared with the other workers of the pool
    notifier: Arc<Notify>,
}

impl WorkerHandle {
    /// Creates a new `WorkerHandle` by spawning a background task.
    ///
    /// # Parameters
    ///
    /// * `index` - Position of this worker in the pool
    /// * `notifier` - Wake-up signal shared by the pool's workers
    /// * `task` - Spawns the worker loop given its running flag and the notifier
    pub fn new<F>(index: usize, notifier: Arc<Notify>, task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>, Arc<Notify>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let handle = task(running.clone(), notifier.clone());

        Self {
            index,
            running,
            handle: Some(handle),
            notifier,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the worker has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Initiates a graceful shutdown of the worker.
    ///
    /// The worker finishes the sub-batch it is decoding, if any, and then
    /// exits its loop. The task is detached; when called inside a runtime its
    /// exit status is logged.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_waiters();

        if let Some(handle) = self.handle.take() {
            let index = self.index;
            if let Ok(runtime) = Handle::try_current() {
                runtime.spawn(async move {
                    match handle.await {
                        Ok(()) => debug!(worker = index, "worker stopped"),
                        Err(e) => warn!(worker = index, error = %e, "worker task ended abnormally"),
                    }
                });
            }
        }
    }
}

impl Drop for WorkerHandle {
    /// Ensures the background task is told to stop when the handle is dropped.
    fn drop(&mut self) {
        self.shutdown();
    }
}
