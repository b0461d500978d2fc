use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

use crate::model::{Decoder, ReplicaSlot};
use super::job::Job;

/// Shared FIFO of sub-batches waiting for a worker
pub(crate) type JobQueue = Arc<Mutex<VecDeque<Job>>>;

/// Worker loop bound to one replica.
///
/// Pulls the oldest queued job, decodes it on `replica` and publishes the
/// outcome to the job's submitter. A failing job only fails its own
/// submission; the loop carries on with the next one. When the queue is
/// empty the loop parks on `notifier`, re-checking periodically so a missed
/// wake-up or a shutdown is never waited on forever.
pub(crate) async fn serve<M: Decoder>(
    replica: ReplicaSlot<M>,
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
    queue: JobQueue,
) {
    let worker = replica.spec().index;
    debug!(worker, device = %replica.spec().device, "worker started");

    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let next = {
            let mut jobs = queue.lock().await;
            jobs.pop_front()
        };

        match next {
            Some(job) => run_job(worker, &replica, job).await,
            None => {
                // No work to do, wait for notification or check periodically
                let _ = timeout_await_notifier(&notifier).await;
            }
        }
    }
}

async fn run_job<M: Decoder>(worker: usize, replica: &ReplicaSlot<M>, job: Job) {
    let submission = job.submission();
    let offset = job.offset();
    let size = job.len();

    if job.is_abandoned() {
        debug!(worker, %submission, offset, "skipping sub-batch of abandoned submission");
        return;
    }

    let (sub_batch, options, sender) = job.into_parts();
    let started = Instant::now();
    let outcome = replica.decode(sub_batch, options).await;
    let elapsed_ms = started.elapsed().as_millis();

    match &outcome {
        Ok(_) => debug!(worker, %submission, offset, size, elapsed_ms, "sub-batch decoded"),
        Err(e) => warn!(worker, %submission, offset, size, error = %e, "sub-batch failed"),
    }

    if sender.send(outcome).is_err() {
        debug!(worker, %submission, offset, "submitter went away, discarding results");
    }
}

#[inline]
async fn timeout_await_notifier(notifier: &Notify) -> Result<(), Elapsed> {
    tokio::time::timeout(Duration::from_millis(100), notifier.notified()).await
}
