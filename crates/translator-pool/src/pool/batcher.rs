use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use crate::batch::Batch;
use crate::config::TranslatorConfig;
use crate::error::{ModelLoadError, Result, TranslationError};
use crate::model::{ModelLoader, ReplicaSlot, ReplicaSpec};
use crate::options::TranslationOptions;
use crate::serving::job::Job;
use crate::serving::serve::{JobQueue, serve};
use crate::serving::worker::WorkerHandle;
use super::core_trait::TranslationBatcher;
use super::pending::PendingTranslation;

/// # TranslatorPool
///
/// A fixed set of model replicas, each served by one worker, behind a shared
/// FIFO of sub-batches.
///
/// Submissions are split by `max_batch_size`, queued, and claimed by
/// whichever worker is idle. Results are reassembled in input order no
/// matter which worker finishes first. Independent submissions share the
/// workers and may interleave freely.
///
/// Must be created and used inside a tokio runtime; the workers are tokio
/// tasks and decode on the runtime's blocking threads.
pub struct TranslatorPool {
    /// Thread-safe queue of sub-batches waiting for a worker
    queue: JobQueue,

    /// Wakes an idle worker when work is queued
    notifier: Arc<Notify>,

    workers: Vec<WorkerHandle>,

    replicas: Vec<ReplicaSpec>,
}

impl TranslatorPool {
    /// Loads `config.inter_threads` replicas through `loader` and starts one
    /// worker per replica.
    ///
    /// Construction is all-or-nothing: replicas are loaded before any worker
    /// starts, and if one fails to load, the ones already loaded are dropped.
    ///
    /// # Errors
    ///
    /// [`ModelLoadError::InvalidConfig`] for an unusable config,
    /// [`ModelLoadError::Replica`] naming the first replica that failed.
    pub fn new<L>(
        loader: &L,
        config: &TranslatorConfig,
    ) -> std::result::Result<Self, ModelLoadError>
    where
        L: ModelLoader,
    {
        config.validate()?;

        let specs = config.replica_specs();
        let mut slots = Vec::with_capacity(specs.len());
        for spec in specs.iter() {
            let model = loader.load(spec).map_err(|message| ModelLoadError::Replica {
                index: spec.index,
                device: spec.device,
                message,
            })?;
            slots.push(ReplicaSlot::new(spec.clone(), model));
        }

        let queue: JobQueue = Default::default();
        let notifier = Arc::new(Notify::new());
        let workers = slots
            .into_iter()
            .map(|slot| {
                let queue = queue.clone();
                WorkerHandle::new(slot.spec().index, notifier.clone(), move |running, notifier| {
                    tokio::spawn(serve(slot, running, notifier, queue))
                })
            })
            .collect();

        info!(
            replicas = config.inter_threads,
            intra_threads = config.intra_threads,
            device = %config.device,
            compute_type = %config.compute_type,
            "translator pool started"
        );

        Ok(Self {
            queue,
            notifier,
            workers,
            replicas: specs,
        })
    }

    /// Placement of each replica, indexed like the workers.
    pub fn replicas(&self) -> &[ReplicaSpec] {
        &self.replicas
    }

    pub fn num_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// Number of sub-batches waiting for a worker.
    pub async fn queued(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Stops all workers. Sub-batches being decoded finish; queued ones are
    /// dropped and their submissions fail with
    /// [`TranslationError::PoolClosed`].
    pub async fn shutdown(&mut self) {
        for worker in self.workers.iter_mut() {
            worker.shutdown();
        }
        let dropped: Vec<Job> = self.queue.lock().await.drain(..).collect();
        info!(dropped = dropped.len(), "translator pool stopped");
    }

    fn is_running(&self) -> bool {
        self.workers.iter().any(WorkerHandle::is_running)
    }
}

#[async_trait]
impl TranslationBatcher for TranslatorPool {
    async fn submit(
        &self,
        batch: Batch,
        options: TranslationOptions,
    ) -> Result<PendingTranslation> {
        if batch.is_empty() {
            return Err(TranslationError::invalid("batch is empty"));
        }
        options.validate()?;
        if !self.is_running() {
            return Err(TranslationError::PoolClosed);
        }

        let id = Uuid::new_v4();
        let num_examples = batch.len();
        let options = Arc::new(options);
        let sub_batches = batch.split(options.max_batch_size);
        let num_sub_batches = sub_batches.len();

        let mut receivers = Vec::with_capacity(num_sub_batches);
        {
            let mut queue = self.queue.lock().await;
            for sub_batch in sub_batches {
                let (tx, rx) = oneshot::channel();
                queue.push_back(Job::new(id, sub_batch, options.clone(), tx));
                receivers.push(rx);
            }
        }
        // Notify the workers that new work is available
        for _ in 0..num_sub_batches {
            self.notifier.notify_one();
        }

        debug!(
            submission = %id,
            examples = num_examples,
            sub_batches = num_sub_batches,
            "submission enqueued"
        );
        Ok(PendingTranslation::new(id, num_examples, receivers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Tokens, tokenize};
    use crate::error::DecodeError;
    use crate::model::mock_model::{EchoDecoder, FailingDecoder, Occupancy, OccupancyDecoder};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn echo_loader(_spec: &ReplicaSpec) -> std::result::Result<EchoDecoder, String> {
        Ok(EchoDecoder::new())
    }

    fn pool_of<L: ModelLoader>(loader: &L, replicas: usize) -> TranslatorPool {
        let config = TranslatorConfig::new("model").with_threads(replicas, 1);
        TranslatorPool::new(loader, &config).unwrap()
    }

    fn lines(n: usize) -> Vec<Tokens> {
        (0..n).map(|i| tokenize(&format!("line {}", i))).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_examples_with_two_hypotheses() {
        let loader = |_: &ReplicaSpec| Ok::<_, String>(EchoDecoder::with_hypotheses(2));
        let pool = pool_of(&loader, 1);
        let batch = Batch::new(vec![tokenize("a b"), tokenize("c")]);
        let options = TranslationOptions::default().with_beam_size(2).with_num_hypotheses(2);

        let results = pool.translate(batch, options).await.unwrap();

        assert_eq!(results.len(), 2);
        for result in results.iter() {
            assert!(result.num_hypotheses() <= 2);
            for hypothesis in result.hypotheses() {
                assert!(!hypothesis.tokens.is_empty());
                assert!(hypothesis.score.is_finite());
            }
        }
        assert_eq!(results[0].best().unwrap().tokens, tokenize("a b"));
        assert_eq!(results[1].best().unwrap().tokens, tokenize("c"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_preserved_under_uneven_latency() {
        // later examples finish first
        fn delay(example: &[String]) -> Duration {
            let index: u64 = example[1].parse().unwrap();
            Duration::from_millis(40u64.saturating_sub(index * 4))
        }
        let loader = |_: &ReplicaSpec| Ok::<_, String>(EchoDecoder::new().delayed(delay));
        let pool = pool_of(&loader, 4);
        let source = lines(10);

        let options = TranslationOptions::default().with_max_batch_size(1);
        let results = pool.translate(Batch::new(source.clone()), options).await.unwrap();

        let outputs: Vec<Tokens> = results
            .iter()
            .map(|r| r.best().unwrap().tokens.clone())
            .collect();
        assert_eq!(outputs, source);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sub_batches_bounded_by_max_batch_size() {
        let sizes = Arc::new(Mutex::new(vec![]));
        let loader = {
            let sizes = sizes.clone();
            move |_: &ReplicaSpec| Ok::<_, String>(EchoDecoder::new().recording(sizes.clone()))
        };
        let pool = pool_of(&loader, 2);

        let results = pool
            .translate(Batch::new(lines(10)), TranslationOptions::default().with_max_batch_size(3))
            .await
            .unwrap();
        assert_eq!(results.len(), 10);

        let mut sizes = sizes.lock().unwrap().clone();
        sizes.sort();
        assert_eq!(sizes, vec![1, 3, 3, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unbounded_batch_decoded_in_one_call() {
        let sizes = Arc::new(Mutex::new(vec![]));
        let loader = {
            let sizes = sizes.clone();
            move |_: &ReplicaSpec| Ok::<_, String>(EchoDecoder::new().recording(sizes.clone()))
        };
        let pool = pool_of(&loader, 2);

        pool.translate(Batch::new(lines(25)), TranslationOptions::default())
            .await
            .unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![25]);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_batch() {
        let pool = pool_of(&echo_loader, 1);
        let result = pool.submit(Batch::default(), TranslationOptions::default()).await;
        assert!(matches!(result, Err(TranslationError::InvalidArgument(_))));
        assert_eq!(pool.queued().await, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_options() {
        let pool = pool_of(&echo_loader, 1);
        let options = TranslationOptions::default().with_decoding_length(10, 1);
        let result = pool.submit(Batch::new(lines(2)), options).await;
        assert!(matches!(result, Err(TranslationError::InvalidArgument(_))));
        assert_eq!(pool.queued().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_decode_failure_isolated_to_its_submission() {
        let loader = |_: &ReplicaSpec| Ok::<_, String>(FailingDecoder::on_token("boom"));
        let pool = pool_of(&loader, 2);
        let options = TranslationOptions::default().with_max_batch_size(1);

        let source = vec![tokenize("ok"), tokenize("boom"), tokenize("ok")];
        let failing = pool.submit(Batch::new(source), options.clone()).await.unwrap();
        let healthy = pool.submit(Batch::new(lines(4)), options.clone()).await.unwrap();

        let (failing, healthy) = tokio::join!(failing, healthy);
        assert!(matches!(failing, Err(TranslationError::Decode(DecodeError::Model(_)))));
        assert_eq!(healthy.unwrap().len(), 4);

        // workers keep serving afterwards
        let after = pool.translate(Batch::new(lines(3)), options).await.unwrap();
        assert_eq!(after.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_submission_is_skipped() {
        fn delay(example: &[String]) -> Duration {
            if example[0] == "slow" {
                Duration::from_millis(200)
            } else {
                Duration::ZERO
            }
        }
        let sizes = Arc::new(Mutex::new(vec![]));
        let loader = {
            let sizes = sizes.clone();
            move |_: &ReplicaSpec| {
                Ok::<_, String>(EchoDecoder::new().delayed(delay).recording(sizes.clone()))
            }
        };
        let pool = pool_of(&loader, 1);

        let slow = pool
            .submit(Batch::new(vec![tokenize("slow")]), TranslationOptions::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let abandoned = pool
            .submit(Batch::new(lines(3)), TranslationOptions::default())
            .await
            .unwrap();
        drop(abandoned);

        assert_eq!(slow.await.unwrap().len(), 1);
        let kept = pool
            .translate(Batch::new(lines(2)), TranslationOptions::default())
            .await
            .unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(*sizes.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_replica_load_creates_no_pool() {
        let loaded = Arc::new(AtomicUsize::new(0));
        let loader = {
            let loaded = loaded.clone();
            move |spec: &ReplicaSpec| {
                if spec.index == 2 {
                    return Err("device 2 unavailable".to_string());
                }
                loaded.fetch_add(1, Ordering::SeqCst);
                Ok(EchoDecoder::new())
            }
        };
        let config = TranslatorConfig::new("model").with_threads(3, 1);

        let err = TranslatorPool::new(&loader, &config).err().unwrap();
        assert!(matches!(err, ModelLoadError::Replica { index: 2, .. }));
        assert_eq!(loaded.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_replicas_follow_config() {
        let pool = pool_of(&echo_loader, 3);
        assert_eq!(pool.num_replicas(), 3);
        assert!(pool.replicas().iter().enumerate().all(|(i, spec)| spec.index == i));
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let mut pool = pool_of(&echo_loader, 2);
        pool.shutdown().await;

        let result = pool.submit(Batch::new(lines(1)), TranslationOptions::default()).await;
        assert!(matches!(result, Err(TranslationError::PoolClosed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_replica_decodes_one_sub_batch_at_a_time() {
        let replicas: Vec<Occupancy> = (0..3).map(|_| Occupancy::default()).collect();
        let total = Occupancy::default();
        let loader = |spec: &ReplicaSpec| {
            let hold = Duration::from_millis(5);
            let replica = replicas[spec.index].clone();
            Ok::<_, String>(OccupancyDecoder::new(replica, total.clone(), hold))
        };
        let pool = pool_of(&loader, 3);
        let options = TranslationOptions::default().with_max_batch_size(2);

        let submissions = (0..8).map(|_| pool.translate(Batch::new(lines(10)), options.clone()));
        let outcomes = futures::future::join_all(submissions).await;

        for outcome in outcomes {
            assert_eq!(outcome.unwrap().len(), 10);
        }
        for replica in replicas.iter() {
            assert_eq!(replica.peak(), 1);
        }
        assert!(total.peak() <= pool.num_replicas());
    }
}
