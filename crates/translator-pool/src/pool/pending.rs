use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{Result, TranslationError};
use crate::result::TranslationResult;
use crate::serving::job::JobOutcome;

/// # PendingTranslation
///
/// Future for the results of one submission.
///
/// Resolves once every sub-batch has been decoded, with the results in input
/// order. Sub-batches are awaited in completion order; if any fails, the whole
/// submission fails with that error at once, the results of sub-batches that
/// already finished are dropped and the ones still queued are skipped by the
/// workers.
///
/// Dropping a `PendingTranslation` abandons the submission. A sub-batch that a
/// worker is already decoding still runs to completion and its output is
/// discarded.
pub struct PendingTranslation {
    id: Uuid,
    num_examples: usize,
    sub_batches: FuturesUnordered<SubBatchResult>,
    /// Finished sub-batches, indexed by position in the submission
    slots: Vec<Option<Vec<TranslationResult>>>,
}

impl PendingTranslation {
    pub(crate) fn new(
        id: Uuid,
        num_examples: usize,
        receivers: Vec<oneshot::Receiver<JobOutcome>>,
    ) -> Self {
        let slots = receivers.iter().map(|_| None).collect();
        let sub_batches = receivers
            .into_iter()
            .enumerate()
            .map(|(index, receiver)| SubBatchResult { index, receiver })
            .collect();
        Self {
            id,
            num_examples,
            sub_batches,
            slots,
        }
    }

    /// Identifier of the submission, as it appears in log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of input examples, and therefore of results on success.
    pub fn len(&self) -> usize {
        self.num_examples
    }

    pub fn is_empty(&self) -> bool {
        self.num_examples == 0
    }
}

impl Future for PendingTranslation {
    type Output = Result<Vec<TranslationResult>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        while let Some((index, outcome)) = ready!(this.sub_batches.poll_next_unpin(cx)) {
            match outcome {
                Ok(results) => this.slots[index] = Some(results),
                Err(e) => {
                    // releases the remaining receivers so queued siblings are skipped
                    this.sub_batches.clear();
                    return Poll::Ready(Err(e));
                }
            }
        }

        let mut results = Vec::with_capacity(this.num_examples);
        for slot in this.slots.iter_mut() {
            results.extend(slot.take().unwrap_or_default());
        }
        debug_assert_eq!(results.len(), this.num_examples);
        Poll::Ready(Ok(results))
    }
}

/// Results slot of one sub-batch.
struct SubBatchResult {
    index: usize,
    receiver: oneshot::Receiver<JobOutcome>,
}

impl Future for SubBatchResult {
    type Output = (usize, Result<Vec<TranslationResult>>);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = ready!(Pin::new(&mut this.receiver).poll(cx));
        let result = match outcome {
            Ok(Ok(results)) => Ok(results),
            Ok(Err(e)) => Err(TranslationError::Decode(e)),
            // the job was dropped without being served
            Err(_) => Err(TranslationError::PoolClosed),
        };
        Poll::Ready((this.index, result))
    }
}
