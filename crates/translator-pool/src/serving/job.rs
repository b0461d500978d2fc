use std::sync::Arc;
use tokio::sync::oneshot::Sender;
use uuid::Uuid;

use crate::batch::SubBatch;
use crate::error::DecodeError;
use crate::options::TranslationOptions;
use crate::result::TranslationResult;

/// What a worker reports back for one sub-batch
pub(crate) type JobOutcome = Result<Vec<TranslationResult>, DecodeError>;

/// # Job
///
/// A queued sub-batch together with the channel its results go back on.
///
/// Every sub-batch of a submission gets its own oneshot channel, so each
/// result slot is written at most once, by whichever worker claims the job.
pub(crate) struct Job {
    /// Submission this sub-batch belongs to
    submission: Uuid,

    /// The examples to decode
    sub_batch: SubBatch,

    /// Decoding options shared by all sub-batches of the submission
    options: Arc<TranslationOptions>,

    /// Channel for sending results back to the submitter
    sender: Sender<JobOutcome>,
}

impl Job {
    pub fn new(
        submission: Uuid,
        sub_batch: SubBatch,
        options: Arc<TranslationOptions>,
        sender: Sender<JobOutcome>,
    ) -> Self {
        Self {
            submission,
            sub_batch,
            options,
            sender,
        }
    }

    pub fn submission(&self) -> Uuid {
        self.submission
    }

    pub fn offset(&self) -> usize {
        self.sub_batch.offset
    }

    pub fn len(&self) -> usize {
        self.sub_batch.len()
    }

    /// Whether the submitter stopped waiting: it dropped its future, or
    /// another sub-batch of the same submission already failed.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn into_parts(self) -> (SubBatch, Arc<TranslationOptions>, Sender<JobOutcome>) {
        (self.sub_batch, self.options, self.sender)
    }
}
