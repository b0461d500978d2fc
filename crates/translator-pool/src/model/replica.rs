use std::any::Any;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::batch::SubBatch;
use crate::error::DecodeError;
use crate::options::TranslationOptions;
use crate::result::TranslationResult;
use super::core_trait::Decoder;
use super::device::ReplicaSpec;

/// # ReplicaSlot
///
/// One loaded model replica and the placement it was loaded with.
///
/// The model sits behind a lock that is held for exactly one decode call, and
/// the call itself runs on tokio's blocking pool so the async worker loop is
/// never stalled by model execution.
pub struct ReplicaSlot<M> {
    spec: ReplicaSpec,
    model: Arc<Mutex<M>>,
}

impl<M> ReplicaSlot<M>
where
    M: Decoder,
{
    pub fn new(spec: ReplicaSpec, model: M) -> Self {
        Self {
            spec,
            model: Arc::new(Mutex::new(model)),
        }
    }

    pub fn spec(&self) -> &ReplicaSpec {
        &self.spec
    }

    /// Decodes one sub-batch on this replica.
    ///
    /// Results are checked to cover every example and trimmed to the
    /// requested hypothesis count and attention setting. A panic inside the
    /// model is reported as [`DecodeError::Panicked`]; the replica stays
    /// usable for later calls.
    pub async fn decode(
        &self,
        sub_batch: SubBatch,
        options: Arc<TranslationOptions>,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        let expected = sub_batch.len();
        let model = self.model.clone();
        let decode_options = options.clone();
        let replica = self.spec.index;

        let task = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap_or_else(|poisoned| {
                warn!(replica, "replica lock poisoned by an earlier panic, reusing replica");
                poisoned.into_inner()
            });
            model.decode(&sub_batch.source, &sub_batch.target_prefix, &decode_options)
        });

        let mut results = match task.await {
            Ok(decoded) => decoded?,
            Err(join_error) if join_error.is_panic() => {
                return Err(DecodeError::Panicked(panic_message(join_error.into_panic())));
            }
            Err(join_error) => return Err(DecodeError::Panicked(join_error.to_string())),
        };

        if results.len() != expected {
            return Err(DecodeError::ResultCount {
                expected,
                actual: results.len(),
            });
        }
        for result in results.iter_mut() {
            result.conform(options.num_hypotheses, options.return_attention);
        }
        Ok(results)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
