use async_trait::async_trait;

use crate::batch::Batch;
use crate::error::Result;
use crate::options::TranslationOptions;
use crate::result::TranslationResult;
use super::pending::PendingTranslation;

/// Accepts translation requests and schedules them on model replicas.
#[async_trait]
pub trait TranslationBatcher: Send + Sync {
    /// Validates and queues `batch` for translation.
    ///
    /// Returns as soon as the work is queued. The returned
    /// [`PendingTranslation`] resolves to one result per example, in input
    /// order.
    ///
    /// # Errors
    ///
    /// [`TranslationError::InvalidArgument`](crate::TranslationError::InvalidArgument)
    /// for an empty batch or invalid options, before anything is queued.
    async fn submit(&self, batch: Batch, options: TranslationOptions) -> Result<PendingTranslation>;

    /// Submits `batch` and waits for its results.
    async fn translate(
        &self,
        batch: Batch,
        options: TranslationOptions,
    ) -> Result<Vec<TranslationResult>> {
        self.submit(batch, options).await?.await
    }
}
