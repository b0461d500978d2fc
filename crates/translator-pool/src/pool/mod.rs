//! # Translator Pool
//!
//! The dispatcher between callers and model replicas.
//!
//! ## Key Components
//!
//! * [`TranslationBatcher`] - The submission interface
//! * [`TranslatorPool`] - Owns the replicas and their workers
//! * [`PendingTranslation`] - Future resolving to a submission's results
//!
//! ## Flow
//!
//! 1. `submit` validates the batch and options synchronously
//! 2. The batch is split into contiguous sub-batches of at most
//!    `max_batch_size` examples
//! 3. Each sub-batch is queued with its own result channel and an idle worker
//!    is woken
//! 4. Workers claim sub-batches in FIFO order and decode them on their replica
//! 5. The pending future collects the per-sub-batch results in input order

mod batcher;
mod core_trait;
mod pending;

pub use batcher::TranslatorPool;
pub use core_trait::TranslationBatcher;
pub use pending::PendingTranslation;
