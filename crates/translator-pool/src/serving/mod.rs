//! # Serving
//!
//! * [`worker`] - Background task handles with graceful shutdown. The
//!   `WorkerHandle` type spawns, wakes and stops one worker.
//!
//! * [`job`] - The unit of queued work: one sub-batch plus the oneshot
//!   channel its results are published on.
//!
//! * [`serve`] - The worker loop. Claims jobs from the shared queue, decodes
//!   them on the worker's replica and reports each outcome to its submitter.
//!
pub mod worker;
pub(crate) mod job;
pub(crate) mod serve;
