//! # Model Replicas
//!
//! The pool never touches tensors. It sees a model through two seams:
//!
//! - [`ModelLoader`] builds one replica per worker from a [`ReplicaSpec`]
//!   (model path, device placement, compute type and intra-op thread count)
//! - [`Decoder`] turns a sub-batch of token sequences into ranked hypotheses
//!
//! Each loaded replica lives in a [`ReplicaSlot`] that serializes access to
//! it, so no two decode calls ever run on the same replica at once.

mod core_trait;
mod device;
mod replica;

pub use core_trait::*;
pub use device::{ComputeType, Device, ReplicaSpec};
pub use replica::ReplicaSlot;

#[cfg(test)]
/// Scripted decoders for tests.
pub(crate) mod mock_model;
