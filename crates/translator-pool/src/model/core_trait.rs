use std::path::Path;

use crate::batch::Tokens;
use crate::error::DecodeError;
use crate::options::TranslationOptions;
use crate::result::TranslationResult;
use super::device::ReplicaSpec;

/// File whose presence marks a directory as a model directory
pub const MODEL_FILE: &str = "model.bin";

/// Returns `true` if `path` is a directory holding a model.
///
/// Pure filesystem check, intended for validation before constructing a
/// translator.
pub fn contains_model(path: impl AsRef<Path>) -> bool {
    path.as_ref().join(MODEL_FILE).is_file()
}

/// A sequence-to-sequence model able to translate a batch of examples.
///
/// Implementations run on a dedicated blocking thread and are never called
/// concurrently, so `decode` takes `&mut self`.
///
/// # Example
///
/// ```
/// use translator_pool::{Decoder, DecodeError, Hypothesis, TranslationOptions, TranslationResult};
///
/// struct Reverse;
///
/// impl Decoder for Reverse {
///     fn decode(
///         &mut self,
///         source: &[Vec<String>],
///         _target_prefix: &[Vec<String>],
///         _options: &TranslationOptions,
///     ) -> Result<Vec<TranslationResult>, DecodeError> {
///         Ok(source
///             .iter()
///             .map(|tokens| {
///                 let reversed = tokens.iter().rev().cloned().collect();
///                 TranslationResult::new(vec![Hypothesis::new(reversed, 0.0)])
///             })
///             .collect())
///     }
/// }
/// ```
pub trait Decoder: Send + 'static {
    /// Decodes `source`, returning exactly one result per example.
    ///
    /// `target_prefix` is either empty or has one (possibly empty) entry per
    /// source example.
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError>;
}

/// Builds model replicas for a pool.
///
/// Called once per replica at pool construction. Any closure of the shape
/// `Fn(&ReplicaSpec) -> Result<D, E>` is a loader.
pub trait ModelLoader {
    type Model: Decoder;

    /// Loads the replica described by `spec`, or describes why it could not.
    fn load(&self, spec: &ReplicaSpec) -> Result<Self::Model, String>;
}

impl<F, D, E> ModelLoader for F
where
    F: Fn(&ReplicaSpec) -> Result<D, E>,
    D: Decoder,
    E: std::fmt::Display,
{
    type Model = D;

    fn load(&self, spec: &ReplicaSpec) -> Result<D, String> {
        self(spec).map_err(|e| e.to_string())
    }
}
