use serde::{Deserialize, Serialize};

use crate::error::{Result, TranslationError};

/// # TranslationOptions
///
/// Decoding configuration for one translation request.
///
/// Options are built once per call, validated with [`TranslationOptions::validate`]
/// before any work is queued, and then shared read-only by every sub-batch of
/// that call.
///
/// ## Defaults
///
/// | option                 | default |
/// |------------------------|---------|
/// | `max_batch_size`       | 0 (unbounded) |
/// | `beam_size`            | 2       |
/// | `num_hypotheses`       | 1       |
/// | `length_penalty`       | 0.0     |
/// | `max_decoding_length`  | 250     |
/// | `min_decoding_length`  | 1       |
/// | `use_vmap`             | false   |
/// | `return_attention`     | false   |
/// | `return_alternatives`  | false   |
/// | `sampling_topk`        | 1       |
/// | `sampling_temperature` | 1.0     |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationOptions {
    /// Maximum number of examples per sub-batch, 0 keeps the whole request together
    pub max_batch_size: usize,

    /// Number of partial hypotheses kept at each decoding step
    pub beam_size: usize,

    /// Number of hypotheses returned per example
    pub num_hypotheses: usize,

    pub length_penalty: f32,

    pub max_decoding_length: usize,

    pub min_decoding_length: usize,

    /// Restrict the target vocabulary with the model's vocabulary map
    pub use_vmap: bool,

    pub return_attention: bool,

    /// Return alternatives at the first unconstrained decoding position
    pub return_alternatives: bool,

    /// Sample from the `k` most likely tokens, 1 means greedy/beam search
    pub sampling_topk: usize,

    pub sampling_temperature: f32,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 0,
            beam_size: 2,
            num_hypotheses: 1,
            length_penalty: 0.0,
            max_decoding_length: 250,
            min_decoding_length: 1,
            use_vmap: false,
            return_attention: false,
            return_alternatives: false,
            sampling_topk: 1,
            sampling_temperature: 1.0,
        }
    }
}

impl TranslationOptions {
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }

    pub fn with_num_hypotheses(mut self, num_hypotheses: usize) -> Self {
        self.num_hypotheses = num_hypotheses;
        self
    }

    pub fn with_length_penalty(mut self, length_penalty: f32) -> Self {
        self.length_penalty = length_penalty;
        self
    }

    pub fn with_decoding_length(mut self, min: usize, max: usize) -> Self {
        self.min_decoding_length = min;
        self.max_decoding_length = max;
        self
    }

    pub fn with_vmap(mut self, use_vmap: bool) -> Self {
        self.use_vmap = use_vmap;
        self
    }

    pub fn with_attention(mut self, return_attention: bool) -> Self {
        self.return_attention = return_attention;
        self
    }

    pub fn with_alternatives(mut self, return_alternatives: bool) -> Self {
        self.return_alternatives = return_alternatives;
        self
    }

    /// Switch to random sampling from the `topk` best tokens.
    pub fn with_sampling(mut self, topk: usize, temperature: f32) -> Self {
        self.sampling_topk = topk;
        self.sampling_temperature = temperature;
        self
    }

    /// Whether these options select random sampling over beam search.
    pub fn is_sampling(&self) -> bool {
        self.sampling_topk > 1
    }

    /// Checks the invariants between options.
    ///
    /// # Errors
    ///
    /// [`TranslationError::InvalidArgument`] naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(TranslationError::invalid("beam_size must be at least 1"));
        }
        if self.num_hypotheses == 0 {
            return Err(TranslationError::invalid("num_hypotheses must be at least 1"));
        }
        if self.sampling_topk == 0 {
            return Err(TranslationError::invalid("sampling_topk must be at least 1"));
        }
        if !(self.sampling_temperature.is_finite() && self.sampling_temperature > 0.0) {
            return Err(TranslationError::invalid(format!(
                "sampling_temperature must be a positive number, got {}",
                self.sampling_temperature
            )));
        }
        if !self.length_penalty.is_finite() {
            return Err(TranslationError::invalid("length_penalty must be finite"));
        }
        if self.min_decoding_length > self.max_decoding_length {
            return Err(TranslationError::invalid(format!(
                "min_decoding_length ({}) is greater than max_decoding_length ({})",
                self.min_decoding_length, self.max_decoding_length
            )));
        }
        if self.is_sampling() && self.beam_size != 1 {
            return Err(TranslationError::invalid(
                "random sampling should be used with beam_size = 1",
            ));
        }
        if self.num_hypotheses > self.beam_size && !self.return_alternatives {
            return Err(TranslationError::invalid(format!(
                "num_hypotheses ({}) can not be greater than beam_size ({})",
                self.num_hypotheses, self.beam_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = TranslationOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.beam_size, 2);
        assert_eq!(options.num_hypotheses, 1);
        assert_eq!(options.max_decoding_length, 250);
        assert!(!options.is_sampling());
    }

    #[test]
    fn test_min_length_above_max_is_rejected() {
        let options = TranslationOptions::default().with_decoding_length(10, 5);
        assert!(matches!(options.validate(), Err(TranslationError::InvalidArgument(_))));
    }

    #[test]
    fn test_hypotheses_bounded_by_beam() {
        let options = TranslationOptions::default()
            .with_beam_size(2)
            .with_num_hypotheses(3);
        assert!(options.validate().is_err());

        // alternatives are not bounded by the beam
        let options = options.with_alternatives(true);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_sampling_requires_single_beam() {
        let options = TranslationOptions::default().with_sampling(10, 0.7);
        assert!(options.is_sampling());
        assert!(options.validate().is_err());

        let options = options.with_beam_size(1);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        assert!(TranslationOptions::default().with_beam_size(0).validate().is_err());
        assert!(TranslationOptions::default().with_num_hypotheses(0).validate().is_err());
        assert!(TranslationOptions::default().with_sampling(0, 1.0).validate().is_err());
        assert!(TranslationOptions::default().with_sampling(1, 0.0).validate().is_err());
        assert!(TranslationOptions::default().with_sampling(1, f32::NAN).validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let options: TranslationOptions =
            serde_json::from_str(r#"{"beam_size": 4, "num_hypotheses": 2}"#).unwrap();
        assert_eq!(options.beam_size, 4);
        assert_eq!(options.num_hypotheses, 2);
        assert_eq!(options.max_decoding_length, 250);
        assert_eq!(options.sampling_temperature, 1.0);
    }
}
