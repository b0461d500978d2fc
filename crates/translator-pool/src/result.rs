use serde::{Deserialize, Serialize};

use crate::batch::Tokens;

/// One decoded candidate for an input example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub tokens: Tokens,

    pub score: f32,

    /// `[output_len][input_len]` attention weights, present only when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attention: Option<Vec<Vec<f32>>>,
}

impl Hypothesis {
    pub fn new(tokens: Tokens, score: f32) -> Self {
        Self {
            tokens,
            score,
            attention: None,
        }
    }

    pub fn with_attention(mut self, attention: Vec<Vec<f32>>) -> Self {
        self.attention = Some(attention);
        self
    }
}

/// # TranslationResult
///
/// The ranked hypotheses produced for a single input example.
///
/// Hypotheses are kept in descending score order regardless of the order the
/// model produced them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationResult {
    hypotheses: Vec<Hypothesis>,
}

impl TranslationResult {
    pub fn new(mut hypotheses: Vec<Hypothesis>) -> Self {
        hypotheses.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { hypotheses }
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn into_hypotheses(self) -> Vec<Hypothesis> {
        self.hypotheses
    }

    pub fn num_hypotheses(&self) -> usize {
        self.hypotheses.len()
    }

    /// The highest scoring hypothesis, if the model produced any.
    pub fn best(&self) -> Option<&Hypothesis> {
        self.hypotheses.first()
    }

    pub fn has_attention(&self) -> bool {
        self.hypotheses.iter().any(|h| h.attention.is_some())
    }

    /// Token count of the best hypothesis, used for throughput reporting.
    pub fn num_output_tokens(&self) -> usize {
        self.best().map(|h| h.tokens.len()).unwrap_or(0)
    }

    /// Applies per-request limits: at most `num_hypotheses` entries, and no
    /// attention unless it was asked for.
    pub(crate) fn conform(&mut self, num_hypotheses: usize, return_attention: bool) {
        self.hypotheses.truncate(num_hypotheses);
        if !return_attention {
            for hypothesis in self.hypotheses.iter_mut() {
                hypothesis.attention = None;
            }
        }
    }
}
