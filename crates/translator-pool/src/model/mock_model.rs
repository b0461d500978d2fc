use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::batch::Tokens;
use crate::error::DecodeError;
use crate::model::Decoder;
use crate::options::TranslationOptions;
use crate::result::{Hypothesis, TranslationResult};

/// Copies each source example (after its target prefix) into the output.
///
/// Hypothesis `i` gets score `-0.5 - i` and, past the first, an `alt{i}`
/// marker token.
#[derive(Clone)]
pub struct EchoDecoder {
    hypotheses: usize,
    delay: Option<fn(&[String]) -> Duration>,
    batch_sizes: Option<Arc<Mutex<Vec<usize>>>>,
}

impl EchoDecoder {
    pub fn new() -> Self {
        Self::with_hypotheses(1)
    }

    pub fn with_hypotheses(hypotheses: usize) -> Self {
        Self {
            hypotheses,
            delay: None,
            batch_sizes: None,
        }
    }

    /// Sleeps for `delay(example)` before producing each example.
    pub fn delayed(mut self, delay: fn(&[String]) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Records the size of every batch passed to `decode`.
    pub fn recording(mut self, batch_sizes: Arc<Mutex<Vec<usize>>>) -> Self {
        self.batch_sizes = Some(batch_sizes);
        self
    }
}

impl Decoder for EchoDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        if let Some(batch_sizes) = &self.batch_sizes {
            batch_sizes.lock().unwrap().push(source.len());
        }

        let results = source
            .iter()
            .enumerate()
            .map(|(idx, example)| {
                if let Some(delay) = self.delay {
                    thread::sleep(delay(example));
                }
                let mut output: Tokens = target_prefix.get(idx).cloned().unwrap_or_default();
                output.extend(example.iter().cloned());

                let hypotheses = (0..self.hypotheses)
                    .map(|rank| {
                        let mut tokens = output.clone();
                        if rank > 0 {
                            tokens.push(format!("alt{}", rank));
                        }
                        let weight = 1.0 / example.len().max(1) as f32;
                        let attention = vec![vec![weight; example.len()]; tokens.len()];
                        let hypothesis = Hypothesis::new(tokens, -0.5 - rank as f32);
                        if options.return_attention {
                            hypothesis.with_attention(attention)
                        } else {
                            hypothesis
                        }
                    })
                    .collect();
                TranslationResult::new(hypotheses)
            })
            .collect();
        Ok(results)
    }
}

/// Fails any batch containing `token`, otherwise echoes.
pub struct FailingDecoder {
    token: &'static str,
}

impl FailingDecoder {
    pub fn on_token(token: &'static str) -> Self {
        Self { token }
    }
}

impl Decoder for FailingDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        if source.iter().flatten().any(|t| t == self.token) {
            return Err(DecodeError::model(format!("cannot decode '{}'", self.token)));
        }
        EchoDecoder::new().decode(source, target_prefix, options)
    }
}

/// Panics on any batch containing `token`, otherwise echoes.
pub struct PanickingDecoder {
    token: &'static str,
}

impl PanickingDecoder {
    pub fn on_token(token: &'static str) -> Self {
        Self { token }
    }
}

impl Decoder for PanickingDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        if source.iter().flatten().any(|t| t == self.token) {
            panic!("scripted panic on '{}'", self.token);
        }
        EchoDecoder::new().decode(source, target_prefix, options)
    }
}

/// Always returns one result fewer than asked for.
pub struct ShortDecoder;

impl Decoder for ShortDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        let mut results = EchoDecoder::new().decode(source, target_prefix, options)?;
        results.pop();
        Ok(results)
    }
}

/// Holds every decode call until `gate` opens, then echoes.
pub struct GatedDecoder {
    gate: Arc<AtomicBool>,
}

impl GatedDecoder {
    pub fn new(gate: Arc<AtomicBool>) -> Self {
        Self { gate }
    }
}

impl Decoder for GatedDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        while !self.gate.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        EchoDecoder::new().decode(source, target_prefix, options)
    }
}

/// Number of decode calls running at once, and the most ever seen.
#[derive(Clone, Default)]
pub struct Occupancy {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Occupancy {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Echoes after holding each call for `hold`, tracking occupancy of its own
/// replica and of the whole pool.
pub struct OccupancyDecoder {
    replica: Occupancy,
    pool: Occupancy,
    hold: Duration,
}

impl OccupancyDecoder {
    pub fn new(replica: Occupancy, pool: Occupancy, hold: Duration) -> Self {
        Self { replica, pool, hold }
    }
}

impl Decoder for OccupancyDecoder {
    fn decode(
        &mut self,
        source: &[Tokens],
        target_prefix: &[Tokens],
        options: &TranslationOptions,
    ) -> Result<Vec<TranslationResult>, DecodeError> {
        self.replica.enter();
        self.pool.enter();
        thread::sleep(self.hold);
        let results = EchoDecoder::new().decode(source, target_prefix, options);
        self.pool.exit();
        self.replica.exit();
        results
    }
}
