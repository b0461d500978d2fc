//! # Translator Pool
//!
//! Batched translation dispatch over a pool of model replicas.
//!
//! ## Overview
//!
//! This library sits between callers that want sequences translated and a
//! fixed set of loaded model replicas. Callers hand it whole batches of
//! tokenized sentences; the pool splits them into sub-batches, spreads those
//! over idle replicas and hands the results back in input order.
//!
//! Key components include:
//!
//! - A pool of replica workers fed from one FIFO queue
//! - A submission future that reassembles sub-batch results
//! - A streaming batcher that translates text files chunk by chunk
//! - A blocking facade for callers outside an async runtime
//!
//! ## Architecture
//!
//! ### Model Seams
//!
//! The [`ModelLoader`] and [`Decoder`] traits define the interface a model
//! implementation must satisfy. The pool knows nothing about tensors or
//! search; it only sees token sequences go in and ranked hypotheses come out.
//!
//! ### Dispatch
//!
//! [`TranslatorPool`] implements [`TranslationBatcher`]. Each worker owns one
//! replica exclusively and claims queued sub-batches as soon as it is idle,
//! so one slow sub-batch never holds up the others.
//!
//! ### Streaming
//!
//! [`consume_text_file`] reads a file in chunks of `read_batch_size` lines,
//! keeps a bounded number of chunks in flight and writes the translations in
//! input order.
//!
//! ## Usage
//!
//! ```no_run
//! use translator_pool::{Translator, TranslatorConfig, TranslationOptions, tokenize};
//! # use translator_pool::{Decoder, DecodeError, ReplicaSpec, TranslationResult, Tokens};
//! # struct MyModel;
//! # impl Decoder for MyModel {
//! #     fn decode(&mut self, _: &[Tokens], _: &[Tokens], _: &TranslationOptions)
//! #         -> Result<Vec<TranslationResult>, DecodeError> { Ok(vec![]) }
//! # }
//! # fn load(_: &ReplicaSpec) -> Result<MyModel, String> { Ok(MyModel) }
//!
//! let config = TranslatorConfig::new("/models/en-de").with_threads(2, 4);
//! let translator = Translator::new(load, config)?;
//!
//! let source = Some(vec![Some(tokenize("Hello world"))]);
//! let results = translator.translate_batch(source, None, TranslationOptions::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod batch;
mod config;
mod error;
mod options;
mod result;
mod serving;
mod translator;

pub mod model;
pub mod pool;
pub mod stream;

pub use batch::{AbsentPolicy, Batch, SubBatch, Tokens, collect_entries, detokenize, tokenize};
pub use config::TranslatorConfig;
pub use error::{DecodeError, ModelLoadError, Result, TranslationError};
pub use model::{
    ComputeType, Decoder, Device, MODEL_FILE, ModelLoader, ReplicaSlot, ReplicaSpec,
    contains_model,
};
pub use options::TranslationOptions;
pub use pool::{PendingTranslation, TranslationBatcher, TranslatorPool};
pub use result::{Hypothesis, TranslationResult};
pub use stream::{StreamStats, consume_stream, consume_text_file};
pub use translator::Translator;
