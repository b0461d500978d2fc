//! Error types for the translator pool.
//!
//! ```text
//! TranslationError (top-level, re-exported)
//! ├── InvalidArgument  - malformed batch or options, reported before queueing
//! ├── ModelLoadError   - replica construction failed, no pool is created
//! ├── DecodeError      - a sub-batch failed inside a worker
//! ├── Io               - stream consumption failed
//! └── PoolClosed       - queued work was dropped at shutdown
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Device;

/// Errors raised while constructing model replicas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelLoadError {
    /// No model was found at the given path
    #[error("no model found in {}", path.display())]
    NotFound {
        path: PathBuf,
    },

    /// The translator configuration is unusable
    #[error("invalid translator configuration: {0}")]
    InvalidConfig(String),

    /// The loader failed for one replica
    #[error("failed to load replica {index} on {device}: {message}")]
    Replica {
        index: usize,
        device: Device,
        message: String,
    },

    /// The execution runtime could not be started
    #[error("failed to start translator runtime: {0}")]
    Runtime(String),
}

/// Runtime failure of one decode call.
///
/// Scoped to the sub-batch that raised it; only the owning submission
/// observes it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The model reported a failure
    #[error("{0}")]
    Model(String),

    /// The model did not return one result per example
    #[error("model returned {actual} results for {expected} examples")]
    ResultCount {
        expected: usize,
        actual: usize,
    },

    /// The decode call panicked on its worker thread
    #[error("decode panicked: {0}")]
    Panicked(String),
}

impl DecodeError {
    /// Convenience constructor for model-side failures.
    pub fn model(message: impl Into<String>) -> Self {
        DecodeError::Model(message.into())
    }
}

/// Top-level error returned by pool, stream and translator operations.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("translator pool is shut down")]
    PoolClosed,
}

impl TranslationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TranslationError::InvalidArgument(message.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TranslationError>;
