//! Configuration for translator construction.

use std::path::PathBuf;

use crate::error::ModelLoadError;
use crate::model::{ComputeType, Device, ReplicaSpec};

/// Placement and parallelism of a translator's replicas.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Directory holding the model
    pub model_path: PathBuf,

    pub device: Device,

    /// Which device of the given kind to use
    pub device_index: usize,

    pub compute_type: ComputeType,

    /// Number of replicas, each served by its own worker
    pub inter_threads: usize,

    /// Op-level threads each replica may use while decoding
    pub intra_threads: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            device: Device::Cpu,
            device_index: 0,
            compute_type: ComputeType::Default,
            inter_threads: 1,
            intra_threads: 4,
        }
    }
}

impl TranslatorConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: Device, device_index: usize) -> Self {
        self.device = device;
        self.device_index = device_index;
        self
    }

    pub fn with_compute_type(mut self, compute_type: ComputeType) -> Self {
        self.compute_type = compute_type;
        self
    }

    pub fn with_threads(mut self, inter_threads: usize, intra_threads: usize) -> Self {
        self.inter_threads = inter_threads;
        self.intra_threads = intra_threads;
        self
    }

    /// Create config from environment variables layered over the defaults.
    ///
    /// Recognized: `TRANSLATOR_MODEL_PATH`, `TRANSLATOR_DEVICE`,
    /// `TRANSLATOR_DEVICE_INDEX`, `TRANSLATOR_COMPUTE_TYPE`,
    /// `TRANSLATOR_INTER_THREADS`, `TRANSLATOR_INTRA_THREADS`.
    ///
    /// # Errors
    ///
    /// [`ModelLoadError::InvalidConfig`] if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ModelLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ModelLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("TRANSLATOR_MODEL_PATH") {
            config.model_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("TRANSLATOR_DEVICE") {
            config.device = val.parse()?;
        }
        if let Some(val) = lookup("TRANSLATOR_DEVICE_INDEX") {
            config.device_index = parse_count("TRANSLATOR_DEVICE_INDEX", &val)?;
        }
        if let Some(val) = lookup("TRANSLATOR_COMPUTE_TYPE") {
            config.compute_type = val.parse()?;
        }
        if let Some(val) = lookup("TRANSLATOR_INTER_THREADS") {
            config.inter_threads = parse_count("TRANSLATOR_INTER_THREADS", &val)?;
        }
        if let Some(val) = lookup("TRANSLATOR_INTRA_THREADS") {
            config.intra_threads = parse_count("TRANSLATOR_INTRA_THREADS", &val)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.inter_threads == 0 {
            return Err(ModelLoadError::InvalidConfig(
                "inter_threads must be at least 1".to_string(),
            ));
        }
        if self.intra_threads == 0 {
            return Err(ModelLoadError::InvalidConfig(
                "intra_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// One spec per replica, indexed `0..inter_threads`.
    pub fn replica_specs(&self) -> Vec<ReplicaSpec> {
        (0..self.inter_threads)
            .map(|index| ReplicaSpec {
                index,
                model_path: self.model_path.clone(),
                device: self.device,
                device_index: self.device_index,
                compute_type: self.compute_type,
                intra_threads: self.intra_threads,
            })
            .collect()
    }
}

fn parse_count(key: &str, val: &str) -> Result<usize, ModelLoadError> {
    val.trim()
        .parse()
        .map_err(|_| ModelLoadError::InvalidConfig(format!("{} is not a count: {}", key, val)))
}
