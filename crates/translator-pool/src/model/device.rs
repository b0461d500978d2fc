use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelLoadError;

/// Device a replica is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

impl FromStr for Device {
    type Err = ModelLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(ModelLoadError::InvalidConfig(format!("unsupported device: {}", other))),
        }
    }
}

/// Numeric precision the model engine runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    /// Keep whatever precision the model was saved with
    #[default]
    Default,
    Float32,
    Float16,
    Int8,
    Int16,
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeType::Default => "default",
            ComputeType::Float32 => "float32",
            ComputeType::Float16 => "float16",
            ComputeType::Int8 => "int8",
            ComputeType::Int16 => "int16",
        };
        f.write_str(name)
    }
}

impl FromStr for ComputeType {
    type Err = ModelLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(ComputeType::Default),
            "float32" | "float" => Ok(ComputeType::Float32),
            "float16" => Ok(ComputeType::Float16),
            "int8" => Ok(ComputeType::Int8),
            "int16" => Ok(ComputeType::Int16),
            other => Err(ModelLoadError::InvalidConfig(format!(
                "unsupported compute type: {}",
                other
            ))),
        }
    }
}

/// Everything a [`ModelLoader`](super::ModelLoader) needs to build one replica.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaSpec {
    /// Position of this replica in the pool, also the index of its worker
    pub index: usize,
    pub model_path: PathBuf,
    pub device: Device,
    pub device_index: usize,
    pub compute_type: ComputeType,
    /// Op-level parallelism the engine may use inside one decode call
    pub intra_threads: usize,
}
