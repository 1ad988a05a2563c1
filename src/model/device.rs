//! Compute device for learned classifiers.

use std::fmt;

use crate::{AnalysisError, Result};

/// Compute device a model is loaded onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// CPU execution (default).
    #[default]
    Cpu,

    /// CUDA GPU execution.
    #[cfg(feature = "cuda")]
    Cuda {
        /// GPU device ID (0-indexed).
        device_id: u32,
    },
}

impl Device {
    /// Create CPU device.
    pub fn cpu() -> Self {
        Self::Cpu
    }

    /// Create CUDA device with the given device ID.
    #[cfg(feature = "cuda")]
    pub fn cuda(device_id: u32) -> Self {
        Self::Cuda { device_id }
    }

    /// Parse a configured device name (`"cpu"` or `"cuda"`).
    ///
    /// `device_id` is only read for CUDA. Naming CUDA in a build without the
    /// `cuda` feature is a configuration error, not a silent CPU downgrade.
    pub fn parse(name: &str, device_id: u32) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            #[cfg(feature = "cuda")]
            "cuda" => Ok(Self::cuda(device_id)),
            #[cfg(not(feature = "cuda"))]
            "cuda" => {
                let _ = device_id;
                Err(AnalysisError::Configuration(
                    "device \"cuda\" requires the `cuda` feature".to_string(),
                ))
            }
            other => Err(AnalysisError::Configuration(format!(
                "unknown device {other:?} (expected \"cpu\" or \"cuda\")"
            ))),
        }
    }

    /// Whether this device is a hardware accelerator.
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Get the device name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            #[cfg(feature = "cuda")]
            Self::Cuda { .. } => "CUDA",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            #[cfg(feature = "cuda")]
            Self::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}
