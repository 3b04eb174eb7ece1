//! Error types for the simulation stages.

use crate::config::ConfigError;
use lib_dsp::DspError;
use thiserror::Error;

/// Errors raised while building or running a simulation stage.
#[derive(Debug, Error)]
pub enum SimError {
    /// Transform failure.
    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    /// Configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stage constructed with unusable parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Response table cannot be built from the field response.
    #[error("Invalid response: {0}")]
    Response(String),

    /// A deposition arrived earlier than one already accepted.
    #[error("Depositions out of time order: {got} after {previous}")]
    OutOfOrder { previous: f64, got: f64 },
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
