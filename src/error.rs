//! Error types for the simulation engine
//!
//! ## Table of Contents
//! - **SimulationError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, SimulationError>`

use thiserror::Error;

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Main error type for simulation operations
///
/// Every variant is a local, recoverable-by-caller condition. Invalid
/// configuration is rejected synchronously before any trial work begins;
/// per-trial infeasibility is never an error (it is counted in
/// `failed_scenarios` on the result instead).
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Invalid uncertainty parameters or engine configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown uncertainty parameter name passed to the sensitivity analyzer
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A run produced zero successful trials, so no distribution exists
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The run was cancelled or timed out before completion
    #[error("simulation cancelled: {0}")]
    Cancelled(String),

    /// Plan evaluator reported a failure outside the feasibility contract
    #[error("evaluator error: {0}")]
    Evaluator(String),

    /// Metrics registration or collection failure
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl SimulationError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create an insufficient-data error
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<prometheus::Error> for SimulationError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}
