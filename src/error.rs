//! Error types for framecalc

use thiserror::Error;

/// Main error type for framecalc operations
#[derive(Error, Debug)]
pub enum FrameCalcError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("topology error: {0}")]
    TopologyError(String),

    #[error("structure is fully constrained: no free degrees of freedom")]
    FullyConstrained,

    #[error("structure is unstable: {0}")]
    Instability(String),

    #[error("iterative solve did not converge after {iterations} iterations (residual {residual:.3e})")]
    NonConvergent { iterations: usize, residual: f64 },

    #[error("post-processing failed for member {member_id}: {detail}")]
    PostprocessFailure { member_id: String, detail: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type for framecalc operations
pub type Result<T> = std::result::Result<T, FrameCalcError>;

/// Validation trait for model components
pub trait Validate {
    fn validate(&self) -> Result<()>;
}
