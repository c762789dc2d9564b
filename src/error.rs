//! Error types for model loading, decisions and input validation

use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring the pipeline artifact into memory. Fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to load model from {}: {source}", path.display())]
    Runtime {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("model at {} has an unusable signature: {reason}", path.display())]
    Signature { path: PathBuf, reason: String },
}

/// Failure while scoring a single applicant. The service keeps running.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("pipeline returned probability {0} outside [0, 1]")]
    InvalidProbability(f64),
}

/// Applicant field outside the domain the input form allows.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
