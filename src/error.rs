//! Error taxonomy for the identification engine.
//!
//! Malformed requests (short timing sequences, missing n-gram data, unknown
//! method) and insufficient training data are surfaced to the caller.
//! "No enrolled profiles" is NOT an error: it is an expected cold-start state
//! answered with a degraded verdict. Likewise an unreadable model artifact is
//! treated as absence and triggers retraining.

use thiserror::Error;

/// Identification error.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("insufficient typing data: {0}")]
    InsufficientData(String),

    #[error("no n-gram features present in sample")]
    NoNgramFeatures,

    #[error("unknown identification method: {0}")]
    UnknownMethod(String),

    #[error("insufficient training data: {have} samples, need at least {need}")]
    InsufficientTrainingData { have: usize, need: usize },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("history error: {0}")]
    History(#[from] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IdentifyError>;
