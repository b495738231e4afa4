use std::path::PathBuf;
use thiserror::Error;

/// Per-request failures of the scoring pipeline.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The payload cannot be coerced into a record at all.
    #[error("invalid input: {0}")]
    Input(String),
    #[error("prediction failed: {0}")]
    Internal(String),
}

impl ScoringError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Input(_) => "input",
            ScoringError::Internal(_) => "internal",
        }
    }
}

/// The trained artifact cannot be used. Fatal at startup.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("model artifact at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("model artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("cannot train on an empty dataset")]
    EmptyDataset,
    #[error("invalid training parameters: {0}")]
    InvalidParameters(String),
    #[error("feature rows have inconsistent width: expected {expected}, found {found}")]
    WidthMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("threshold {name} = {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("review threshold {review} must be below block threshold {block}")]
    Inverted { review: f64, block: f64 },
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("event log entry is not valid json: {0}")]
    Serialization(#[from] serde_json::Error),
}
