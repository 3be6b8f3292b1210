use dem::DemError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransectError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("line is too short to sample: {0}")]
    InsufficientGeometry(&'static str),

    #[error("only {valid} of {total} samples have a valid elevation")]
    InsufficientSamples { valid: usize, total: usize },

    #[error("profile {0} is already registered")]
    DuplicateLabel(String),

    #[error("no profile labeled {0}")]
    UnknownLabel(String),

    #[error("image for profile {label} not found at {path:?}")]
    MissingImage { label: String, path: PathBuf },

    #[error("rendering profile {label}: {reason}")]
    Render { label: String, reason: String },

    #[error("{0}")]
    Dem(#[from] DemError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
