use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len {0} for {1}")]
    HgtLen(u64, PathBuf),

    #[error("invalid ASCII grid header line {line}: {reason}")]
    AsciiHeader { line: usize, reason: String },

    #[error("invalid ASCII grid value '{0}'")]
    AsciiData(String),

    #[error("expected {expected} samples, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("unknown CRS '{0}'")]
    Crs(String),

    #[error("{0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("not a usable GeoTIFF: {0}")]
    GeoTiff(&'static str),
}
