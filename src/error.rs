//! Error handling for extraction and rendering operations.
//!
//! Configuration problems are detected before any source file is opened and
//! fail fast. Per-file problems are recoverable: the engines log them, skip
//! the file and collect the error into the run report.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Destination is not an existing directory: {path}")]
    DestinationNotADirectory { path: PathBuf },

    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("No files registered in the extraction parameters")]
    EmptyParameters,

    #[error("Variable not found in file {path}: {name}")]
    VariableNotFound { path: PathBuf, name: String },

    #[error("Dimension variable missing in file {path}: {name}")]
    MissingDimensionVariable { path: PathBuf, name: String },

    #[error("Time axis arithmetic overflowed for tick {ticks}")]
    TimeOverflow { ticks: i64 },

    #[error("Extraction failed for file {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Worker task failed: {message}")]
    Worker { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a per-file extraction error
    pub fn extraction_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a worker task error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
