//! Error types for the stacking crate.

use std::path::PathBuf;

use scene_common::SceneError;
use thiserror::Error;

/// Errors that can occur while turning an archive into a composite.
///
/// An existing output is not an error; it is reported as
/// [`crate::pipeline::ItemOutcome::AlreadyProcessed`].
#[derive(Error, Debug)]
pub enum StackError {
    /// Malicious or malformed archive (path traversal, corrupt container).
    #[error("Extraction failed for {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    /// An expected band file is absent from the workspace after extraction.
    #[error("Missing band file: {0}")]
    MissingBandFile(PathBuf),

    /// The raster collaborator could not open or build from the inputs.
    #[error("Raster tool failed: {0}")]
    RasterOpen(String),

    /// Any otherwise-uncaught failure while handling one item.
    #[error("Worker fatal error: {0}")]
    WorkerFatal(String),

    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("Failed to scan input tree: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackError {
    pub(crate) fn extraction(archive: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StackError::Extraction {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label for the error class, used in progress reports.
    pub fn kind(&self) -> &'static str {
        match self {
            StackError::Extraction { .. } => "ExtractionError",
            StackError::MissingBandFile(_) => "MissingBandFileError",
            StackError::RasterOpen(_) => "RasterOpenError",
            StackError::WorkerFatal(_) => "WorkerFatal",
            StackError::Scene(_) => "SceneError",
            StackError::Scan(_) => "ScanError",
            StackError::InvalidConfig(_) => "ConfigError",
            StackError::Io(_) => "IoError",
        }
    }
}

/// Result type for stacking operations.
pub type Result<T> = std::result::Result<T, StackError>;
