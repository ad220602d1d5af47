//! Error types for scene naming and grid handling.

use thiserror::Error;

/// Result type alias using SceneError.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised while interpreting scene names and grid definitions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("Archive name does not follow the scene naming convention: {0}")]
    InvalidArchiveName(String),

    #[error("Archive {archive} does not carry product suffix '{product}'")]
    ProductMismatch { archive: String, product: String },

    #[error("Invalid product code: {0}")]
    InvalidProductCode(String),

    #[error("Invalid acquisition date in scene {0}")]
    InvalidAcquisitionDate(String),

    #[error("Invalid grid definition: {0}")]
    InvalidGrid(String),
}
