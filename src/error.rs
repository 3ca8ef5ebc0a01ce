use thiserror::Error;

use crate::models::{BoundingBox, Target};

/// Errors raised by the detection core and its gateways.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("unknown detection type: {0}")]
    UnknownDetectionType(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("no detector loaded for target '{0}'")]
    DetectorUnavailable(Target),

    #[error("detector failed: {0}")]
    Backend(String),

    #[error("box {0:?} lies outside the {1}x{2} image")]
    OutOfBounds(BoundingBox, u32, u32),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl DetectError {
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the filesystem-backed image store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(String),
}

impl StorageError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}
