//! Error types for the prescription recognition pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for medscript operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A label table or image file could not be read or parsed
    #[error("failed to load data from '{path}': {reason}")]
    DataLoad { path: PathBuf, reason: String },

    /// A label or class id has no entry in the vocabulary.
    /// Seeing this at serve time signals a train/serve skew.
    #[error("vocabulary mismatch: {0}")]
    VocabularyMismatch(String),

    /// Image bytes could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A persisted model or vocabulary artifact is missing or corrupt
    #[error("failed to load artifact '{path}': {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Specialized Result type for medscript operations.
pub type Result<T> = std::result::Result<T, Error>;
