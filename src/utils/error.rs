//! Error Handling Module
//!
//! Defines the error types for sample generation.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for synthetic sample generation
#[derive(Error, Debug)]
pub enum Error {
    /// An image source is neither a path collection nor an existing file or directory
    #[error("Invalid image source: {0}")]
    InvalidSource(String),

    /// A pool or class bucket is empty when sampling needs to draw from it
    #[error("Empty pool: {0}")]
    EmptyPool(String),

    /// A crop, resize, or placement produced an unusable extent
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error encoding or writing an image
    #[error("Failed to write image at '{0}': {1}")]
    ImageWrite(PathBuf, String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Convenience Result type for generation operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyPool("no backgrounds".to_string());
        assert_eq!(err.to_string(), "Empty pool: no backgrounds");
    }

    #[test]
    fn test_image_load_error_carries_path() {
        let path = PathBuf::from("/data/cat.png");
        let err = Error::ImageLoad(path, "file not found".to_string());
        assert!(err.to_string().contains("cat.png"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
