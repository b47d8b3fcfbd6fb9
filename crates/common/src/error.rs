//! Error types for the common crate
//!
//! This module defines the error type shared by every crate in the workspace.
//! Request-level failures (content type, missing field, undecodable image)
//! have dedicated variants so the HTTP layer can map them to status codes.

use thiserror::Error;

/// Result type for image classifier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for image classifier operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model error (topology, weights, artifact format)
    #[error("Model error: {0}")]
    Model(String),

    /// Shape mismatch between tensors or layers
    #[error("Shape error: {0}")]
    Shape(String),

    /// Inference error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),

    /// Uploaded file declared a non-image content type
    #[error("{0}")]
    InvalidContentType(String),

    /// A required request field was not supplied
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Uploaded bytes could not be decoded as an image
    #[error("Invalid image: {0}")]
    ImageDecode(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true if the error was caused by the client's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidContentType(_) | Error::MissingField(_) | Error::ImageDecode(_)
        )
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Shape(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidContentType("x".into()).is_client_error());
        assert!(Error::MissingField("file".into()).is_client_error());
        assert!(Error::ImageDecode("bad".into()).is_client_error());
        assert!(!Error::Inference("boom".into()).is_client_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = Error::MissingField("file".to_string());
        assert_eq!(err.to_string(), "Missing required field: file");

        let err = Error::InvalidContentType("Only images".to_string());
        assert_eq!(err.to_string(), "Only images");

        assert!(Error::NotFound("model".into()).is_not_found());
    }
}
