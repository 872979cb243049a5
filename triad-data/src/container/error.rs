//! Container error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid container file: expected TRIADCF magic bytes")]
    InvalidMagic,

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    #[error("Unsupported dataset dtype tag: {0}")]
    UnsupportedDType(u8),

    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    #[error("Dataset '{name}' has shape {shape:?} but {actual} values were supplied")]
    ShapeMismatch {
        name: String,
        shape: Vec<usize>,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ContainerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
