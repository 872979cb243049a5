//! Error types for export operations.

use thiserror::Error;

use crate::ingest::{ModelError, SourceError};

/// Errors that abort an export.
///
/// Every variant is fatal: each one reflects a mismatch between the export
/// configuration and what the model or data can provide, so nothing is
/// retried and no partial result is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not find required outputs {missing:?} in the model outputs (available: {available:?})")]
    MissingChannels {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Could not find normal output '{requested}' in the model outputs; set the normal output name to one of: {available:?}")]
    MissingNormalChannel {
        requested: String,
        available: Vec<String>,
    },

    #[error("Cannot estimate normals and use a normal output name at the same time")]
    ConflictingNormalPolicy,

    #[error("Normal values from method output must be in [0, 1] (got min {min}, max {max})")]
    NormalOutOfRange { min: f32, max: f32 },

    #[error("Output '{channel}' holds {actual} values, expected {expected}")]
    ShapeMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected an [H, W, {channels}] image tensor, got shape {shape:?}")]
    ImageShape { channels: usize, shape: Vec<usize> },

    #[error("Tensor error: {0}")]
    Tensor(#[from] triad_data::TensorError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ray source error: {0}")]
    Source(#[from] SourceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Container error: {0}")]
    Container(#[from] triad_data::ContainerError),

    #[error("Camera error: {0}")]
    Camera(#[from] triad_data::CameraError),

    #[error("Mesh error: {0}")]
    Mesh(#[from] triad_data::MeshError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
