//! Radiance field model interface

use std::collections::BTreeMap;

use triad_data::{CameraRayBundle, Tensor};

use crate::ingest::rays::RayBatch;

/// Named output channels produced by one model evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputMap {
    channels: BTreeMap<String, Tensor>,
}

impl OutputMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel, replacing any previous tensor with the same name
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.channels.insert(name.into(), tensor);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.insert(name, tensor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.channels.remove(name)
    }

    /// Channel names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Trait for trained radiance field models.
///
/// Evaluation takes `&self`: exporting is inference only and must never
/// update model parameters or optimizer state.
pub trait RadianceField {
    /// Evaluate a training-style ray batch
    fn evaluate(&self, batch: &RayBatch) -> Result<OutputMap, ModelError>;

    /// Evaluate every pixel ray of one camera image.
    /// Image channels are shaped `[height, width, C]`.
    fn evaluate_for_camera(&self, bundle: &CameraRayBundle) -> Result<OutputMap, ModelError>;
}

/// Errors reported by a model evaluation
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model evaluation failed: {0}")]
    Evaluation(String),
    #[error("Tensor error: {0}")]
    Tensor(#[from] triad_data::TensorError),
}
