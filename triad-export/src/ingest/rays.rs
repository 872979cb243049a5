//! Ray batch sources for point sampling

use glam::Vec3;

use crate::ingest::model::OutputMap;

/// Named auxiliary tensors delivered alongside a ray batch
/// (ground-truth pixels, ray indices, ...). The exporter ignores them.
pub type BatchMetadata = OutputMap;

/// A batch of rays drawn for one sampling step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RayBatch {
    origins: Vec<Vec3>,
    directions: Vec<Vec3>,
}

impl RayBatch {
    /// Create a ray batch. Origins and directions must pair up one-to-one.
    pub fn new(origins: Vec<Vec3>, directions: Vec<Vec3>) -> Result<Self, SourceError> {
        if origins.len() != directions.len() {
            return Err(SourceError::InvalidBatch(format!(
                "{} origins but {} directions",
                origins.len(),
                directions.len()
            )));
        }
        Ok(Self {
            origins,
            directions,
        })
    }

    pub fn origins(&self) -> &[Vec3] {
        &self.origins
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    /// Number of rays
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Project every ray to `origin + direction * depth`
    pub fn points_at(&self, depths: &[f32]) -> Vec<Vec3> {
        self.origins
            .iter()
            .zip(&self.directions)
            .zip(depths)
            .map(|((o, d), t)| *o + *d * *t)
            .collect()
    }

    pub fn into_parts(self) -> (Vec<Vec3>, Vec<Vec3>) {
        (self.origins, self.directions)
    }
}

/// Trait for training-data ray samplers
pub trait RayBatchSource {
    /// Draw the next batch of rays for sampling step `step`
    fn next_batch(&mut self, step: usize) -> Result<(RayBatch, BatchMetadata), SourceError>;
}

/// Errors that can occur while drawing ray batches
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Ray source exhausted")]
    Exhausted,
    #[error("Invalid ray batch: {0}")]
    InvalidBatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_batch_length_mismatch() {
        let err = RayBatch::new(vec![Vec3::ZERO; 2], vec![Vec3::Z]).unwrap_err();
        assert!(matches!(err, SourceError::InvalidBatch(_)));
    }

    #[test]
    fn test_points_at_depth() {
        let batch = RayBatch::new(
            vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)],
            vec![Vec3::Z, Vec3::new(0.0, 2.0, 0.0)],
        )
        .unwrap();
        let points = batch.points_at(&[3.0, 0.5]);
        assert_eq!(points, vec![Vec3::new(0.0, 0.0, 3.0), Vec3::new(1.0, 1.0, 0.0)]);
    }
}
