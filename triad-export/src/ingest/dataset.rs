//! Datasets and data managers exposing camera collections

use std::path::PathBuf;

use triad_data::Cameras;

/// Cameras of one dataset split with the image each camera observed.
#[derive(Debug, Clone, Default)]
pub struct InputDataset {
    pub cameras: Cameras,
    /// Source image path per camera, index-aligned with `cameras`
    pub image_filenames: Vec<PathBuf>,
}

impl InputDataset {
    pub fn new(cameras: Cameras, image_filenames: Vec<PathBuf>) -> Self {
        Self {
            cameras,
            image_filenames,
        }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

/// Trait for data managers holding train and eval splits
pub trait DataManager {
    fn train_dataset(&self) -> Option<&InputDataset>;

    fn eval_dataset(&self) -> Option<&InputDataset>;
}
