//! Camera pose collection.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::export::error::Result;
use crate::ingest::{DataManager, InputDataset};

/// Pose of one camera: its source image and 4x4 camera-to-world transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPoseRecord {
    pub file_path: String,
    /// Row-major camera-to-world matrix.
    pub transform: [[f32; 4]; 4],
}

/// One record per camera of `dataset`, in camera order.
///
/// A missing dataset has no poses. Cameras without a matching image file
/// get an empty path.
pub fn collect_camera_poses_for_dataset(dataset: Option<&InputDataset>) -> Vec<CameraPoseRecord> {
    let Some(dataset) = dataset else {
        return Vec::new();
    };

    dataset
        .cameras
        .iter()
        .enumerate()
        .map(|(i, camera)| CameraPoseRecord {
            file_path: dataset
                .image_filenames
                .get(i)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            // glam is column-major; transpose to get rows.
            transform: camera.camera_to_world.transpose().to_cols_array_2d(),
        })
        .collect()
}

/// Poses of the train and eval splits.
pub fn collect_camera_poses(
    manager: &dyn DataManager,
) -> (Vec<CameraPoseRecord>, Vec<CameraPoseRecord>) {
    (
        collect_camera_poses_for_dataset(manager.train_dataset()),
        collect_camera_poses_for_dataset(manager.eval_dataset()),
    )
}

/// Write `records` as pretty-printed JSON.
pub fn write_camera_poses(path: &Path, records: &[CameraPoseRecord]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    info!("Wrote {} camera poses to {}", records.len(), path.display());
    Ok(())
}
