//! Export pipeline
//!
//! Turns a trained radiance field into exportable artifacts:
//! - Point clouds (`generate_point_cloud`), with the raw samples saved to a
//!   `.tcf` container before outlier filtering
//! - Per-camera RGB/depth renders (`render_trajectory`)
//! - Camera pose records (`collect_camera_poses`)
//! - Simplified meshes (`get_mesh_from_filename`)

pub mod accumulator;
pub mod channels;
pub mod config;
pub mod error;
pub mod mesh;
pub mod neighbors;
pub mod normals;
pub mod outliers;
pub mod point_cloud;
pub mod poses;
pub mod progress;
pub mod serializer;
pub mod trajectory;

pub use accumulator::{AccumulatedSet, PointAccumulator, accumulate_points};
pub use channels::{ResolvedChannels, remap_normals};
pub use config::{ChannelNames, EMBEDDING_SCALES, EMBEDDING_WIDTH, NormalPolicy, PointCloudConfig};
pub use error::{ExportError, Result};
pub use mesh::{MeshSet, PlyMeshSet, get_mesh_from_filename};
pub use normals::{estimate_normals, resolve_normals};
pub use outliers::{FilteredPointSet, OutlierStats, outlier_statistics, remove_statistical_outliers};
pub use point_cloud::{ExportedPointCloud, generate_point_cloud};
pub use poses::{
    CameraPoseRecord, collect_camera_poses, collect_camera_poses_for_dataset, write_camera_poses,
};
pub use progress::{NoProgress, ProgressReporter, RecordingProgress};
pub use serializer::{scale_dataset_name, write_container};
pub use trajectory::{
    RenderOptions, RenderedTrajectory, depth_to_image, render_trajectory, rgb_to_image,
    save_trajectory_images,
};
