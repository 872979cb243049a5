//! Triad Export Crate
//!
//! Exports trained radiance fields to point clouds, renders, camera poses and
//! meshes. The model and its training data are consumed through the traits
//! in [`ingest`]; nothing here updates model parameters.
//!
//! ## Modules
//!
//! - [`ingest`]: Interfaces to ray sources, models and camera datasets
//! - [`export`]: Point cloud generation, trajectory rendering, pose and mesh export

pub mod export;
pub mod ingest;

pub use export::{ExportError, ExportedPointCloud, PointCloudConfig, generate_point_cloud};
