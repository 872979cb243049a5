//! Triad Data Crate
//!
//! Data types and file formats shared by the export pipeline: row-major
//! tensors, pinhole cameras and their ray bundles, triangle meshes, PLY mesh
//! loading, and the `.tcf` hierarchical container.
//! This crate knows nothing about models; it only parses, stores and writes data.

pub mod camera;
pub mod container;
pub mod decimate;
pub mod mesh;
pub mod ply;
pub mod types;

pub use camera::{Camera, CameraError, CameraRayBundle, Cameras, Distortion};
pub use container::{Container, ContainerError, ContainerWriter, Dataset, Group};
pub use decimate::decimate_vertex_clustering;
pub use mesh::{Mesh, MeshError};
pub use ply::{PlyVertex, load_mesh_from_ply};
pub use types::{Tensor, TensorError};
