//! PLY vertex data structures

use glam::{Vec3, Vec4};

/// Vertex data extracted from a PLY `vertex` element.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyVertex {
    pub position: Vec3,
    /// `nx, ny, nz` when the file carries normals.
    pub normal: Option<Vec3>,
    /// RGBA in 0-1 when the file carries 8-bit colors. Alpha defaults to 1.
    pub color: Option<Vec4>,
}
