//! Triangle mesh record.

use glam::{Vec3, Vec4};
use thiserror::Error;

/// Errors raised while loading or processing meshes.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PLY parsing error: {0}")]
    Parse(String),

    #[error("Missing '{property}' at vertex {vertex}")]
    MissingProperty {
        property: &'static str,
        vertex: usize,
    },

    #[error("Face {face} references vertex {index} (vertex count: {vertex_count})")]
    FaceIndexOutOfRange {
        face: usize,
        index: i64,
        vertex_count: usize,
    },

    #[error("No mesh loaded")]
    NoMesh,
}

/// An indexed triangle mesh with per-vertex normals and optional RGBA colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// Triangle vertex indices.
    pub faces: Vec<[u32; 3]>,
    /// Per-vertex unit normals.
    pub normals: Vec<Vec3>,
    /// Per-vertex RGBA colors (linear, 0-1 range).
    pub colors: Option<Vec<Vec4>>,
}

impl Mesh {
    /// Build a mesh, computing area-weighted vertex normals.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>, colors: Option<Vec<Vec4>>) -> Self {
        let normals = vertex_normals(&vertices, &faces);
        Self {
            vertices,
            faces,
            normals,
            colors,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}

/// Area-weighted per-vertex normals.
///
/// Each face adds its unnormalized cross product (twice its area) to its three
/// vertices. Vertices touched by no face get a zero normal.
pub fn vertex_normals(vertices: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let n = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}
