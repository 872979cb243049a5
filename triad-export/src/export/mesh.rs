//! Mesh loading and simplification behind a swappable backend.

use std::path::Path;

use tracing::info;
use triad_data::{Mesh, MeshError, decimate_vertex_clustering, load_mesh_from_ply};

use crate::export::error::Result;

/// A stateful mesh-processing backend holding one current mesh.
pub trait MeshSet {
    /// Load `path`, replacing the current mesh.
    fn load_new_mesh(&mut self, path: &Path) -> std::result::Result<(), MeshError>;

    /// Simplify the current mesh to at most `target_faces` faces.
    fn decimate(&mut self, target_faces: usize) -> std::result::Result<(), MeshError>;

    fn current_mesh(&self) -> std::result::Result<&Mesh, MeshError>;
}

/// [`MeshSet`] backed by the PLY loader and vertex-clustering decimation.
#[derive(Debug, Default)]
pub struct PlyMeshSet {
    mesh: Option<Mesh>,
}

impl PlyMeshSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MeshSet for PlyMeshSet {
    fn load_new_mesh(&mut self, path: &Path) -> std::result::Result<(), MeshError> {
        self.mesh = Some(load_mesh_from_ply(path)?);
        Ok(())
    }

    fn decimate(&mut self, target_faces: usize) -> std::result::Result<(), MeshError> {
        let mesh = self.mesh.as_ref().ok_or(MeshError::NoMesh)?;
        let decimated = decimate_vertex_clustering(mesh, target_faces);
        self.mesh = Some(decimated);
        Ok(())
    }

    fn current_mesh(&self) -> std::result::Result<&Mesh, MeshError> {
        self.mesh.as_ref().ok_or(MeshError::NoMesh)
    }
}

/// Load a mesh file and optionally simplify it.
pub fn get_mesh_from_filename<S: MeshSet + ?Sized>(
    mesh_set: &mut S,
    path: &Path,
    target_num_faces: Option<usize>,
) -> Result<Mesh> {
    mesh_set.load_new_mesh(path)?;
    if let Some(target) = target_num_faces {
        info!("Simplifying mesh to {} faces", target);
        mesh_set.decimate(target)?;
    }
    Ok(mesh_set.current_mesh()?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// A flat `n x n` vertex grid as an ASCII PLY.
    fn grid_ply(n: usize) -> NamedTempFile {
        let mut text = String::new();
        let faces = 2 * (n - 1) * (n - 1);
        text.push_str("ply\nformat ascii 1.0\n");
        text.push_str(&format!("element vertex {}\n", n * n));
        text.push_str("property float x\nproperty float y\nproperty float z\n");
        text.push_str(&format!("element face {faces}\n"));
        text.push_str("property list uchar int vertex_indices\nend_header\n");
        for y in 0..n {
            for x in 0..n {
                text.push_str(&format!("{x} {y} 0\n"));
            }
        }
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let i = y * n + x;
                text.push_str(&format!("3 {} {} {}\n", i, i + 1, i + n));
                text.push_str(&format!("3 {} {} {}\n", i + 1, i + n + 1, i + n));
            }
        }
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_without_decimation() {
        let file = grid_ply(5);
        let mesh = get_mesh_from_filename(&mut PlyMeshSet::new(), file.path(), None).unwrap();
        assert_eq!(mesh.num_vertices(), 25);
        assert_eq!(mesh.num_faces(), 32);
        assert_eq!(mesh.normals.len(), 25);
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn test_load_and_decimate() {
        let file = grid_ply(12);
        let mesh = get_mesh_from_filename(&mut PlyMeshSet::new(), file.path(), Some(40)).unwrap();
        assert!(mesh.num_faces() <= 40);
        assert!(mesh.num_vertices() < 144);
    }

    #[test]
    fn test_empty_set_has_no_mesh() {
        let mut set = PlyMeshSet::new();
        assert!(matches!(set.current_mesh(), Err(MeshError::NoMesh)));
        assert!(matches!(set.decimate(10), Err(MeshError::NoMesh)));
    }
}
