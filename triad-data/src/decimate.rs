//! Mesh decimation by uniform vertex clustering.
//!
//! Vertices are snapped into a regular grid over the mesh bounds; every
//! occupied cell becomes one output vertex at the mean of its members.
//! Faces that collapse (two corners in the same cell) or duplicate an
//! existing face are dropped. The grid resolution is binary-searched for the
//! finest grid whose face count still fits the target.

use crate::mesh::{Mesh, vertex_normals};
use glam::{UVec3, Vec3, Vec4};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Finest grid tried, in cells per axis, relative to `sqrt(vertex_count)`.
const FINEST_FACTOR: f32 = 4.0;
const MAX_RESOLUTION: u32 = 1 << 20;

/// Decimate `mesh` until it has at most `target_faces` triangles.
///
/// Returns a clone when the mesh already fits. A target of zero collapses the
/// mesh completely.
pub fn decimate_vertex_clustering(mesh: &Mesh, target_faces: usize) -> Mesh {
    if mesh.num_faces() <= target_faces {
        return mesh.clone();
    }
    if mesh.vertices.is_empty() {
        return Mesh::default();
    }

    let (min, max) = mesh
        .vertices
        .iter()
        .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let extent = (max - min).max(Vec3::splat(f32::EPSILON));

    let finest = ((mesh.num_vertices() as f32).sqrt() * FINEST_FACTOR)
        .ceil()
        .clamp(2.0, MAX_RESOLUTION as f32) as u32;
    let decimated = cluster(mesh, min, extent, finest);
    let decimated = if decimated.num_faces() <= target_faces {
        decimated
    } else {
        // Resolution `lo` fits the target, `hi` does not.
        let (mut lo, mut hi) = (1u32, finest);
        let mut fits = None;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            let candidate = cluster(mesh, min, extent, mid);
            debug!(
                "Clustering at resolution {}: {} faces",
                mid,
                candidate.num_faces()
            );
            if candidate.num_faces() <= target_faces {
                lo = mid;
                fits = Some(candidate);
            } else {
                hi = mid;
            }
        }
        fits.unwrap_or_else(|| cluster(mesh, min, extent, lo))
    };

    info!(
        "Decimated {} -> {} faces ({} vertices)",
        mesh.num_faces(),
        decimated.num_faces(),
        decimated.num_vertices()
    );
    decimated
}

fn cluster(mesh: &Mesh, min: Vec3, extent: Vec3, resolution: u32) -> Mesh {
    let cells = resolution as f32;
    let cell_of = |v: Vec3| -> UVec3 {
        let t = ((v - min) / extent * cells).floor();
        t.as_uvec3().min(UVec3::splat(resolution - 1))
    };

    let mut cell_ids: HashMap<UVec3, u32> = HashMap::new();
    let mut remap = Vec::with_capacity(mesh.num_vertices());
    let mut sums: Vec<(Vec3, Vec4, u32)> = Vec::new();

    for (i, v) in mesh.vertices.iter().enumerate() {
        let next_id = cell_ids.len() as u32;
        let id = *cell_ids.entry(cell_of(*v)).or_insert(next_id);
        if id as usize == sums.len() {
            sums.push((Vec3::ZERO, Vec4::ZERO, 0));
        }
        let color = mesh
            .colors
            .as_ref()
            .and_then(|c| c.get(i).copied())
            .unwrap_or(Vec4::ZERO);
        let entry = &mut sums[id as usize];
        entry.0 += *v;
        entry.1 += color;
        entry.2 += 1;
        remap.push(id);
    }

    let vertices: Vec<Vec3> = sums.iter().map(|(p, _, n)| *p / *n as f32).collect();
    let colors = mesh
        .colors
        .as_ref()
        .map(|_| sums.iter().map(|(_, c, n)| *c / *n as f32).collect());

    let mut seen = HashSet::new();
    let mut faces = Vec::new();
    for face in &mesh.faces {
        let [a, b, c] = face.map(|i| remap[i as usize]);
        if a == b || b == c || a == c {
            continue;
        }
        let mut key = [a, b, c];
        key.sort_unstable();
        if seen.insert(key) {
            faces.push([a, b, c]);
        }
    }

    let normals = vertex_normals(&vertices, &faces);
    Mesh {
        vertices,
        faces,
        normals,
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A `n x n` grid of quads in the XY plane, two triangles per quad.
    fn grid_mesh(n: u32) -> Mesh {
        let mut vertices = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                vertices.push(Vec3::new(x as f32, y as f32, 0.0));
            }
        }
        let row = n + 1;
        let mut faces = Vec::new();
        for y in 0..n {
            for x in 0..n {
                let i = y * row + x;
                faces.push([i, i + 1, i + row + 1]);
                faces.push([i, i + row + 1, i + row]);
            }
        }
        let colors = Some(vec![Vec4::ONE; vertices.len()]);
        Mesh::new(vertices, faces, colors)
    }

    #[test]
    fn test_decimate_reaches_target() {
        let mesh = grid_mesh(20);
        assert_eq!(mesh.num_faces(), 800);

        let decimated = decimate_vertex_clustering(&mesh, 100);
        assert!(decimated.num_faces() <= 100);
        assert!(decimated.num_faces() > 0);
        assert_eq!(decimated.normals.len(), decimated.num_vertices());
        assert_eq!(
            decimated.colors.as_ref().map(Vec::len),
            Some(decimated.num_vertices())
        );
        for face in &decimated.faces {
            for &i in face {
                assert!((i as usize) < decimated.num_vertices());
            }
        }
    }

    #[test]
    fn test_decimate_lands_near_target() {
        let mesh = grid_mesh(100);
        assert_eq!(mesh.num_faces(), 20_000);

        for target in [15_000, 5_000, 1_000] {
            let decimated = decimate_vertex_clustering(&mesh, target);
            assert!(decimated.num_faces() <= target);
            assert!(
                decimated.num_faces() * 2 >= target,
                "{} faces for a target of {}",
                decimated.num_faces(),
                target
            );
        }
    }

    #[test]
    fn test_decimate_noop_when_under_target() {
        let mesh = grid_mesh(2);
        let decimated = decimate_vertex_clustering(&mesh, 1000);
        assert_eq!(decimated, mesh);
    }

    #[test]
    fn test_decimate_to_zero() {
        let mesh = grid_mesh(4);
        let decimated = decimate_vertex_clustering(&mesh, 0);
        assert_eq!(decimated.num_faces(), 0);
    }
}
