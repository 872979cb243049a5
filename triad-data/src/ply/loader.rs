//! PLY file loading functions

use crate::mesh::{Mesh, MeshError, vertex_normals};
use crate::ply::PlyVertex;
use glam::{Vec3, Vec4};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// Face structure for PLY files
#[derive(Deserialize, Debug)]
struct PlyFace {
    #[serde(alias = "vertex_index")]
    vertex_indices: Vec<i64>,
}

// PLY file structure
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
    #[serde(default, rename = "face")]
    face: Vec<PlyFace>,
}

fn parse_ply(path: &Path) -> Result<PlyFile, MeshError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        MeshError::Parse(e.to_string())
    })
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u as u8)
            .or_else(|| n.as_i64().map(|i| i as u8)),
        _ => None,
    })
}

fn parse_vertex(index: usize, vertex: &HashMap<String, JsonValue>) -> Result<PlyVertex, MeshError> {
    let coord = |name: &'static str| {
        get_f32(vertex.get(name)).ok_or(MeshError::MissingProperty {
            property: name,
            vertex: index,
        })
    };
    let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

    let normal = match (
        get_f32(vertex.get("nx")),
        get_f32(vertex.get("ny")),
        get_f32(vertex.get("nz")),
    ) {
        (Some(x), Some(y), Some(z)) => Some(Vec3::new(x, y, z)),
        _ => None,
    };

    let color = if let (Some(r), Some(g), Some(b)) = (
        get_u8(vertex.get("red")),
        get_u8(vertex.get("green")),
        get_u8(vertex.get("blue")),
    ) {
        let a = get_u8(vertex.get("alpha")).unwrap_or(255);
        Some(Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0)
    } else {
        None
    };

    Ok(PlyVertex {
        position,
        normal,
        color,
    })
}

/// Load a triangle mesh from a PLY file.
///
/// Polygon faces are fan-triangulated. When the file has no `nx/ny/nz`
/// properties, area-weighted vertex normals are computed from the faces.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_mesh_from_ply(path: &Path) -> Result<Mesh, MeshError> {
    let ply_data = parse_ply(path)?;

    info!(
        "PLY file parsed: {} vertices, {} faces",
        ply_data.vertex.len(),
        ply_data.face.len()
    );

    let vertices = ply_data
        .vertex
        .iter()
        .enumerate()
        .map(|(i, v)| parse_vertex(i, v))
        .collect::<Result<Vec<_>, _>>()?;

    let vertex_count = vertices.len();
    let mut faces = Vec::with_capacity(ply_data.face.len());
    for (face_index, face) in ply_data.face.iter().enumerate() {
        let mut indices = Vec::with_capacity(face.vertex_indices.len());
        for &raw in &face.vertex_indices {
            if raw < 0 || raw as usize >= vertex_count {
                return Err(MeshError::FaceIndexOutOfRange {
                    face: face_index,
                    index: raw,
                    vertex_count,
                });
            }
            indices.push(raw as u32);
        }
        if indices.len() < 3 {
            warn!("Skipping face {} with {} vertices", face_index, indices.len());
            continue;
        }
        for k in 1..indices.len() - 1 {
            faces.push([indices[0], indices[k], indices[k + 1]]);
        }
    }

    let positions: Vec<Vec3> = vertices.iter().map(|v| v.position).collect();
    let normals = if vertices.iter().all(|v| v.normal.is_some()) && !vertices.is_empty() {
        vertices
            .iter()
            .filter_map(|v| v.normal)
            .map(|n| n.normalize_or_zero())
            .collect()
    } else {
        vertex_normals(&positions, &faces)
    };
    let colors = if vertices.iter().all(|v| v.color.is_some()) && !vertices.is_empty() {
        Some(vertices.iter().filter_map(|v| v.color).collect())
    } else {
        None
    };

    debug!(
        "Loaded mesh with {} vertices and {} triangles",
        positions.len(),
        faces.len()
    );
    Ok(Mesh {
        vertices: positions,
        faces,
        normals,
        colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const QUAD_PLY: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1 0 0 0 255 0
1 1 0 0 0 255
0 1 0 255 255 255
4 0 1 2 3
";

    #[test]
    fn test_load_quad_mesh() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(QUAD_PLY.as_bytes()).unwrap();

        let mesh = load_mesh_from_ply(file.path()).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        // One quad fans into two triangles.
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        for n in &mesh.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
        let colors = mesh.colors.unwrap();
        assert_eq!(colors[0], Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_missing_file() {
        let err = load_mesh_from_ply(Path::new("/nonexistent/mesh.ply")).unwrap_err();
        assert!(matches!(err, MeshError::Io(_)));
    }
}
