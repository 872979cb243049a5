//! Normal estimation and propagation.

use glam::{DMat3, DVec3, Vec3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::export::config::NormalPolicy;
use crate::export::error::{ExportError, Result};
use crate::export::neighbors::NeighborIndex;
use crate::export::outliers::FilteredPointSet;

const JACOBI_SWEEPS: usize = 32;

/// Estimate a unit normal per point from the local neighbourhood.
///
/// The normal is the direction of least variance of the `neighbors` closest
/// points (the point itself included). Sign is not oriented. Points without
/// enough neighbours to span a plane, and non-finite points, get `+Z`.
pub fn estimate_normals(points: &[Vec3], neighbors: usize) -> Vec<DVec3> {
    if points.is_empty() {
        return Vec::new();
    }
    let index = NeighborIndex::build(points);
    let k = neighbors.min(index.len());
    debug!("Estimating normals for {} points (k = {})", points.len(), k);

    points
        .par_iter()
        .map(|p| {
            if !p.is_finite() {
                return DVec3::Z;
            }
            let neighborhood: Vec<DVec3> = index
                .nearest(p.as_dvec3(), k, None)
                .into_iter()
                .map(|(i, _)| points[i].as_dvec3())
                .collect();
            plane_normal(&neighborhood).unwrap_or(DVec3::Z)
        })
        .collect()
}

/// Normal of the best-fit plane through `points`, if there is one.
pub fn plane_normal(points: &[DVec3]) -> Option<DVec3> {
    if points.len() < 3 {
        return None;
    }
    let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;
    let mut covariance = [[0.0f64; 3]; 3];
    for p in points {
        let d = (*p - centroid).to_array();
        for (r, row) in covariance.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value += d[r] * d[c];
            }
        }
    }
    let (values, vectors) = symmetric_eigen(covariance);
    let smallest = (0..3)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(2);
    let normal = vectors.col(smallest);
    (normal.length_squared() > 0.0 && normal.is_finite()).then(|| normal.normalize())
}

/// Cyclic Jacobi eigen decomposition of a symmetric 3x3 matrix.
///
/// Returns the eigenvalues and a matrix whose columns are the matching
/// eigenvectors.
fn symmetric_eigen(mut a: [[f64; 3]; 3]) -> ([f64; 3], DMat3) {
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..JACOBI_SWEEPS {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off < 1e-30 {
            break;
        }
        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            if a[p][q].abs() < f64::MIN_POSITIVE {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            for k in 0..3 {
                let akp = a[k][p];
                let akq = a[k][q];
                a[k][p] = c * akp - s * akq;
                a[k][q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let apk = a[p][k];
                let aqk = a[q][k];
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for row in v.iter_mut() {
                let vp = row[p];
                let vq = row[q];
                row[p] = c * vp - s * vq;
                row[q] = s * vp + c * vq;
            }
        }
    }

    let values = [a[0][0], a[1][1], a[2][2]];
    // `v` is row-major; eigenvector j is column j.
    let vectors = DMat3::from_cols(
        DVec3::new(v[0][0], v[1][0], v[2][0]),
        DVec3::new(v[0][1], v[1][1], v[2][1]),
        DVec3::new(v[0][2], v[1][2], v[2][2]),
    );
    (values, vectors)
}

/// Normals for the filtered points according to `policy`.
///
/// `propagated` holds the per-ray normals of the unfiltered set and is only
/// consulted for [`NormalPolicy::Propagate`].
pub fn resolve_normals(
    policy: &NormalPolicy,
    filtered: &FilteredPointSet,
    propagated: Option<&[Vec3]>,
    neighbors: usize,
) -> Result<Option<Vec<DVec3>>> {
    match policy {
        NormalPolicy::None => Ok(None),
        NormalPolicy::Estimate => {
            info!("Estimating normals");
            Ok(Some(estimate_normals(&filtered.positions, neighbors)))
        }
        NormalPolicy::Propagate(name) => {
            let normals = propagated.ok_or_else(|| ExportError::MissingNormalChannel {
                requested: name.clone(),
                available: Vec::new(),
            })?;
            Ok(Some(
                filtered
                    .select(normals)
                    .into_iter()
                    .map(|n| n.as_dvec3())
                    .collect(),
            ))
        }
    }
}
