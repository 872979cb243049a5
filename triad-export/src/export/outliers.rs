//! Statistical outlier removal.
//!
//! For every point the mean distance to its `k` nearest other points is
//! computed. A point is dropped when that mean exceeds
//! `mean + std_ratio * std_dev`, where mean and (sample) standard deviation
//! are taken over all points. The threshold is global for the whole set.
//!
//! The `k` neighbours of a point do not include the point itself, so
//! `k` here corresponds to `k + 1` in implementations that count the query
//! point as its own nearest neighbour.
//!
//! Points with a non-finite coordinate (rays whose depth was infinite or
//! NaN) take no part in the statistics and are always removed.

use glam::Vec3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::export::neighbors::NeighborIndex;

/// Neighbour-distance statistics of a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierStats {
    /// Mean distance to the `k` nearest neighbours, per point.
    pub mean_distances: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
}

impl OutlierStats {
    pub fn is_inlier(&self, index: usize) -> bool {
        self.mean_distances[index] <= self.threshold
    }
}

/// Points and colors that survived outlier removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredPointSet {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    /// Original index of each surviving point, ascending.
    pub indices: Vec<usize>,
}

impl FilteredPointSet {
    /// Keep everything.
    pub fn unfiltered(positions: &[Vec3], colors: &[Vec3]) -> Self {
        Self {
            positions: positions.to_vec(),
            colors: colors.to_vec(),
            indices: (0..positions.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Pick the surviving entries out of any array aligned with the input.
    pub fn select<T: Copy>(&self, values: &[T]) -> Vec<T> {
        self.indices.iter().map(|&i| values[i]).collect()
    }
}

/// Compute neighbour-distance statistics, or `None` when fewer than two
/// points are finite.
///
/// `mean_distances` stays aligned with `points`; non-finite points get an
/// infinite mean distance and never count as inliers.
pub fn outlier_statistics(points: &[Vec3], neighbors: usize, std_ratio: f64) -> Option<OutlierStats> {
    let index = NeighborIndex::build(points);
    if index.len() < 2 {
        return None;
    }
    let k = neighbors.clamp(1, index.len() - 1);

    let mean_distances: Vec<f64> = points
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            if !p.is_finite() {
                return f64::INFINITY;
            }
            let found = index.nearest(p.as_dvec3(), k, Some(i));
            found.iter().map(|(_, d)| d).sum::<f64>() / found.len() as f64
        })
        .collect();

    let finite: Vec<f64> = mean_distances.iter().copied().filter(|d| d.is_finite()).collect();
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite
        .iter()
        .map(|d| (d - mean) * (d - mean))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();
    let threshold = mean + std_ratio * std_dev;
    debug!(
        "Neighbour distance mean {:.6}, std {:.6}, threshold {:.6} (k = {})",
        mean, std_dev, threshold, k
    );

    Some(OutlierStats {
        mean_distances,
        mean,
        std_dev,
        threshold,
    })
}

/// Remove statistical outliers from `positions` and the aligned `colors`.
#[tracing::instrument(skip_all, fields(points = positions.len(), k = neighbors, std_ratio = std_ratio))]
pub fn remove_statistical_outliers(
    positions: &[Vec3],
    colors: &[Vec3],
    neighbors: usize,
    std_ratio: f64,
) -> FilteredPointSet {
    let indices: Vec<usize> = match outlier_statistics(positions, neighbors, std_ratio) {
        Some(stats) => (0..positions.len()).filter(|&i| stats.is_inlier(i)).collect(),
        None => {
            warn!("Too few points for outlier statistics, keeping all finite points");
            (0..positions.len())
                .filter(|&i| positions[i].is_finite())
                .collect()
        }
    };
    let filtered = FilteredPointSet {
        positions: indices.iter().map(|&i| positions[i]).collect(),
        colors: indices.iter().map(|&i| colors[i]).collect(),
        indices,
    };
    info!(
        "Removed {} of {} points as outliers",
        positions.len() - filtered.len(),
        positions.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 5x5x5 lattice with unit spacing plus one far-away point.
    fn lattice_with_outlier() -> Vec<Vec3> {
        let mut points = Vec::new();
        for x in 0..5 {
            for y in 0..5 {
                for z in 0..5 {
                    points.push(Vec3::new(x as f32, y as f32, z as f32));
                }
            }
        }
        points.push(Vec3::splat(100.0));
        points
    }

    #[test]
    fn test_far_point_removed() {
        let points = lattice_with_outlier();
        let colors = vec![Vec3::ONE; points.len()];
        let filtered = remove_statistical_outliers(&points, &colors, 20, 2.0);
        assert_eq!(filtered.len(), points.len() - 1);
        assert!(!filtered.indices.contains(&(points.len() - 1)));
        assert_eq!(filtered.colors.len(), filtered.len());
    }

    #[test]
    fn test_survivors_within_threshold() {
        let points = lattice_with_outlier();
        let colors = vec![Vec3::ZERO; points.len()];
        let stats = outlier_statistics(&points, 20, 1.0).unwrap();
        let filtered = remove_statistical_outliers(&points, &colors, 20, 1.0);
        for &i in &filtered.indices {
            assert!(stats.mean_distances[i] <= stats.threshold);
        }
        assert!(filtered.len() <= points.len());
    }

    #[test]
    fn test_large_ratio_keeps_everything_in_uniform_set() {
        let points: Vec<Vec3> = (0..50).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let colors = vec![Vec3::ONE; points.len()];
        let filtered = remove_statistical_outliers(&points, &colors, 20, 10.0);
        assert_eq!(filtered.len(), 50);
        assert_eq!(filtered.indices, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tiny_sets_pass_through() {
        let points = vec![Vec3::ONE];
        let filtered = remove_statistical_outliers(&points, &[Vec3::X], 20, 1.0);
        assert_eq!(filtered.positions, points);
        assert!(outlier_statistics(&[], 20, 1.0).is_none());
    }

    #[test]
    fn test_infinite_depth_point_is_dropped() {
        let mut points: Vec<Vec3> = (0..50).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        points.push(Vec3::ZERO + Vec3::X * f32::INFINITY);
        points.push(Vec3::splat(f32::INFINITY));
        let colors = vec![Vec3::ONE; points.len()];

        let filtered = remove_statistical_outliers(&points, &colors, 20, 10.0);
        assert_eq!(filtered.indices, (0..50).collect::<Vec<_>>());

        let stats = outlier_statistics(&points, 20, 10.0).unwrap();
        assert!(stats.threshold.is_finite());
        assert!(!stats.is_inlier(50));
        assert!(!stats.is_inlier(51));
    }

    #[test]
    fn test_single_finite_point_survives_alone() {
        let points = vec![Vec3::ONE, Vec3::splat(f32::NAN)];
        let filtered = remove_statistical_outliers(&points, &[Vec3::X, Vec3::Y], 20, 1.0);
        assert_eq!(filtered.indices, vec![0]);
        assert_eq!(filtered.colors, vec![Vec3::X]);
    }

    #[test]
    fn test_select_realigns() {
        let filtered = FilteredPointSet {
            positions: vec![Vec3::ZERO, Vec3::ONE],
            colors: vec![Vec3::ZERO, Vec3::ONE],
            indices: vec![1, 3],
        };
        assert_eq!(filtered.select(&[10, 11, 12, 13]), vec![11, 13]);
    }
}
