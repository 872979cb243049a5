//! k-nearest-neighbour queries over point sets.

use glam::{DVec3, Vec3};
use rstar::RTree;
use rstar::primitives::GeomWithData;

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Read-only spatial index over a point set, in double precision.
pub struct NeighborIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl NeighborIndex {
    /// Index every finite point of `points`. Non-finite points are left out
    /// and never show up as neighbours; indices still refer to `points`.
    pub fn build(points: &[Vec3]) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(i, p)| IndexedPoint::new(p.as_dvec3().to_array(), i))
            .collect();
        let len = entries.len();
        Self {
            tree: RTree::bulk_load(entries),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Up to `k` nearest points to `query` as `(index, distance)`, closest
    /// first. The point with index `exclude` is skipped.
    pub fn nearest(&self, query: DVec3, k: usize, exclude: Option<usize>) -> Vec<(usize, f64)> {
        self.tree
            .nearest_neighbor_iter(&query.to_array())
            .filter(|entry| Some(entry.data) != exclude)
            .take(k)
            .map(|entry| (entry.data, DVec3::from_array(*entry.geom()).distance(query)))
            .collect()
    }
}
