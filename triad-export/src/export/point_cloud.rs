//! Point cloud generation from a radiance field.

use glam::DVec3;
use tracing::info;

use crate::export::accumulator::accumulate_points;
use crate::export::config::PointCloudConfig;
use crate::export::error::Result;
use crate::export::normals::resolve_normals;
use crate::export::outliers::{FilteredPointSet, remove_statistical_outliers};
use crate::export::progress::ProgressReporter;
use crate::export::serializer::write_container;
use crate::ingest::{RadianceField, RayBatchSource};

/// Final exported point cloud in double precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportedPointCloud {
    pub positions: Vec<DVec3>,
    /// RGB in `[0, 1]`.
    pub colors: Vec<DVec3>,
    pub normals: Option<Vec<DVec3>>,
}

impl ExportedPointCloud {
    /// Assemble the output record from the filtered points.
    pub fn assemble(filtered: &FilteredPointSet, normals: Option<Vec<DVec3>>) -> Self {
        Self {
            positions: filtered.positions.iter().map(|p| p.as_dvec3()).collect(),
            colors: filtered.colors.iter().map(|c| c.as_dvec3()).collect(),
            normals,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }
}

/// Sample a point cloud from `model`.
///
/// Draws batches from `source` until `config.num_points` points are
/// gathered, writes the raw samples to `config.container_path`, then filters
/// outliers and resolves normals. Configuration errors are reported before
/// any batch is drawn; any failure during sampling leaves no container
/// behind.
#[tracing::instrument(skip_all, fields(num_points = config.num_points))]
pub fn generate_point_cloud<S, M, P>(
    source: &mut S,
    model: &M,
    config: &PointCloudConfig,
    progress: &mut P,
) -> Result<ExportedPointCloud>
where
    S: RayBatchSource + ?Sized,
    M: RadianceField + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let policy = config.validate()?;

    let set = accumulate_points(
        source,
        model,
        config.channel_names(),
        config.num_points,
        progress,
    )?;
    info!("Accumulated {} points", set.len());

    write_container(&config.container_path, &set)?;

    let filtered = if config.remove_outliers {
        info!("Cleaning point cloud");
        remove_statistical_outliers(
            &set.points,
            &set.rgbs,
            config.outlier_neighbors,
            config.std_ratio,
        )
    } else {
        FilteredPointSet::unfiltered(&set.points, &set.rgbs)
    };

    let normals = resolve_normals(
        &policy,
        &filtered,
        set.normals.as_deref(),
        config.normal_neighbors,
    )?;

    Ok(ExportedPointCloud::assemble(&filtered, normals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_assemble_casts_to_f64() {
        let filtered = FilteredPointSet::unfiltered(
            &[Vec3::new(1.5, -2.0, 0.25)],
            &[Vec3::new(0.5, 0.25, 1.0)],
        );
        let cloud = ExportedPointCloud::assemble(&filtered, None);
        assert_eq!(cloud.positions, vec![DVec3::new(1.5, -2.0, 0.25)]);
        assert_eq!(cloud.colors, vec![DVec3::new(0.5, 0.25, 1.0)]);
        assert!(!cloud.has_normals());
        assert_eq!(cloud.len(), 1);
    }
}
