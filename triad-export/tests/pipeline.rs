//! End-to-end point cloud export with stub ray sources and models.

use glam::{DVec3, Vec3};
use tempfile::TempDir;
use triad_data::{CameraRayBundle, Container, Tensor};
use triad_export::export::{
    EMBEDDING_SCALES, EMBEDDING_WIDTH, ExportError, NoProgress, RecordingProgress,
    outlier_statistics,
};
use triad_export::ingest::{
    BatchMetadata, ModelError, OutputMap, RadianceField, RayBatch, RayBatchSource, SourceError,
};
use triad_export::{PointCloudConfig, generate_point_cloud};

/// Emits a fixed list of rays in batches of `batch_size`, then a far-away
/// cluster so filtering has something to remove.
struct ListSource {
    origins: Vec<Vec3>,
    directions: Vec<Vec3>,
    batch_size: usize,
    steps_seen: Vec<usize>,
}

impl ListSource {
    fn new(origins: Vec<Vec3>, directions: Vec<Vec3>, batch_size: usize) -> Self {
        Self {
            origins,
            directions,
            batch_size,
            steps_seen: Vec::new(),
        }
    }
}

impl RayBatchSource for ListSource {
    fn next_batch(&mut self, step: usize) -> Result<(RayBatch, BatchMetadata), SourceError> {
        self.steps_seen.push(step);
        let start = step * self.batch_size;
        if start >= self.origins.len() {
            return Err(SourceError::Exhausted);
        }
        let end = (start + self.batch_size).min(self.origins.len());
        let batch = RayBatch::new(
            self.origins[start..end].to_vec(),
            self.directions[start..end].to_vec(),
        )?;
        Ok((batch, BatchMetadata::new()))
    }
}

/// Constant depth, color from the direction, optional normals and depth.
/// With `miss_first`, the first ray of every batch reports infinite depth.
struct StubModel {
    depth: f32,
    with_depth: bool,
    miss_first: bool,
    normals: Option<Vec3>,
}

impl StubModel {
    fn unit_depth() -> Self {
        Self {
            depth: 1.0,
            with_depth: true,
            miss_first: false,
            normals: None,
        }
    }
}

impl RadianceField for StubModel {
    fn evaluate(&self, batch: &RayBatch) -> Result<OutputMap, ModelError> {
        let n = batch.len();
        let rgb: Vec<Vec3> = batch.directions().iter().map(|d| d.abs()).collect();
        let mut outputs = OutputMap::new()
            .with("rgb", Tensor::from_vec3s(&rgb))
            .with(
                "clip",
                Tensor::zeros(vec![n, EMBEDDING_SCALES, EMBEDDING_WIDTH]),
            );
        if self.with_depth {
            let mut depth = vec![self.depth; n];
            if self.miss_first && n > 0 {
                depth[0] = f32::INFINITY;
            }
            outputs.insert("depth", Tensor::from_scalars(depth));
        }
        if let Some(normal) = self.normals {
            outputs.insert("normals", Tensor::from_vec3s(&vec![normal; n]));
        }
        Ok(outputs)
    }

    fn evaluate_for_camera(&self, _bundle: &CameraRayBundle) -> Result<OutputMap, ModelError> {
        Err(ModelError::Evaluation("not a camera model".into()))
    }
}

fn config_in(dir: &TempDir, num_points: usize) -> PointCloudConfig {
    PointCloudConfig {
        num_points,
        container_path: dir.path().join("data.tcf"),
        ..Default::default()
    }
}

fn ten_rays() -> (Vec<Vec3>, Vec<Vec3>) {
    let origins = (0..10).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let directions = (0..10)
        .map(|i| Vec3::new(0.0, (i as f32).cos(), (i as f32).sin()))
        .collect();
    (origins, directions)
}

/// A dense patch of 200 rays plus five rays that land far away.
fn patch_with_strays() -> (Vec<Vec3>, Vec<Vec3>) {
    let mut origins = Vec::new();
    for x in 0..20 {
        for y in 0..10 {
            origins.push(Vec3::new(x as f32 * 0.01, y as f32 * 0.01, 0.0));
        }
    }
    for i in 0..5 {
        origins.push(Vec3::new(50.0 + i as f32 * 7.0, -40.0, 30.0));
    }
    let directions = vec![Vec3::Z; origins.len()];
    (origins, directions)
}

#[test]
fn test_unit_depth_points_are_origin_plus_direction() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = ten_rays();
    let mut source = ListSource::new(origins.clone(), directions.clone(), 10);
    let config = PointCloudConfig {
        remove_outliers: false,
        ..config_in(&dir, 10)
    };

    let cloud =
        generate_point_cloud(&mut source, &StubModel::unit_depth(), &config, &mut NoProgress)
            .unwrap();

    assert_eq!(cloud.len(), 10);
    for i in 0..10 {
        let expected = (origins[i] + directions[i]).as_dvec3();
        assert!((cloud.positions[i] - expected).length() < 1e-6);
        assert_eq!(cloud.colors[i], directions[i].abs().as_dvec3());
    }
    assert!(cloud.normals.is_none());
    assert_eq!(source.steps_seen, vec![0]);
}

#[test]
fn test_container_holds_unfiltered_samples() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = patch_with_strays();
    let total = origins.len();
    let mut source = ListSource::new(origins, directions, 41);
    let config = PointCloudConfig {
        std_ratio: 1.0,
        ..config_in(&dir, total)
    };
    let mut progress = RecordingProgress::default();

    let cloud =
        generate_point_cloud(&mut source, &StubModel::unit_depth(), &config, &mut progress)
            .unwrap();

    // 41 * 5 = 205 rays, exactly the budget.
    assert_eq!(source.steps_seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(progress.position(), total as u64);
    assert_eq!(progress.label, "Generating Point Cloud");

    let container = Container::open(&config.container_path).unwrap();
    for group in ["origins", "directions", "points", "rgb"] {
        assert_eq!(container.dataset(group, group).unwrap().rows(), total);
    }
    let clip = container.group("clip").unwrap();
    assert_eq!(clip.datasets.len(), EMBEDDING_SCALES);
    assert_eq!(clip.datasets[0].shape, vec![total, EMBEDDING_WIDTH]);

    assert!(cloud.len() < total);
    assert!(cloud.positions.iter().all(|p| p.x < 1.0));
}

#[test]
fn test_survivors_respect_unfiltered_threshold() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = patch_with_strays();
    let total = origins.len();
    let mut source = ListSource::new(origins.clone(), directions.clone(), 64);
    let config = PointCloudConfig {
        std_ratio: 2.0,
        ..config_in(&dir, total)
    };

    let cloud =
        generate_point_cloud(&mut source, &StubModel::unit_depth(), &config, &mut NoProgress)
            .unwrap();

    let points: Vec<Vec3> = origins.iter().zip(&directions).map(|(o, d)| *o + *d).collect();
    let stats = outlier_statistics(&points, config.outlier_neighbors, config.std_ratio).unwrap();
    assert!(cloud.len() <= total);
    for position in &cloud.positions {
        let index = points
            .iter()
            .position(|p| p.as_dvec3() == *position)
            .unwrap();
        assert!(stats.mean_distances[index] <= stats.threshold);
    }
}

#[test]
fn test_conflicting_normal_options_fail_before_sampling() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = ten_rays();
    let mut source = ListSource::new(origins, directions, 10);
    let config = PointCloudConfig {
        estimate_normals: true,
        normal_output_name: Some("normals".to_string()),
        ..config_in(&dir, 10)
    };

    let err = generate_point_cloud(&mut source, &StubModel::unit_depth(), &config, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, ExportError::ConflictingNormalPolicy));
    assert!(source.steps_seen.is_empty());
    assert!(!config.container_path.exists());
}

#[test]
fn test_missing_depth_writes_no_container() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = ten_rays();
    let mut source = ListSource::new(origins, directions, 10);
    let config = config_in(&dir, 10);
    let model = StubModel {
        with_depth: false,
        ..StubModel::unit_depth()
    };

    let err = generate_point_cloud(&mut source, &model, &config, &mut NoProgress).unwrap_err();
    match err {
        ExportError::MissingChannels { missing, available } => {
            assert_eq!(missing, vec!["depth"]);
            assert_eq!(available, vec!["clip", "rgb"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(source.steps_seen, vec![0]);
    assert!(!config.container_path.exists());
}

#[test]
fn test_propagated_normals_are_remapped() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = ten_rays();
    let mut source = ListSource::new(origins, directions, 5);
    let config = PointCloudConfig {
        remove_outliers: false,
        normal_output_name: Some("normals".to_string()),
        ..config_in(&dir, 10)
    };
    let model = StubModel {
        normals: Some(Vec3::new(0.5, 1.0, 0.5)),
        ..StubModel::unit_depth()
    };

    let cloud = generate_point_cloud(&mut source, &model, &config, &mut NoProgress).unwrap();
    let normals = cloud.normals.unwrap();
    assert_eq!(normals.len(), 10);
    assert!(normals.iter().all(|n| *n == DVec3::Y));
}

#[test]
fn test_estimated_normals_on_flat_patch() {
    let dir = TempDir::new().unwrap();
    let mut origins = Vec::new();
    for x in 0..8 {
        for y in 0..8 {
            origins.push(Vec3::new(x as f32 * 0.1, y as f32 * 0.1, 0.0));
        }
    }
    let directions = vec![Vec3::Z; origins.len()];
    let mut source = ListSource::new(origins, directions, 64);
    let config = PointCloudConfig {
        estimate_normals: true,
        ..config_in(&dir, 64)
    };

    let cloud =
        generate_point_cloud(&mut source, &StubModel::unit_depth(), &config, &mut NoProgress)
            .unwrap();
    let normals = cloud.normals.as_ref().unwrap();
    assert_eq!(normals.len(), cloud.len());
    for n in normals {
        assert!((n.length() - 1.0).abs() < 1e-9);
        assert!((n.z.abs() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_infinite_depth_ray_is_filtered_out() {
    let dir = TempDir::new().unwrap();
    let (origins, directions) = ten_rays();
    let mut source = ListSource::new(origins, directions, 10);
    let config = PointCloudConfig {
        std_ratio: 10.0,
        estimate_normals: true,
        ..config_in(&dir, 10)
    };
    let model = StubModel {
        miss_first: true,
        ..StubModel::unit_depth()
    };

    let cloud = generate_point_cloud(&mut source, &model, &config, &mut NoProgress).unwrap();
    assert_eq!(cloud.len(), 9);
    assert!(cloud.positions.iter().all(|p| p.is_finite()));
    assert_eq!(cloud.normals.as_ref().map(Vec::len), Some(9));

    let container = Container::open(&config.container_path).unwrap();
    let points = container.dataset("points", "points").unwrap();
    assert_eq!(points.rows(), 10);
    assert!(points.row(0).unwrap().iter().any(|v| !v.is_finite()));
}
