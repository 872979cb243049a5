//! Analytic demo scene: a shaded sphere seen from an orbit of cameras.
//!
//! Stands in for a trained model so every export command can run end to end.
//! Colors and normals come from the surface normal, the per-ray embedding is
//! a multi-scale sinusoidal encoding of the hit point.

use std::f32::consts::{PI, TAU};
use std::path::PathBuf;

use glam::{Mat4, Vec3};
use triad_data::{Camera, CameraRayBundle, Cameras, Distortion, Tensor};
use triad_export::export::{EMBEDDING_SCALES, EMBEDDING_WIDTH};
use triad_export::ingest::{
    BatchMetadata, DataManager, InputDataset, ModelError, OutputMap, RadianceField, RayBatch,
    RayBatchSource, SourceError,
};

const GOLDEN_ANGLE: f32 = 2.399_963;

/// Point `index` of an `count`-point Fibonacci lattice on the unit sphere.
fn fibonacci_direction(index: usize, count: usize) -> Vec3 {
    let count = count.max(1) as f32;
    let y = 1.0 - 2.0 * (index as f32 + 0.5) / count;
    let radius = (1.0 - y * y).max(0.0).sqrt();
    let theta = GOLDEN_ANGLE * index as f32;
    Vec3::new(radius * theta.cos(), y, radius * theta.sin())
}

/// Sphere at the origin whose color follows the surface normal.
#[derive(Debug, Clone)]
pub struct SphereField {
    pub radius: f32,
    /// Output name for normals in `[0, 1]`.
    pub normal_output_name: String,
}

impl SphereField {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            normal_output_name: "normals".to_string(),
        }
    }

    /// Distance along the ray to the first hit, if any.
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let a = direction.length_squared();
        if a == 0.0 {
            return None;
        }
        let b = origin.dot(direction);
        let c = origin.length_squared() - self.radius * self.radius;
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        let near = (-b - sqrt) / a;
        let far = (-b + sqrt) / a;
        [near, far].into_iter().find(|t| *t >= 0.0)
    }

    fn shade(
        &self,
        origins: &[Vec3],
        directions: &[Vec3],
        with_embedding: bool,
    ) -> Result<OutputMap, ModelError> {
        let n = origins.len();
        let mut rgb = Vec::with_capacity(n);
        let mut normals = Vec::with_capacity(n);
        let mut depth = Vec::with_capacity(n);
        let mut clip = Vec::with_capacity(if with_embedding {
            n * EMBEDDING_SCALES * EMBEDDING_WIDTH
        } else {
            0
        });

        for (origin, direction) in origins.iter().zip(directions) {
            match self.intersect(*origin, *direction) {
                Some(t) => {
                    let hit = *origin + *direction * t;
                    let normal = (hit / self.radius).normalize_or_zero();
                    let unit = normal * 0.5 + Vec3::splat(0.5);
                    rgb.push(unit);
                    normals.push(unit);
                    depth.push(t);
                    if with_embedding {
                        encode_position(hit, &mut clip);
                    }
                }
                None => {
                    rgb.push(Vec3::ZERO);
                    normals.push(Vec3::splat(0.5));
                    depth.push(f32::INFINITY);
                    if with_embedding {
                        clip.extend(std::iter::repeat_n(0.0, EMBEDDING_SCALES * EMBEDDING_WIDTH));
                    }
                }
            }
        }

        let mut outputs = OutputMap::new()
            .with("rgb", Tensor::from_vec3s(&rgb))
            .with("depth", Tensor::from_scalars(depth))
            .with(self.normal_output_name.clone(), Tensor::from_vec3s(&normals));
        if with_embedding {
            outputs.insert(
                "clip",
                Tensor::new(vec![n, EMBEDDING_SCALES, EMBEDDING_WIDTH], clip)?,
            );
        }
        Ok(outputs)
    }
}

/// Append `EMBEDDING_SCALES * EMBEDDING_WIDTH` features for `point`.
///
/// Scale `s` uses frequency `2^(s / 4)`; features alternate sine and cosine
/// over a fixed set of projection axes.
fn encode_position(point: Vec3, out: &mut Vec<f32>) {
    for scale in 0..EMBEDDING_SCALES {
        let frequency = 2f32.powf(scale as f32 / 4.0);
        for feature in 0..EMBEDDING_WIDTH / 2 {
            let axis = fibonacci_direction(feature, EMBEDDING_WIDTH / 2);
            let phase = point.dot(axis) * frequency;
            out.push(phase.sin());
            out.push(phase.cos());
        }
    }
}

impl RadianceField for SphereField {
    fn evaluate(&self, batch: &RayBatch) -> Result<OutputMap, ModelError> {
        self.shade(batch.origins(), batch.directions(), true)
    }

    fn evaluate_for_camera(&self, bundle: &CameraRayBundle) -> Result<OutputMap, ModelError> {
        let (width, height) = (bundle.width as usize, bundle.height as usize);
        let flat = self.shade(&bundle.origins, &bundle.directions, false)?;
        let mut outputs = OutputMap::new();
        for name in flat.names() {
            if let Some(tensor) = flat.get(&name) {
                let channels = tensor.row_width();
                let image = Tensor::new(vec![height, width, channels], tensor.data().to_vec())?;
                outputs.insert(name, image);
            }
        }
        Ok(outputs)
    }
}

/// Rays from an enclosing shell aimed at points inside the sphere, so every
/// ray hits the surface.
#[derive(Debug, Clone)]
pub struct ShellRaySource {
    pub batch_size: usize,
    pub shell_radius: f32,
    pub target_radius: f32,
    /// Lattice size used to spread ray origins.
    pub lattice: usize,
}

impl ShellRaySource {
    pub fn new(batch_size: usize, field: &SphereField) -> Self {
        Self {
            batch_size,
            shell_radius: field.radius * 3.0,
            target_radius: field.radius * 0.5,
            lattice: 4096,
        }
    }
}

impl RayBatchSource for ShellRaySource {
    fn next_batch(&mut self, step: usize) -> Result<(RayBatch, BatchMetadata), SourceError> {
        if self.batch_size == 0 {
            return Err(SourceError::InvalidBatch("batch size is zero".to_string()));
        }
        let mut origins = Vec::with_capacity(self.batch_size);
        let mut directions = Vec::with_capacity(self.batch_size);
        for j in 0..self.batch_size {
            let ray = step * self.batch_size + j;
            let origin = fibonacci_direction(ray % self.lattice, self.lattice) * self.shell_radius;
            // A second, decorrelated walk over the lattice picks the target.
            let target_index = ray.wrapping_mul(7919) % self.lattice;
            let target = fibonacci_direction(target_index, self.lattice) * self.target_radius;
            origins.push(origin);
            directions.push((target - origin).normalize());
        }
        Ok((RayBatch::new(origins, directions)?, BatchMetadata::new()))
    }
}

/// Train and eval camera orbits around the sphere.
#[derive(Debug, Clone)]
pub struct OrbitDataManager {
    train: InputDataset,
    eval: InputDataset,
}

impl OrbitDataManager {
    pub fn new(train_count: usize, eval_count: usize, distance: f32, width: u32, height: u32) -> Self {
        Self {
            train: orbit_dataset(train_count, distance, width, height, 0.0),
            eval: orbit_dataset(eval_count, distance, width, height, 0.5),
        }
    }

    pub fn train_cameras(&self) -> &Cameras {
        &self.train.cameras
    }
}

impl DataManager for OrbitDataManager {
    fn train_dataset(&self) -> Option<&InputDataset> {
        Some(&self.train)
    }

    fn eval_dataset(&self) -> Option<&InputDataset> {
        (!self.eval.is_empty()).then_some(&self.eval)
    }
}

/// `count` cameras on a tilted circle looking at the origin. `offset` shifts
/// the azimuth by a fraction of the spacing.
fn orbit_dataset(count: usize, distance: f32, width: u32, height: u32, offset: f32) -> InputDataset {
    let focal = width as f32 / (2.0 * (PI / 6.0).tan());
    let cameras: Vec<Camera> = (0..count)
        .map(|i| {
            let azimuth = TAU * (i as f32 + offset) / count.max(1) as f32;
            let position = Vec3::new(
                distance * azimuth.cos(),
                distance * 0.3,
                distance * azimuth.sin(),
            );
            let camera_to_world = Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Y).inverse();
            Camera::new(camera_to_world, focal, width, height).with_distortion(Distortion {
                k1: -0.01,
                ..Default::default()
            })
        })
        .collect();
    let filenames = (0..count)
        .map(|i| PathBuf::from(format!("images/frame_{i:05}.png")))
        .collect();
    InputDataset::new(cameras.into(), filenames)
}
