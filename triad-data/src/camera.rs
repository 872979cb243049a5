//! Pinhole cameras and per-camera ray generation.
//!
//! Cameras follow the OpenGL convention used across triad: the camera looks
//! down its local -Z axis with +Y up, and `camera_to_world` maps camera space
//! into world space.

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

/// Errors raised by camera collections.
#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    #[error("Camera index {index} out of bounds (count: {count})")]
    IndexOutOfBounds { index: usize, count: usize },
}

/// OpenCV-style lens distortion: radial `k1..k4`, tangential `p1, p2`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Distortion {
    pub k1: f32,
    pub k2: f32,
    pub k3: f32,
    pub k4: f32,
    pub p1: f32,
    pub p2: f32,
}

impl Distortion {
    const UNDISTORT_ITERATIONS: usize = 10;

    /// Map undistorted normalized image coordinates to distorted ones.
    pub fn distort(&self, p: Vec2) -> Vec2 {
        let r2 = p.length_squared();
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * (self.k3 + r2 * self.k4)));
        let dx = 2.0 * self.p1 * p.x * p.y + self.p2 * (r2 + 2.0 * p.x * p.x);
        let dy = self.p1 * (r2 + 2.0 * p.y * p.y) + 2.0 * self.p2 * p.x * p.y;
        Vec2::new(p.x * radial + dx, p.y * radial + dy)
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, distorted: Vec2) -> Vec2 {
        let mut p = distorted;
        for _ in 0..Self::UNDISTORT_ITERATIONS {
            let r2 = p.length_squared();
            let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * (self.k3 + r2 * self.k4)));
            let dx = 2.0 * self.p1 * p.x * p.y + self.p2 * (r2 + 2.0 * p.x * p.x);
            let dy = self.p1 * (r2 + 2.0 * p.y * p.y) + 2.0 * self.p2 * p.x * p.y;
            p = Vec2::new((distorted.x - dx) / radial, (distorted.y - dy) / radial);
        }
        p
    }
}

/// A single pinhole camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera-to-world transform.
    pub camera_to_world: Mat4,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
    pub distortion: Option<Distortion>,
}

impl Camera {
    /// Create an undistorted camera with the principal point at the image center.
    pub fn new(camera_to_world: Mat4, focal: f32, width: u32, height: u32) -> Self {
        Self {
            camera_to_world,
            fx: focal,
            fy: focal,
            cx: width as f32 * 0.5,
            cy: height as f32 * 0.5,
            width,
            height,
            distortion: None,
        }
    }

    /// Create a camera at `position` looking at `target`.
    pub fn look_at(position: Vec3, target: Vec3, focal: f32, width: u32, height: u32) -> Self {
        let view = Mat4::look_at_rh(position, target, Vec3::Y);
        Self::new(view.inverse(), focal, width, height)
    }

    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = Some(distortion);
        self
    }

    /// World-space camera center.
    pub fn origin(&self) -> Vec3 {
        self.camera_to_world.w_axis.truncate()
    }

    /// Scale intrinsics and image size by `factor`.
    pub fn rescale_output_resolution(&mut self, factor: f32) {
        self.fx *= factor;
        self.fy *= factor;
        self.cx *= factor;
        self.cy *= factor;
        self.width = (self.width as f32 * factor).floor() as u32;
        self.height = (self.height as f32 * factor).floor() as u32;
    }

    /// Unit world-space direction through the center of pixel `(x, y)`.
    pub fn pixel_direction(&self, x: u32, y: u32, disable_distortion: bool) -> Vec3 {
        let mut coord = Vec2::new(
            (x as f32 + 0.5 - self.cx) / self.fx,
            (y as f32 + 0.5 - self.cy) / self.fy,
        );
        if let Some(distortion) = self.distortion.filter(|_| !disable_distortion) {
            coord = distortion.undistort(coord);
        }
        // Image y points down, camera y points up.
        let local = Vec3::new(coord.x, -coord.y, -1.0);
        self.camera_to_world
            .transform_vector3(local)
            .normalize_or_zero()
    }

    /// Generate one ray per pixel in row-major order.
    pub fn generate_rays(&self, camera_index: usize, disable_distortion: bool) -> CameraRayBundle {
        let count = self.width as usize * self.height as usize;
        let origin = self.origin();
        let mut directions = Vec::with_capacity(count);
        for y in 0..self.height {
            for x in 0..self.width {
                directions.push(self.pixel_direction(x, y, disable_distortion));
            }
        }
        CameraRayBundle {
            camera_index,
            width: self.width,
            height: self.height,
            origins: vec![origin; count],
            directions,
        }
    }
}

/// Rays for every pixel of one camera image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRayBundle {
    pub camera_index: usize,
    pub width: u32,
    pub height: u32,
    pub origins: Vec<Vec3>,
    pub directions: Vec<Vec3>,
}

impl CameraRayBundle {
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// An ordered collection of cameras.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cameras {
    cameras: Vec<Camera>,
}

impl Cameras {
    pub fn new(cameras: Vec<Camera>) -> Self {
        Self { cameras }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Camera> {
        self.cameras.iter()
    }

    /// Camera-to-world transform of camera `index`.
    pub fn camera_to_world(&self, index: usize) -> Result<Mat4, CameraError> {
        self.camera(index).map(|c| c.camera_to_world)
    }

    /// Rescale every camera's output resolution.
    pub fn rescale_output_resolution(&mut self, factor: f32) {
        for camera in &mut self.cameras {
            camera.rescale_output_resolution(factor);
        }
    }

    /// Generate the ray bundle for camera `index`.
    pub fn generate_rays(
        &self,
        index: usize,
        disable_distortion: bool,
    ) -> Result<CameraRayBundle, CameraError> {
        Ok(self.camera(index)?.generate_rays(index, disable_distortion))
    }

    fn camera(&self, index: usize) -> Result<&Camera, CameraError> {
        self.cameras.get(index).ok_or(CameraError::IndexOutOfBounds {
            index,
            count: self.cameras.len(),
        })
    }
}

impl From<Vec<Camera>> for Cameras {
    fn from(cameras: Vec<Camera>) -> Self {
        Self::new(cameras)
    }
}
