//! Per-camera rendering along a camera trajectory.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, RgbImage};
use tracing::{debug, info};
use triad_data::{Cameras, Tensor};

use crate::export::error::{ExportError, Result};
use crate::export::progress::ProgressReporter;
use crate::ingest::{OutputMap, RadianceField};

/// Options for [`render_trajectory`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub rgb_output_name: String,
    pub depth_output_name: String,
    /// Multiplies every camera's resolution and intrinsics before rendering.
    pub rendered_resolution_scaling_factor: f32,
    pub disable_distortion: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            rgb_output_name: "rgb".to_string(),
            depth_output_name: "depth".to_string(),
            rendered_resolution_scaling_factor: 1.0,
            disable_distortion: false,
        }
    }
}

/// One RGB (`[H, W, 3]`) and one depth (`[H, W, 1]`) image per camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedTrajectory {
    pub rgb: Vec<Tensor>,
    pub depth: Vec<Tensor>,
}

impl RenderedTrajectory {
    pub fn len(&self) -> usize {
        self.rgb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }
}

/// Render every camera of `cameras`, in order.
#[tracing::instrument(skip_all, fields(cameras = cameras.len()))]
pub fn render_trajectory<M, P>(
    model: &M,
    cameras: &Cameras,
    options: &RenderOptions,
    progress: &mut P,
) -> Result<RenderedTrajectory>
where
    M: RadianceField + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let mut cameras = cameras.clone();
    if options.rendered_resolution_scaling_factor != 1.0 {
        cameras.rescale_output_resolution(options.rendered_resolution_scaling_factor);
    }

    let mut rendered = RenderedTrajectory::default();
    progress.start("Rendering trajectory", cameras.len() as u64);
    for index in 0..cameras.len() {
        let bundle = cameras.generate_rays(index, options.disable_distortion)?;
        let outputs = model.evaluate_for_camera(&bundle)?;
        outputs.require(&[
            options.rgb_output_name.as_str(),
            options.depth_output_name.as_str(),
        ])?;

        let (width, height) = (bundle.width as usize, bundle.height as usize);
        let rgb = image_tensor(&outputs, &options.rgb_output_name, height, width, 3)?;
        let depth = image_tensor(&outputs, &options.depth_output_name, height, width, 1)?;
        debug!("Rendered camera {} ({}x{})", index, width, height);

        rendered.rgb.push(rgb);
        rendered.depth.push(depth);
        progress.advance(1);
    }
    progress.finish();

    Ok(rendered)
}

/// Reshape a per-pixel channel to `[height, width, channels]`.
fn image_tensor(
    outputs: &OutputMap,
    name: &str,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Tensor> {
    let expected = height * width * channels;
    let tensor = outputs.get(name).ok_or_else(|| ExportError::MissingChannels {
        missing: vec![name.to_string()],
        available: outputs.names(),
    })?;
    if tensor.len() != expected {
        return Err(ExportError::ShapeMismatch {
            channel: name.to_string(),
            expected,
            actual: tensor.len(),
        });
    }
    Ok(Tensor::new(vec![height, width, channels], tensor.data().to_vec())?)
}

/// Convert an `[H, W, 3]` tensor in `[0, 1]` to an 8-bit image.
pub fn rgb_to_image(tensor: &Tensor) -> Result<RgbImage> {
    let (height, width) = image_dims(tensor, 3)?;
    let bytes = tensor
        .data()
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(width, height, bytes).ok_or_else(|| ExportError::ImageShape {
        channels: 3,
        shape: tensor.shape().to_vec(),
    })
}

/// Convert an `[H, W, 1]` depth tensor to a grayscale image, near is bright.
///
/// Depths are normalized by the finite min/max of the image.
pub fn depth_to_image(tensor: &Tensor) -> Result<GrayImage> {
    let (height, width) = image_dims(tensor, 1)?;
    let (near, far) = tensor
        .data()
        .iter()
        .filter(|d| d.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));
    let range = if far > near { far - near } else { 1.0 };

    let mut image = GrayImage::new(width, height);
    for (pixel, depth) in image.pixels_mut().zip(tensor.data()) {
        let value = if depth.is_finite() {
            1.0 - (depth - near) / range
        } else {
            0.0
        };
        *pixel = Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8]);
    }
    Ok(image)
}

fn image_dims(tensor: &Tensor, channels: usize) -> Result<(u32, u32)> {
    match tensor.shape() {
        [h, w, c] if *c == channels => Ok((*h as u32, *w as u32)),
        shape => Err(ExportError::ImageShape {
            channels,
            shape: shape.to_vec(),
        }),
    }
}

/// Write `rgb_XXXX.png` and `depth_XXXX.png` per camera into `dir`.
pub fn save_trajectory_images(dir: &Path, rendered: &RenderedTrajectory) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(rendered.len() * 2);
    for (index, (rgb, depth)) in rendered.rgb.iter().zip(&rendered.depth).enumerate() {
        let rgb_path = dir.join(format!("rgb_{index:04}.png"));
        rgb_to_image(rgb)?.save(&rgb_path)?;
        let depth_path = dir.join(format!("depth_{index:04}.png"));
        depth_to_image(depth)?.save(&depth_path)?;
        written.push(rgb_path);
        written.push(depth_path);
    }
    info!("Wrote {} images to {}", written.len(), dir.display());
    Ok(written)
}
