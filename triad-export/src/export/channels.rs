//! Output channel resolution.
//!
//! Turns the loosely typed [`OutputMap`] a model returns into the typed
//! per-ray arrays the exporter works with, or a diagnostic naming exactly
//! what is missing.

use glam::Vec3;
use triad_data::Tensor;

use crate::export::config::{ChannelNames, EMBEDDING_SCALES, EMBEDDING_WIDTH};
use crate::export::error::{ExportError, Result};
use crate::ingest::OutputMap;

/// Per-ray channels of one model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChannels {
    pub rgb: Vec<Vec3>,
    pub depth: Vec<f32>,
    /// Row-major `[N, EMBEDDING_SCALES, EMBEDDING_WIDTH]`.
    pub clip: Vec<f32>,
    /// Normals already remapped to `[-1, 1]`.
    pub normals: Option<Vec<Vec3>>,
}

impl OutputMap {
    /// Fail with every name in `required` that is absent.
    pub fn require(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExportError::MissingChannels {
                missing,
                available: self.names(),
            })
        }
    }

    /// Resolve the configured channels for a batch of `ray_count` rays.
    pub fn resolve(&self, names: &ChannelNames, ray_count: usize) -> Result<ResolvedChannels> {
        self.require(&[names.rgb.as_str(), names.depth.as_str(), names.clip.as_str()])?;
        let normal_tensor = match &names.normal {
            Some(name) => Some(self.get(name).ok_or_else(|| ExportError::MissingNormalChannel {
                requested: name.clone(),
                available: self.names(),
            })?),
            None => None,
        };

        let rgb = self.channel(&names.rgb, ray_count * 3)?.to_vec3s()?;
        let depth = self.channel(&names.depth, ray_count)?.data().to_vec();
        let clip = self
            .channel(&names.clip, ray_count * EMBEDDING_SCALES * EMBEDDING_WIDTH)?
            .data()
            .to_vec();

        let normals = match (normal_tensor, &names.normal) {
            (Some(tensor), Some(name)) => {
                check_len(name, tensor, ray_count * 3)?;
                Some(remap_normals(tensor)?)
            }
            _ => None,
        };

        Ok(ResolvedChannels {
            rgb,
            depth,
            clip,
            normals,
        })
    }

    fn channel(&self, name: &str, expected: usize) -> Result<&Tensor> {
        let tensor = self.get(name).ok_or_else(|| ExportError::MissingChannels {
            missing: vec![name.to_string()],
            available: self.names(),
        })?;
        check_len(name, tensor, expected)?;
        Ok(tensor)
    }
}

fn check_len(name: &str, tensor: &Tensor, expected: usize) -> Result<()> {
    if tensor.len() != expected {
        return Err(ExportError::ShapeMismatch {
            channel: name.to_string(),
            expected,
            actual: tensor.len(),
        });
    }
    Ok(())
}

/// Map model normals from `[0, 1]` to `[-1, 1]`.
///
/// Values outside `[0, 1]` (or NaN) mean the model broke its output
/// contract and are rejected rather than clamped.
pub fn remap_normals(tensor: &Tensor) -> Result<Vec<Vec3>> {
    if let Some((min, max)) = tensor.min_max() {
        if !(min >= 0.0 && max <= 1.0) {
            return Err(ExportError::NormalOutOfRange { min, max });
        }
    }
    let normals = tensor.to_vec3s()?;
    Ok(normals.into_iter().map(|n| n * 2.0 - Vec3::ONE).collect())
}
