//! Point cloud export configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::error::{ExportError, Result};

/// Number of scales in a per-ray multi-scale embedding.
pub const EMBEDDING_SCALES: usize = 30;

/// Feature width of one embedding scale.
pub const EMBEDDING_WIDTH: usize = 512;

/// Options recognized by [`generate_point_cloud`](crate::export::generate_point_cloud).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointCloudConfig {
    /// Number of points to sample. Outlier removal may leave fewer.
    pub num_points: usize,
    pub remove_outliers: bool,
    /// Estimate normals from point geometry.
    pub estimate_normals: bool,
    pub rgb_output_name: String,
    pub depth_output_name: String,
    pub clip_output_name: String,
    /// Model output holding normals in `[0, 1]`.
    pub normal_output_name: Option<String>,
    /// Outlier threshold in standard deviations of the neighbour distance.
    pub std_ratio: f64,
    /// Neighbours per point for outlier statistics.
    pub outlier_neighbors: usize,
    /// Neighbours per point for normal estimation.
    pub normal_neighbors: usize,
    /// Where the raw sample container is written.
    pub container_path: PathBuf,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            num_points: 1_000_000,
            remove_outliers: true,
            estimate_normals: false,
            rgb_output_name: "rgb".to_string(),
            depth_output_name: "depth".to_string(),
            clip_output_name: "clip".to_string(),
            normal_output_name: None,
            std_ratio: 10.0,
            outlier_neighbors: 20,
            normal_neighbors: 30,
            container_path: PathBuf::from("data.tcf"),
        }
    }
}

impl PointCloudConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check the options and derive the normal policy.
    pub fn validate(&self) -> Result<NormalPolicy> {
        if !self.std_ratio.is_finite() || self.std_ratio < 0.0 {
            return Err(ExportError::InvalidConfig(format!(
                "std_ratio must be a non-negative number, got {}",
                self.std_ratio
            )));
        }
        if self.outlier_neighbors == 0 || self.normal_neighbors == 0 {
            return Err(ExportError::InvalidConfig(
                "neighbour counts must be at least 1".to_string(),
            ));
        }
        self.normal_policy()
    }

    pub fn normal_policy(&self) -> Result<NormalPolicy> {
        NormalPolicy::from_options(self.estimate_normals, self.normal_output_name.as_deref())
    }

    pub fn channel_names(&self) -> ChannelNames {
        ChannelNames {
            rgb: self.rgb_output_name.clone(),
            depth: self.depth_output_name.clone(),
            clip: self.clip_output_name.clone(),
            normal: self.normal_output_name.clone(),
        }
    }
}

/// Where the exported point cloud's normals come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NormalPolicy {
    /// No normals.
    #[default]
    None,
    /// Estimate from the (filtered) point geometry.
    Estimate,
    /// Use the named model output.
    Propagate(String),
}

impl NormalPolicy {
    /// Combine the two user-facing options. Asking for both is an error.
    pub fn from_options(estimate: bool, normal_output_name: Option<&str>) -> Result<Self> {
        match (estimate, normal_output_name) {
            (true, Some(_)) => Err(ExportError::ConflictingNormalPolicy),
            (true, None) => Ok(Self::Estimate),
            (false, Some(name)) => Ok(Self::Propagate(name.to_string())),
            (false, None) => Ok(Self::None),
        }
    }

    /// The model channel this policy needs, if any.
    pub fn requested_channel(&self) -> Option<&str> {
        match self {
            Self::Propagate(name) => Some(name),
            _ => None,
        }
    }
}

/// Model output names the exporter reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub rgb: String,
    pub depth: String,
    pub clip: String,
    pub normal: Option<String>,
}

impl Default for ChannelNames {
    fn default() -> Self {
        PointCloudConfig::default().channel_names()
    }
}
