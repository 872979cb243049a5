//! Core tensor type for model outputs and exported arrays.
//!
//! A [`Tensor`] is a CPU-side, row-major `f32` buffer with an explicit shape.
//! The first axis is always the ray/point axis, so `rows()` is the number of
//! rays a tensor describes and `row_width()` is the number of values per ray.

use glam::Vec3;
use thiserror::Error;

/// Errors raised when tensor data does not match its declared shape.
#[derive(Debug, Error, PartialEq)]
pub enum TensorError {
    #[error("Shape {shape:?} holds {expected} values but {actual} were supplied")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Tensor with {0} values cannot be viewed as 3-vectors")]
    NotVec3(usize),
}

/// A dense row-major `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// A zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// An `[N, 3]` tensor from a slice of vectors.
    pub fn from_vec3s(values: &[Vec3]) -> Self {
        Self {
            shape: vec![values.len(), 3],
            data: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// An `[N, 1]` tensor from per-ray scalars.
    pub fn from_scalars(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len(), 1],
            data: values,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the leading axis (0 for a rank-0 tensor).
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Number of values per leading-axis entry.
    pub fn row_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Smallest and largest element, or `None` when empty.
    ///
    /// A NaN anywhere makes both bounds NaN so range checks fail loudly.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        if self.data.is_empty() {
            return None;
        }
        if self.data.iter().any(|v| v.is_nan()) {
            return Some((f32::NAN, f32::NAN));
        }
        let (min, max) = self
            .data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some((min, max))
    }

    /// Reinterpret the buffer as a list of 3-vectors.
    pub fn to_vec3s(&self) -> Result<Vec<Vec3>, TensorError> {
        if self.data.len() % 3 != 0 {
            return Err(TensorError::NotVec3(self.data.len()));
        }
        Ok(self
            .data
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect())
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Self {
            shape: vec![0],
            data: Vec::new(),
        }
    }
}
