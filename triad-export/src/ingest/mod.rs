//! Data ingestion module
//!
//! Interfaces the exporter consumes from the training side:
//! - Ray batch sampling (`RayBatchSource`)
//! - Model evaluation (`RadianceField`, `OutputMap`)
//! - Camera datasets (`DataManager`, `InputDataset`)

pub mod dataset;
pub mod model;
pub mod rays;

pub use dataset::{DataManager, InputDataset};
pub use model::{ModelError, OutputMap, RadianceField};
pub use rays::{BatchMetadata, RayBatch, RayBatchSource, SourceError};
