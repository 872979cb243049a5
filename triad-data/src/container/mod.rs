//! The triad container format (`.tcf`).
//!
//! A single-file hierarchical store: named groups, each holding named `f32`
//! datasets with an explicit shape. Layout (little-endian):
//!
//! ```text
//! magic          b"TRIADCF\0"
//! version        u16
//! group_count    u32
//! group:         name, dataset_count u32, dataset*
//! dataset:       name, dtype u8, rank u32, dims u64 * rank, payload
//! name:          u32 byte length + UTF-8 bytes
//! ```

mod error;
mod format;
mod reader;
mod writer;

pub use error::{ContainerError, Result};
pub use format::{CURRENT_VERSION, DType, MAGIC};
pub use reader::{Container, Dataset, Group};
pub use writer::ContainerWriter;
