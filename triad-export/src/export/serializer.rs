//! Writes the raw (unfiltered) samples to a `.tcf` container.
//!
//! Layout:
//!
//! | group        | dataset               | shape                 |
//! |--------------|-----------------------|-----------------------|
//! | `origins`    | `origins`             | `[N, 3]`              |
//! | `directions` | `directions`          | `[N, 3]`              |
//! | `points`     | `points`              | `[N, 3]`              |
//! | `rgb`        | `rgb`                 | `[N, 3]`              |
//! | `clip`       | `scale_0..scale_29`   | `[N, 512]` each       |

use std::path::Path;

use glam::Vec3;
use tracing::info;
use triad_data::ContainerWriter;

use crate::export::accumulator::AccumulatedSet;
use crate::export::config::{EMBEDDING_SCALES, EMBEDDING_WIDTH};
use crate::export::error::Result;

/// Name of embedding scale `index` inside the `clip` group.
pub fn scale_dataset_name(index: usize) -> String {
    format!("scale_{index}")
}

/// Serialize `set` to `path`, replacing any existing file.
///
/// The file only appears at `path` once every group is written.
pub fn write_container(path: &Path, set: &AccumulatedSet) -> Result<()> {
    info!("Saving {} samples to {}", set.len(), path.display());
    let mut writer = ContainerWriter::create(path)?;

    for (name, values) in [
        ("origins", &set.origins),
        ("directions", &set.directions),
        ("points", &set.points),
        ("rgb", &set.rgbs),
    ] {
        writer.begin_group(name, 1)?;
        writer.write_dataset(name, &[values.len(), 3], &flatten(values))?;
    }

    writer.begin_group("clip", EMBEDDING_SCALES as u32)?;
    for scale in 0..EMBEDDING_SCALES {
        writer.write_dataset_rows(
            &scale_dataset_name(scale),
            EMBEDDING_WIDTH,
            set.clip_scale_rows(scale),
        )?;
    }

    writer.finish()?;
    Ok(())
}

fn flatten(values: &[Vec3]) -> Vec<f32> {
    values.iter().flat_map(|v| v.to_array()).collect()
}
