//! Container writer.
//!
//! Output goes to a hidden `.partial` sibling of the target path and is
//! renamed over the target only by [`ContainerWriter::finish`]. A writer that
//! is dropped without finishing removes its partial file, so the target path
//! either holds a complete container or is left untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use tracing::{debug, warn};

use super::error::{ContainerError, Result};
use super::format::{CURRENT_VERSION, DType, GROUP_COUNT_OFFSET, MAGIC};

const CHUNK_VALUES: usize = 16 * 1024;

struct OpenGroup {
    name: String,
    remaining: u32,
}

/// Streaming writer for `.tcf` containers.
pub struct ContainerWriter {
    writer: Option<BufWriter<File>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    group_count: u32,
    open_group: Option<OpenGroup>,
    finished: bool,
}

impl ContainerWriter {
    /// Start a new container that will replace `path` on [`finish`](Self::finish).
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let file_name = final_path
            .file_name()
            .ok_or_else(|| ContainerError::invalid("container path has no file name"))?
            .to_string_lossy()
            .into_owned();
        let partial_path = final_path.with_file_name(format!(".{file_name}.partial"));

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial_path)?;
        let mut writer = BufWriter::with_capacity(2 * 1024 * 1024, file);

        writer.write_all(MAGIC)?;
        writer.write_u16::<LittleEndian>(CURRENT_VERSION)?;
        // Patched by finish().
        writer.write_u32::<LittleEndian>(0)?;

        Ok(Self {
            writer: Some(writer),
            partial_path,
            final_path,
            group_count: 0,
            open_group: None,
            finished: false,
        })
    }

    /// Begin a group that will hold exactly `dataset_count` datasets.
    pub fn begin_group(&mut self, name: &str, dataset_count: u32) -> Result<()> {
        if let Some(open) = &self.open_group {
            return Err(ContainerError::invalid(format!(
                "group '{}' still expects {} dataset(s)",
                open.name, open.remaining
            )));
        }
        let writer = self.writer()?;
        write_name(writer, name)?;
        writer.write_u32::<LittleEndian>(dataset_count)?;
        self.group_count += 1;
        if dataset_count > 0 {
            self.open_group = Some(OpenGroup {
                name: name.to_string(),
                remaining: dataset_count,
            });
        }
        debug!("Group '{}' with {} dataset(s)", name, dataset_count);
        Ok(())
    }

    /// Write a dataset from a contiguous row-major buffer.
    pub fn write_dataset(&mut self, name: &str, shape: &[usize], data: &[f32]) -> Result<()> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(ContainerError::ShapeMismatch {
                name: name.to_string(),
                shape: shape.to_vec(),
                actual: data.len(),
            });
        }
        self.write_dataset_header(name, shape)?;
        write_f32s(self.writer()?, data)?;
        self.close_dataset();
        Ok(())
    }

    /// Write a `[rows, width]` dataset from an iterator of row slices.
    ///
    /// Lets callers write strided views (one scale of a multi-scale
    /// embedding, say) without gathering them into a new buffer first.
    pub fn write_dataset_rows<'a, I>(&mut self, name: &str, width: usize, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [f32]>,
        I::IntoIter: ExactSizeIterator,
    {
        let rows = rows.into_iter();
        let shape = [rows.len(), width];
        self.write_dataset_header(name, &shape)?;
        let writer = self.writer()?;
        for row in rows {
            if row.len() != width {
                return Err(ContainerError::ShapeMismatch {
                    name: name.to_string(),
                    shape: shape.to_vec(),
                    actual: row.len(),
                });
            }
            write_f32s(writer, row)?;
        }
        self.close_dataset();
        Ok(())
    }

    /// Finalize the header and move the container into place.
    pub fn finish(mut self) -> Result<()> {
        if let Some(open) = &self.open_group {
            return Err(ContainerError::invalid(format!(
                "group '{}' still expects {} dataset(s)",
                open.name, open.remaining
            )));
        }
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| ContainerError::invalid("writer already closed"))?;
        writer.seek(SeekFrom::Start(GROUP_COUNT_OFFSET))?;
        writer.write_u32::<LittleEndian>(self.group_count)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.partial_path, &self.final_path)?;
        self.finished = true;
        debug!(
            "Container written to {} ({} groups)",
            self.final_path.display(),
            self.group_count
        );
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| ContainerError::invalid("writer already closed"))
    }

    fn write_dataset_header(&mut self, name: &str, shape: &[usize]) -> Result<()> {
        match &self.open_group {
            Some(open) if open.remaining > 0 => {}
            _ => {
                return Err(ContainerError::invalid(format!(
                    "dataset '{name}' written outside of an open group"
                )));
            }
        }
        let writer = self.writer()?;
        write_name(writer, name)?;
        writer.write_u8(DType::F32.tag())?;
        writer.write_u32::<LittleEndian>(shape.len() as u32)?;
        for &dim in shape {
            writer.write_u64::<LittleEndian>(dim as u64)?;
        }
        Ok(())
    }

    fn close_dataset(&mut self) {
        if let Some(open) = &mut self.open_group {
            open.remaining -= 1;
            if open.remaining == 0 {
                self.open_group = None;
            }
        }
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.writer.take();
        if let Err(e) = fs::remove_file(&self.partial_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove partial container {}: {}",
                    self.partial_path.display(),
                    e
                );
            }
        }
    }
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(name.len() as u32)?;
    writer.write_all(name.as_bytes())?;
    Ok(())
}

fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_VALUES.min(values.len()) * 4];
    for chunk in values.chunks(CHUNK_VALUES) {
        let bytes = &mut buf[..chunk.len() * 4];
        LittleEndian::write_f32_into(chunk, bytes);
        writer.write_all(bytes)?;
    }
    Ok(())
}
