//! Container reader.
//!
//! Loads a whole `.tcf` file into memory. Intended for inspection and
//! verification of exported data rather than random access into huge files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use super::error::{ContainerError, Result};
use super::format::{CURRENT_VERSION, DType, MAGIC, MAX_NAME_LEN, MAX_RANK};

/// Counts read from the file only bound how many entries may follow; never
/// reserve more than this up front.
const MAX_PREALLOC: usize = 1024;

/// A named `f32` dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Dataset {
    /// Leading dimension (0 for a rank-0 dataset).
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Row `index` of a dataset whose rows are contiguous.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let width: usize = self.shape.iter().skip(1).product();
        self.data.get(index * width..(index + 1) * width)
    }
}

/// A named group of datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub datasets: Vec<Dataset>,
}

impl Group {
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }
}

/// An in-memory container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub version: u16,
    pub groups: Vec<Group>,
}

impl Container {
    /// Read the container at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContainerError::FileNotFound(path.to_path_buf())
            } else {
                ContainerError::Io(e)
            }
        })?;
        Self::read_from(&mut BufReader::new(file))
    }

    /// Parse a container from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ContainerError::InvalidMagic);
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != CURRENT_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let group_count = reader.read_u32::<LittleEndian>()?;
        let mut groups = Vec::with_capacity((group_count as usize).min(MAX_PREALLOC));
        for _ in 0..group_count {
            let name = read_name(reader)?;
            let dataset_count = reader.read_u32::<LittleEndian>()?;
            let mut datasets = Vec::with_capacity((dataset_count as usize).min(MAX_PREALLOC));
            for _ in 0..dataset_count {
                datasets.push(read_dataset(reader)?);
            }
            groups.push(Group { name, datasets });
        }

        Ok(Self { version, groups })
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Look up `group/dataset`.
    pub fn dataset(&self, group: &str, dataset: &str) -> Option<&Dataset> {
        self.group(group).and_then(|g| g.dataset(dataset))
    }
}

fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_NAME_LEN {
        return Err(ContainerError::invalid(format!("name length {len} too large")));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

fn read_dataset<R: Read>(reader: &mut R) -> Result<Dataset> {
    let name = read_name(reader)?;
    let tag = reader.read_u8()?;
    let dtype = DType::from_tag(tag).ok_or(ContainerError::UnsupportedDType(tag))?;
    let rank = reader.read_u32::<LittleEndian>()?;
    if rank > MAX_RANK {
        return Err(ContainerError::invalid(format!("dataset '{name}' has rank {rank}")));
    }
    let mut shape = Vec::with_capacity(rank as usize);
    for _ in 0..rank {
        let dim = reader.read_u64::<LittleEndian>()?;
        let dim = usize::try_from(dim)
            .map_err(|_| ContainerError::invalid(format!("dataset '{name}' dimension {dim} too large")))?;
        shape.push(dim);
    }
    let (count, byte_len) = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|count| Some((count, count.checked_mul(dtype.size())?)))
        .ok_or_else(|| ContainerError::invalid(format!("dataset '{name}' shape {shape:?} overflows")))?;

    // The payload length is bounded by what the reader actually holds.
    let mut bytes = Vec::with_capacity(byte_len.min(MAX_PREALLOC * MAX_PREALLOC));
    reader.by_ref().take(byte_len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != byte_len {
        return Err(ContainerError::invalid(format!(
            "dataset '{name}' declares {byte_len} bytes but only {} remain",
            bytes.len()
        )));
    }
    let mut data = vec![0f32; count];
    LittleEndian::read_f32_into(&bytes, &mut data);

    Ok(Dataset { name, shape, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerWriter;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_groups() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.tcf");

        let mut writer = ContainerWriter::create(&path)?;
        writer.begin_group("points", 1)?;
        writer.write_dataset("points", &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        writer.begin_group("clip", 2)?;
        let rows: Vec<&[f32]> = vec![&[0.5f32, 0.25][..], &[1.5f32, 1.25][..]];
        writer.write_dataset_rows("scale_0", 2, rows)?;
        writer.write_dataset("scale_1", &[2, 2], &[9.0; 4])?;
        writer.begin_group("empty", 0)?;
        writer.finish()?;

        let container = Container::open(&path)?;
        assert_eq!(container.version, CURRENT_VERSION);
        let names: Vec<_> = container.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["points", "clip", "empty"]);

        let points = container.dataset("points", "points").unwrap();
        assert_eq!(points.shape, vec![2, 3]);
        assert_eq!(points.row(1), Some(&[4.0, 5.0, 6.0][..]));

        let scale = container.dataset("clip", "scale_0").unwrap();
        assert_eq!(scale.shape, vec![2, 2]);
        assert_eq!(scale.data, vec![0.5, 0.25, 1.5, 1.25]);
        assert!(container.group("empty").unwrap().datasets.is_empty());
        Ok(())
    }

    #[test]
    fn test_finish_overwrites_existing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.tcf");
        std::fs::write(&path, b"stale contents")?;

        let mut writer = ContainerWriter::create(&path)?;
        writer.begin_group("rgb", 1)?;
        writer.write_dataset("rgb", &[1, 3], &[0.1, 0.2, 0.3])?;
        writer.finish()?;

        let container = Container::open(&path)?;
        assert_eq!(container.groups.len(), 1);
        Ok(())
    }

    #[test]
    fn test_dropped_writer_leaves_no_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.tcf");
        {
            let mut writer = ContainerWriter::create(&path)?;
            writer.begin_group("points", 1)?;
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_writer_rejects_bad_structure() -> Result<()> {
        let dir = TempDir::new()?;
        let mut writer = ContainerWriter::create(dir.path().join("bad.tcf"))?;

        let err = writer.write_dataset("orphan", &[1], &[0.0]).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidStructure(_)));

        writer.begin_group("g", 1)?;
        let err = writer.write_dataset("d", &[2, 3], &[0.0; 5]).unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { actual: 5, .. }));

        let err = writer.begin_group("h", 1).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidStructure(_)));
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes: &[u8] = b"NOTACONTAINER...";
        let err = Container::read_from(&mut bytes).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidMagic));
    }

    /// Header bytes up to and including the dataset shape, with no payload.
    fn truncated_header(group_count: u32, dataset_count: u32, shape: &[u64]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&group_count.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'g');
        bytes.extend_from_slice(&dataset_count.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'd');
        bytes.push(DType::F32.tag());
        bytes.extend_from_slice(&(shape.len() as u32).to_le_bytes());
        for dim in shape {
            bytes.extend_from_slice(&dim.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let bytes = truncated_header(1, 1, &[1 << 62]);
        let err = Container::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidStructure(_)), "{err}");
    }

    #[test]
    fn test_huge_counts_fail_without_allocating() {
        let bytes = truncated_header(u32::MAX, u32::MAX, &[1 << 40]);
        let err = Container::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidStructure(_)), "{err}");

        let bytes = truncated_header(u32::MAX, u32::MAX, &[2, 3]);
        assert!(Container::read_from(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let err = Container::open("/nonexistent/data.tcf").unwrap_err();
        assert!(matches!(err, ContainerError::FileNotFound(_)));
    }
}
