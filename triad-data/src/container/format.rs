//! Container format constants.

/// Magic bytes at the start of a container file.
pub const MAGIC: &[u8; 8] = b"TRIADCF\0";

/// Current format version.
pub const CURRENT_VERSION: u16 = 1;

/// Byte offset of the group count in the header.
pub const GROUP_COUNT_OFFSET: u64 = (MAGIC.len() + 2) as u64;

/// Upper bound on name length accepted by the reader.
pub const MAX_NAME_LEN: u32 = 4096;

/// Upper bound on dataset rank accepted by the reader.
pub const MAX_RANK: u32 = 32;

/// Element type of a dataset payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DType {
    F32 = 1,
}

impl DType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::F32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_tags() {
        assert_eq!(DType::from_tag(DType::F32.tag()), Some(DType::F32));
        assert_eq!(DType::from_tag(0), None);
        assert_eq!(DType::F32.size(), 4);
    }

    #[test]
    fn test_group_count_offset() {
        assert_eq!(GROUP_COUNT_OFFSET, 10);
    }
}
