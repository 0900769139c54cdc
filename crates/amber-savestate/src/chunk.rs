use std::ops::Range;

use thiserror::Error;

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("savestate chunk truncated")]
    Truncated,

    #[error("chunk id mismatch (expected {expected:?}, found {found:?})")]
    ChunkIdMismatch { expected: [u8; 4], found: [u8; 4] },

    #[error("unsupported chunk major version {found} (expected {expected})")]
    UnsupportedMajor { expected: u16, found: u16 },

    #[error("invalid field encoding: {0}")]
    InvalidFieldEncoding(&'static str),
}

/// Chunk-level format version. Additions within a major version must be
/// forward compatible (new tags only); a major bump breaks compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub major: u16,
    pub minor: u16,
}

impl SnapshotVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// Serializes one chunk: a fixed header followed by `(tag, len, bytes)`
/// fields in call order.
#[derive(Debug)]
pub struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    pub fn new(id: [u8; 4], version: SnapshotVersion) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&id);
        buf.extend_from_slice(&version.major.to_le_bytes());
        buf.extend_from_slice(&version.minor.to_le_bytes());
        Self { buf }
    }

    fn field(&mut self, tag: u16, bytes: &[u8]) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(bytes);
    }

    pub fn field_u8(&mut self, tag: u16, value: u8) {
        self.field(tag, &[value]);
    }

    pub fn field_u16(&mut self, tag: u16, value: u16) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_u32(&mut self, tag: u16, value: u32) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_u64(&mut self, tag: u16, value: u64) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_bool(&mut self, tag: u16, value: bool) {
        self.field(tag, &[u8::from(value)]);
    }

    pub fn field_bytes(&mut self, tag: u16, bytes: Vec<u8>) {
        self.field(tag, &bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Parses one chunk and provides tag-based field lookup.
///
/// Unknown tags are retained but never looked up, which is what makes new
/// fields forward compatible. If a tag occurs more than once the last
/// occurrence wins.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    bytes: &'a [u8],
    version: SnapshotVersion,
    fields: Vec<(u16, Range<usize>)>,
}

impl<'a> ChunkReader<'a> {
    const HEADER_LEN: usize = 8;
    const FIELD_HEADER_LEN: usize = 6;

    pub fn parse(bytes: &'a [u8], expected_id: [u8; 4]) -> SnapshotResult<Self> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(SnapshotError::Truncated);
        }
        let mut found = [0u8; 4];
        found.copy_from_slice(&bytes[..4]);
        if found != expected_id {
            return Err(SnapshotError::ChunkIdMismatch {
                expected: expected_id,
                found,
            });
        }
        let major = u16::from_le_bytes([bytes[4], bytes[5]]);
        let minor = u16::from_le_bytes([bytes[6], bytes[7]]);

        let mut fields = Vec::new();
        let mut pos = Self::HEADER_LEN;
        while pos < bytes.len() {
            if bytes.len() - pos < Self::FIELD_HEADER_LEN {
                return Err(SnapshotError::Truncated);
            }
            let tag = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            let len = u32::from_le_bytes([
                bytes[pos + 2],
                bytes[pos + 3],
                bytes[pos + 4],
                bytes[pos + 5],
            ]) as usize;
            pos += Self::FIELD_HEADER_LEN;
            if bytes.len() - pos < len {
                return Err(SnapshotError::Truncated);
            }
            fields.push((tag, pos..pos + len));
            pos += len;
        }

        Ok(Self {
            bytes,
            version: SnapshotVersion::new(major, minor),
            fields,
        })
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn ensure_chunk_major(&self, expected: u16) -> SnapshotResult<()> {
        if self.version.major != expected {
            return Err(SnapshotError::UnsupportedMajor {
                expected,
                found: self.version.major,
            });
        }
        Ok(())
    }

    fn field(&self, tag: u16) -> Option<&'a [u8]> {
        self.fields
            .iter()
            .rev()
            .find(|(t, _)| *t == tag)
            .map(|(_, range)| &self.bytes[range.clone()])
    }

    pub fn u8(&self, tag: u16) -> SnapshotResult<Option<u8>> {
        match self.field(tag) {
            None => Ok(None),
            Some([v]) => Ok(Some(*v)),
            Some(_) => Err(SnapshotError::InvalidFieldEncoding("u8 field width")),
        }
    }

    pub fn u16(&self, tag: u16) -> SnapshotResult<Option<u16>> {
        match self.field(tag) {
            None => Ok(None),
            Some(b) => {
                let b: [u8; 2] = b
                    .try_into()
                    .map_err(|_| SnapshotError::InvalidFieldEncoding("u16 field width"))?;
                Ok(Some(u16::from_le_bytes(b)))
            }
        }
    }

    pub fn u32(&self, tag: u16) -> SnapshotResult<Option<u32>> {
        match self.field(tag) {
            None => Ok(None),
            Some(b) => {
                let b: [u8; 4] = b
                    .try_into()
                    .map_err(|_| SnapshotError::InvalidFieldEncoding("u32 field width"))?;
                Ok(Some(u32::from_le_bytes(b)))
            }
        }
    }

    pub fn u64(&self, tag: u16) -> SnapshotResult<Option<u64>> {
        match self.field(tag) {
            None => Ok(None),
            Some(b) => {
                let b: [u8; 8] = b
                    .try_into()
                    .map_err(|_| SnapshotError::InvalidFieldEncoding("u64 field width"))?;
                Ok(Some(u64::from_le_bytes(b)))
            }
        }
    }

    pub fn bool(&self, tag: u16) -> SnapshotResult<Option<bool>> {
        match self.u8(tag)? {
            None => Ok(None),
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            Some(_) => Err(SnapshotError::InvalidFieldEncoding("bool field value")),
        }
    }

    pub fn bytes(&self, tag: u16) -> Option<&'a [u8]> {
        self.field(tag)
    }
}
