//! Deterministic save-state encoding for the emulator core.
//!
//! The save-state format uses a small tag-length-value (TLV) encoding to provide:
//! - deterministic byte output (fields are written in call order)
//! - forward compatibility (unknown tags are skipped)
//! - explicit versioning (major/minor) per chunk
//!
//! Every persistable subsystem serializes itself into one *chunk*: a four-byte
//! chunk id, a version pair, and a flat sequence of tagged fields. Nested
//! structures (tables, per-slot records) are packed into a single field with
//! [`codec::Encoder`] and unpacked with [`codec::Decoder`].

pub mod codec;

mod chunk;

pub use chunk::{ChunkReader, ChunkWriter, SnapshotError, SnapshotResult, SnapshotVersion};

/// Save-state contract for emulated subsystems.
///
/// Implementations must keep `CHUNK_ID` stable forever and only perform
/// forward-compatible additions within the same major version by adding new
/// TLV fields.
pub trait SaveState {
    const CHUNK_ID: [u8; 4];
    const CHUNK_VERSION: SnapshotVersion;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}
