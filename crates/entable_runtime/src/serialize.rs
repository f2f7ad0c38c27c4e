//! Schema snapshot serialization using `MessagePack`.
//!
//! Hosts cache built snapshots instead of rebuilding them from definitions
//! on every start.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use entable_foundation::{Error, Result};
use entable_schema::SchemaSnapshot;

/// Serializes a snapshot to bytes using `MessagePack` format.
///
/// Uses named serialization to preserve struct field names.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn snapshot_to_bytes(snapshot: &SchemaSnapshot) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(snapshot)
        .map_err(|e| Error::internal(format!("snapshot serialization failed: {e}")))
}

/// Deserializes a snapshot from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not an encoded snapshot.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<SchemaSnapshot> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| Error::internal(format!("snapshot deserialization failed: {e}")))
}

/// Saves a snapshot to a file, overwriting it if it exists.
///
/// # Errors
///
/// Returns an error if the file cannot be written or serialization fails.
pub fn save_snapshot<P: AsRef<Path>>(snapshot: &SchemaSnapshot, path: P) -> Result<()> {
    let path = path.as_ref();
    let io_error =
        |e: std::io::Error| Error::internal(format!("failed to write '{}': {e}", path.display()));

    let bytes = snapshot_to_bytes(snapshot)?;
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    writer.write_all(&bytes).map_err(io_error)?;
    writer.flush().map_err(io_error)
}

/// Loads a snapshot saved by [`save_snapshot`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a snapshot.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<SchemaSnapshot> {
    let path = path.as_ref();
    let io_error =
        |e: std::io::Error| Error::internal(format!("failed to read '{}': {e}", path.display()));

    let mut bytes = Vec::new();
    BufReader::new(File::open(path).map_err(io_error)?)
        .read_to_end(&mut bytes)
        .map_err(io_error)?;
    snapshot_from_bytes(&bytes)
}
