//! Checksummed whole-file payloads.
//!
//! Layout: `LCNA` magic, payload length (u64 LE), payload, CRC32 of the
//! payload (u32 LE). Files are written under a temporary name and renamed
//! into place, so a reader never observes a half-written file.

use std::io::{Read, Write};

use crate::error::{LucernaError, Result};
use crate::storage::traits::{Storage, StorageError};

const MAGIC: &[u8; 4] = b"LCNA";

/// Write `payload` to `name`.
pub fn write_checksummed(storage: &dyn Storage, name: &str, payload: &[u8]) -> Result<()> {
    let temp_name = format!("{name}.tmp");
    let mut output = storage.create_output(&temp_name)?;

    output.write_all(MAGIC)?;
    output.write_all(&(payload.len() as u64).to_le_bytes())?;
    output.write_all(payload)?;
    output.write_all(&crc32fast::hash(payload).to_le_bytes())?;
    output.close()?;
    drop(output);

    storage.rename_file(&temp_name, name)
}

/// Read and verify a payload written by [`write_checksummed`].
pub fn read_checksummed(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut input = storage.open_input(name)?;
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;

    if raw.len() < 16 || &raw[..4] != MAGIC {
        return Err(StorageError::Corrupted(name.to_string()).into());
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&raw[4..12]);
    let len = usize::try_from(u64::from_le_bytes(len_bytes))
        .map_err(|_| LucernaError::storage(format!("{name}: payload too large")))?;

    if raw.len() != 16 + len {
        return Err(StorageError::Corrupted(name.to_string()).into());
    }

    let payload = &raw[12..12 + len];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&raw[12 + len..]);

    if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
        return Err(StorageError::Corrupted(name.to_string()).into());
    }

    Ok(payload.to_vec())
}
