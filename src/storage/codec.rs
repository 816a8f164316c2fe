//! On-disk record format: versioned JSON, optionally zstd-compressed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};

use crate::error::{Error, Result};
use crate::models::Checkpoint;

pub const RECORD_FORMAT: &str = "relaunch-checkpoint";
pub const RECORD_VERSION: u32 = 1;

/// Extension of an uncompressed record
pub const RECORD_EXT: &str = "ckpt";
/// Extension of a compressed record
pub const COMPRESSED_EXT: &str = "ckpt.zst";

const ZSTD_LEVEL: i32 = 3;

#[derive(Serialize)]
struct RecordOut<'a> {
    format: &'a str,
    version: u32,
    #[serde(flatten)]
    checkpoint: &'a Checkpoint,
}

#[derive(Deserialize)]
struct RecordIn {
    format: String,
    version: u32,
    #[serde(flatten)]
    checkpoint: Checkpoint,
}

pub fn encode(checkpoint: &Checkpoint) -> Result<Vec<u8>> {
    let record = RecordOut {
        format: RECORD_FORMAT,
        version: RECORD_VERSION,
        checkpoint,
    };
    serde_json::to_vec_pretty(&record).map_err(|e| Error::corrupt(&checkpoint.id, e))
}

/// Decode a record and check it is the checkpoint it was filed under.
pub fn decode(id: &str, bytes: &[u8]) -> Result<Checkpoint> {
    let record: RecordIn = serde_json::from_slice(bytes).map_err(|e| Error::corrupt(id, e))?;

    if record.format != RECORD_FORMAT {
        return Err(Error::corrupt(
            id,
            format!("unexpected record format '{}'", record.format),
        ));
    }
    if record.version > RECORD_VERSION {
        return Err(Error::corrupt(
            id,
            format!("record version {} is newer than supported {RECORD_VERSION}", record.version),
        ));
    }
    if record.checkpoint.id != id {
        return Err(Error::corrupt(
            id,
            format!("record carries id '{}'", record.checkpoint.id),
        ));
    }

    Ok(record.checkpoint)
}

/// Hex SHA-256 of the given bytes
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut compressed = Vec::new();
    {
        let mut encoder = zstd::Encoder::new(&mut compressed, ZSTD_LEVEL)?;
        encoder.write_all(bytes)?;
        encoder.finish()?;
    }
    Ok(compressed)
}

pub fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    zstd::stream::decode_all(Cursor::new(bytes))
}

/// Split a record file name into its checkpoint id and compression flag.
pub fn parse_record_name(file_name: &str) -> Option<(&str, bool)> {
    if file_name.starts_with('.') {
        return None;
    }
    if let Some(id) = file_name.strip_suffix(&format!(".{COMPRESSED_EXT}")) {
        return Some((id, true));
    }
    file_name
        .strip_suffix(&format!(".{RECORD_EXT}"))
        .map(|id| (id, false))
}
