//! Snapshot file format for [`MemoryStore`](super::MemoryStore)
//!
//! ```text
//! [magic: 8 bytes "WRSNAP01"][flags: u8][framed payload]
//! ```
//! The payload is the bincode-encoded [`SnapshotData`], snappy-compressed when
//! `FLAG_COMPRESSED` is set, wrapped in a CRC32 frame.

use super::checksum;
use super::memory::MemTable;
use crate::error::{PersistenceError, Result};
use crate::types::TypeDef;
use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 8] = b"WRSNAP01";
const FLAG_COMPRESSED: u8 = 0x01;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotData {
    pub(crate) types: Vec<TypeDef>,
    pub(crate) tables: Vec<MemTable>,
    pub(crate) last_timestamp: i64,
}

pub(crate) fn encode(data: &SnapshotData, compress: bool) -> Result<Vec<u8>> {
    let mut payload = bincode::serialize(data)?;
    let mut flags = 0u8;
    if compress {
        payload = snap::raw::Encoder::new().compress_vec(&payload)?;
        flags |= FLAG_COMPRESSED;
    }

    let framed = checksum::encode_framed(&payload);
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + framed.len());
    out.extend_from_slice(MAGIC);
    out.push(flags);
    out.extend_from_slice(&framed);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<SnapshotData> {
    if bytes.len() < MAGIC.len() + 1 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(PersistenceError::Corruption(
            "not a store snapshot (bad magic)".to_string(),
        ));
    }
    let flags = bytes[MAGIC.len()];
    if flags & !FLAG_COMPRESSED != 0 {
        return Err(PersistenceError::Corruption(format!(
            "unknown snapshot flags {:#04x}",
            flags
        )));
    }

    let payload = checksum::decode_framed(&bytes[MAGIC.len() + 1..])?;
    let data = if flags & FLAG_COMPRESSED != 0 {
        let raw = snap::raw::Decoder::new().decompress_vec(payload)?;
        bincode::deserialize(&raw)?
    } else {
        bincode::deserialize(payload)?
    };
    Ok(data)
}
