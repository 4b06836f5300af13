//! CRC32-framed byte blocks
//!
//! Frame layout: `[data_len: u32 LE][data][crc32: u32 LE]`

use crate::error::{PersistenceError, Result};

pub fn compute(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

pub fn encode_framed(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(4 + data.len() + 4);
    encoded.extend_from_slice(&(data.len() as u32).to_le_bytes());
    encoded.extend_from_slice(data);
    encoded.extend_from_slice(&compute(data).to_le_bytes());
    encoded
}

/// Decode a frame produced by [`encode_framed`], verifying length and checksum
pub fn decode_framed(encoded: &[u8]) -> Result<&[u8]> {
    if encoded.len() < 8 {
        return Err(PersistenceError::Corruption("frame too short".to_string()));
    }

    let data_len = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
    if encoded.len() != 4 + data_len + 4 {
        return Err(PersistenceError::Corruption(format!(
            "expected {} frame bytes, got {}",
            4 + data_len + 4,
            encoded.len()
        )));
    }

    let data = &encoded[4..4 + data_len];
    let tail = &encoded[4 + data_len..];
    let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let actual = compute(data);
    if actual != expected {
        return Err(PersistenceError::Corruption(format!(
            "checksum mismatch: expected {:#010x}, got {:#010x} (data_len={})",
            expected, actual, data_len
        )));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let data = b"cam_proc_inst rows";
        let encoded = encode_framed(data);
        assert_eq!(decode_framed(&encoded).unwrap(), data);
    }

    #[test]
    fn test_corrupted_payload() {
        let mut encoded = encode_framed(b"cam_proc_inst rows");
        encoded[6] ^= 0xFF;
        let err = decode_framed(&encoded).unwrap_err();
        assert!(matches!(err, PersistenceError::Corruption(_)));
    }

    #[test]
    fn test_invalid_length() {
        assert!(decode_framed(b"abc").is_err());

        let mut invalid = vec![0u8; 20];
        invalid[0] = 100;
        assert!(decode_framed(&invalid).is_err());
    }
}
