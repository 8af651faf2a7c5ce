//! Record Codec
//!
//! Fixed binary layout shared by the on-disk format and replica exchange:
//!
//! ```text
//! +----------------+----------------+-------------+-----------------+
//! | timestamp i64  | ttl i64        | state i32   | payload ...     |
//! | 8 bytes, BE    | 8 bytes, BE    | 4 bytes, BE | remaining bytes |
//! +----------------+----------------+-------------+-----------------+
//! ```

use super::record::{Record, RecordState};
use thiserror::Error;

/// Size of the fixed header preceding the payload.
pub const HEADER_LEN: usize = 20;

/// Decoding failures. Either kind means the stored bytes are a corrupt record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("corrupt record: {len} bytes is shorter than the {HEADER_LEN}-byte header")]
    Truncated { len: usize },
    #[error("corrupt record: unknown state ordinal {0}")]
    UnknownState(i32),
}

pub fn encode(record: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + record.payload.len());
    out.extend_from_slice(&record.timestamp.to_be_bytes());
    out.extend_from_slice(&record.ttl.to_be_bytes());
    out.extend_from_slice(&record.state.ordinal().to_be_bytes());
    out.extend_from_slice(&record.payload);
    out
}

pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: bytes.len() });
    }

    let mut long = [0u8; 8];
    long.copy_from_slice(&bytes[0..8]);
    let timestamp = i64::from_be_bytes(long);
    long.copy_from_slice(&bytes[8..16]);
    let ttl = i64::from_be_bytes(long);

    let mut int = [0u8; 4];
    int.copy_from_slice(&bytes[16..20]);
    let ordinal = i32::from_be_bytes(int);
    let state = RecordState::from_ordinal(ordinal).ok_or(CodecError::UnknownState(ordinal))?;

    Ok(Record {
        payload: bytes[HEADER_LEN..].to_vec(),
        timestamp,
        state,
        ttl,
    })
}
