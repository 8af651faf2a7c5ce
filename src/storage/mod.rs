//! Versioned Storage Module
//!
//! Everything a single node needs to keep records on its own disk.
//!
//! ## Core Concepts
//! - **Record**: payload + write timestamp + state (present / tombstone) + absolute TTL.
//! - **Codec**: the fixed 20-byte-header binary layout used on disk and between nodes.
//! - **Engine**: the raw `key -> bytes` store (`MemoryStore` or the on-disk `FjallStore`).
//! - **Local Store**: the record-level adapter. Deletes are tombstone writes; only
//!   expiry sweeps physically remove entries.
//! - **Sweeper**: the background task that runs expiry sweeps on a fixed interval.

pub mod codec;
pub mod engine;
pub mod local;
pub mod record;
pub mod sweeper;

#[cfg(test)]
mod tests;
