//! Local Store Adapter
//!
//! Reads and writes versioned [`Record`]s on top of a raw [`ByteStore`].
//! This is the only component that touches this node's storage; the
//! coordinator goes through it even when it is one of the replicas itself.

use super::codec::{self, CodecError};
use super::engine::{ByteStore, EngineError};
use super::record::{Record, RecordState, expiry_after};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error(transparent)]
    Corrupt(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] EngineError),
    #[error("records in UNKNOWN state are never persisted")]
    UnknownState,
}

/// Which stored records a sweep physically removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Records whose absolute TTL has passed.
    Expired,
    /// Records whose write timestamp is at least this old.
    OlderThan(Duration),
}

impl SweepPolicy {
    fn matches(&self, record: &Record, now: i64) -> bool {
        match self {
            SweepPolicy::Expired => record.is_expired(now),
            SweepPolicy::OlderThan(max_age) => {
                let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
                now.saturating_sub(record.timestamp) >= max_age_ms
            }
        }
    }
}

pub struct LocalStore {
    engine: Arc<dyn ByteStore>,
    tombstone_retention_ms: Option<u64>,
}

impl LocalStore {
    pub fn new(engine: Arc<dyn ByteStore>) -> Self {
        Self {
            engine,
            tombstone_retention_ms: None,
        }
    }

    /// Tombstones written from now on expire this long after their timestamp.
    /// `None` keeps them forever.
    pub fn with_tombstone_retention(mut self, retention_ms: Option<u64>) -> Self {
        self.tombstone_retention_ms = retention_ms;
        self
    }

    pub fn get(&self, key: &[u8]) -> Result<Record, StoreError> {
        let bytes = self.engine.get(key)?.ok_or(StoreError::NotFound)?;
        Ok(codec::decode(&bytes)?)
    }

    pub fn put(&self, key: &[u8], record: &Record) -> Result<(), StoreError> {
        if record.state == RecordState::Unknown {
            return Err(StoreError::UnknownState);
        }
        self.engine.put(key, codec::encode(record))?;
        Ok(())
    }

    /// Deletion is a tombstone write, never a physical removal, so replicas
    /// that still hold an older value lose to it during resolution.
    pub fn delete(&self, key: &[u8], timestamp: i64) -> Result<(), StoreError> {
        let ttl = expiry_after(timestamp, self.tombstone_retention_ms);
        self.put(key, &Record::tombstone(timestamp, ttl))
    }

    /// Physically removes `key`. Returns whether anything was there.
    pub fn remove(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.engine.remove_if(key, &|_: &[u8]| true)?)
    }

    /// Physically removes every record matching `policy` and returns how many
    /// were removed.
    ///
    /// Keys are evaluated one at a time; each check-and-remove is atomic for
    /// that key only. Undecodable entries are left in place.
    pub fn sweep_expired(&self, policy: SweepPolicy, now: i64) -> Result<usize, StoreError> {
        let keys = self.engine.keys()?;
        let mut removed = 0;

        for key in keys {
            let outcome = self.engine.remove_if(&key, &|bytes: &[u8]| match codec::decode(bytes) {
                Ok(record) => policy.matches(&record, now),
                Err(e) => {
                    tracing::warn!(
                        "Sweep skipping corrupt record {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    false
                }
            });

            match outcome {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        "Sweep failed to remove {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                }
            }
        }

        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.engine.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        Ok(self.engine.flush()?)
    }
}
