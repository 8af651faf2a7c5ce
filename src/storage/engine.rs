//! Byte Store Engines
//!
//! The raw `key -> bytes` layer underneath the record adapter. Engines know
//! nothing about records, timestamps or TTLs; they only have to be safe for
//! concurrent use from many request handlers plus the expiry sweeper.

use dashmap::DashMap;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Failure inside the underlying engine (disk, journal, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage engine failure: {0}")]
pub struct EngineError(pub String);

impl From<fjall::Error> for EngineError {
    fn from(e: fjall::Error) -> Self {
        EngineError(e.to_string())
    }
}

pub trait ByteStore: Send + Sync + 'static {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError>;

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), EngineError>;

    /// Removes `key` only if `predicate` holds for its current value.
    ///
    /// The check and the removal are atomic with respect to `put` on the same
    /// key. Returns whether an entry was removed.
    fn remove_if(
        &self,
        key: &[u8],
        predicate: &dyn Fn(&[u8]) -> bool,
    ) -> Result<bool, EngineError>;

    /// Snapshot of the keys currently stored.
    fn keys(&self) -> Result<Vec<Vec<u8>>, EngineError>;

    fn len(&self) -> Result<usize, EngineError>;

    fn flush(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

// ============================================================
// IN-MEMORY ENGINE
// ============================================================

/// Sharded in-memory engine. Distinct keys live in independent shards and do
/// not contend.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), EngineError> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn remove_if(
        &self,
        key: &[u8],
        predicate: &dyn Fn(&[u8]) -> bool,
    ) -> Result<bool, EngineError> {
        Ok(self
            .entries
            .remove_if(key, |_, value| predicate(value))
            .is_some())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>, EngineError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn len(&self) -> Result<usize, EngineError> {
        Ok(self.entries.len())
    }
}

// ============================================================
// PERSISTENT ENGINE
// ============================================================

const LOCK_STRIPES: usize = 64;

/// Embedded on-disk engine backed by a single fjall partition.
///
/// fjall has no compare-and-delete, so writers take one of a fixed set of
/// striped locks chosen by key hash. Reads are lock-free.
pub struct FjallStore {
    keyspace: Keyspace,
    records: PartitionHandle,
    stripes: Vec<Mutex<()>>,
}

impl FjallStore {
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let keyspace = fjall::Config::new(path).open()?;
        let records = keyspace.open_partition("records", PartitionCreateOptions::default())?;
        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();

        tracing::info!("Opened fjall store at {}", path.display());

        Ok(Self {
            keyspace,
            records,
            stripes,
        })
    }

    fn lock_key(&self, key: &[u8]) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[idx]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ByteStore for FjallStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.records.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), EngineError> {
        let _guard = self.lock_key(key);
        self.records.insert(key, value)?;
        Ok(())
    }

    fn remove_if(
        &self,
        key: &[u8],
        predicate: &dyn Fn(&[u8]) -> bool,
    ) -> Result<bool, EngineError> {
        let _guard = self.lock_key(key);
        match self.records.get(key)? {
            Some(value) if predicate(&value) => {
                self.records.remove(key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>, EngineError> {
        let mut keys = Vec::new();
        for item in self.records.iter() {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    fn len(&self) -> Result<usize, EngineError> {
        Ok(self.records.len()?)
    }

    fn flush(&self) -> Result<(), EngineError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
