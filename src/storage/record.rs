use std::time::{SystemTime, UNIX_EPOCH};

/// TTL value meaning "this record never expires".
pub const NO_EXPIRY: i64 = i64::MAX;

/// Lifecycle state of a record as seen by one replica.
///
/// The ordinal (`Present = 0`, `Deleted = 1`, `Unknown = 2`) is what gets
/// written to disk and sent over the wire, so the order must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    /// A live value.
    Present,
    /// A tombstone: a delete was applied on this replica.
    Deleted,
    /// The replica has no entry for the key. Only exists during quorum
    /// resolution and is never persisted.
    Unknown,
}

impl RecordState {
    pub fn ordinal(self) -> i32 {
        match self {
            RecordState::Present => 0,
            RecordState::Deleted => 1,
            RecordState::Unknown => 2,
        }
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(RecordState::Present),
            1 => Some(RecordState::Deleted),
            2 => Some(RecordState::Unknown),
            _ => None,
        }
    }
}

/// The unit of storage and of replica-to-replica exchange.
///
/// `timestamp` is the sole tie-breaker between replicas (latest write wins).
/// `ttl` is an absolute expiry in milliseconds since the epoch, or
/// [`NO_EXPIRY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub payload: Vec<u8>,
    pub timestamp: i64,
    pub state: RecordState,
    pub ttl: i64,
}

impl Record {
    pub fn present(payload: Vec<u8>, timestamp: i64, ttl: i64) -> Self {
        Self {
            payload,
            timestamp,
            state: RecordState::Present,
            ttl,
        }
    }

    pub fn tombstone(timestamp: i64, ttl: i64) -> Self {
        Self {
            payload: Vec::new(),
            timestamp,
            state: RecordState::Deleted,
            ttl,
        }
    }

    /// Placeholder for "this replica answered, but has nothing for the key".
    ///
    /// Carries the smallest possible timestamp so any real record beats it.
    pub fn unknown() -> Self {
        Self {
            payload: Vec::new(),
            timestamp: i64::MIN,
            state: RecordState::Unknown,
            ttl: NO_EXPIRY,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.ttl <= now
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Turns an optional relative lifetime into an absolute expiry.
pub fn expiry_after(now: i64, lifetime_ms: Option<u64>) -> i64 {
    match lifetime_ms {
        Some(ms) => now.saturating_add(i64::try_from(ms).unwrap_or(i64::MAX)),
        None => NO_EXPIRY,
    }
}
