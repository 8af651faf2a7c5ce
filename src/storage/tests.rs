//! Storage Module Tests
//!
//! Validates the record layout and the local storage mechanics.
//!
//! ## Test Scopes
//! - **Codec**: byte layout, boundary values and corrupt input.
//! - **LocalStore**: get/put, tombstone deletes and expiry sweeps.
//! - **Engines**: the in-memory and fjall engines honour the same contract.

#[cfg(test)]
mod tests {
    use crate::storage::codec::{self, CodecError, HEADER_LEN};
    use crate::storage::engine::{ByteStore, FjallStore, MemoryStore};
    use crate::storage::local::{LocalStore, StoreError, SweepPolicy};
    use crate::storage::record::{NO_EXPIRY, Record, RecordState, expiry_after};
    use crate::storage::sweeper::ExpirySweeper;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory_store() -> (Arc<MemoryStore>, LocalStore) {
        let engine = Arc::new(MemoryStore::new());
        let store = LocalStore::new(engine.clone());
        (engine, store)
    }

    // ============================================================
    // CODEC TESTS
    // ============================================================

    #[test]
    fn test_codec_layout_is_big_endian() {
        let record = Record::present(b"abc".to_vec(), 1, 2);
        let bytes = codec::encode(&record);

        assert_eq!(bytes.len(), HEADER_LEN + 3);
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
        assert_eq!(&bytes[20..], b"abc");
    }

    #[test]
    fn test_codec_roundtrip_boundary_values() {
        let records = vec![
            Record::present(Vec::new(), 0, 0),
            Record::present(b"v".to_vec(), -1, -1),
            Record::present(vec![0xff; 64], i64::MAX, NO_EXPIRY),
            Record::tombstone(i64::MIN, i64::MAX),
            Record::unknown(),
        ];

        for record in records {
            let decoded = codec::decode(&codec::encode(&record)).unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn test_codec_rejects_short_input() {
        let err = codec::decode(&[0u8; HEADER_LEN - 1]).unwrap_err();
        assert_eq!(err, CodecError::Truncated { len: HEADER_LEN - 1 });

        assert!(codec::decode(&[]).is_err());
    }

    #[test]
    fn test_codec_rejects_unknown_state() {
        let mut bytes = codec::encode(&Record::present(Vec::new(), 5, 5));
        bytes[16..20].copy_from_slice(&7i32.to_be_bytes());

        assert_eq!(
            codec::decode(&bytes).unwrap_err(),
            CodecError::UnknownState(7)
        );
    }

    #[test]
    fn test_state_ordinals_are_stable() {
        assert_eq!(RecordState::Present.ordinal(), 0);
        assert_eq!(RecordState::Deleted.ordinal(), 1);
        assert_eq!(RecordState::Unknown.ordinal(), 2);
        assert_eq!(RecordState::from_ordinal(1), Some(RecordState::Deleted));
        assert_eq!(RecordState::from_ordinal(-1), None);
    }

    #[test]
    fn test_expiry_after() {
        assert_eq!(expiry_after(1_000, Some(500)), 1_500);
        assert_eq!(expiry_after(1_000, None), NO_EXPIRY);
        assert_eq!(expiry_after(i64::MAX - 1, Some(10)), i64::MAX);
    }

    // ============================================================
    // LOCAL STORE TESTS
    // ============================================================

    #[test]
    fn test_get_missing_key_is_not_found() {
        let (_, store) = memory_store();
        assert_eq!(store.get(b"missing").unwrap_err(), StoreError::NotFound);
    }

    #[test]
    fn test_put_then_get() {
        let (_, store) = memory_store();
        let record = Record::present(b"v1".to_vec(), 100, NO_EXPIRY);

        store.put(b"k1", &record).unwrap();
        assert_eq!(store.get(b"k1").unwrap(), record);

        let newer = Record::present(b"v2".to_vec(), 200, NO_EXPIRY);
        store.put(b"k1", &newer).unwrap();
        assert_eq!(store.get(b"k1").unwrap().payload, b"v2");
    }

    #[test]
    fn test_delete_writes_tombstone() {
        let (engine, store) = memory_store();
        store
            .put(b"k1", &Record::present(b"v1".to_vec(), 100, NO_EXPIRY))
            .unwrap();

        store.delete(b"k1", 150).unwrap();

        let record = store.get(b"k1").unwrap();
        assert_eq!(record.state, RecordState::Deleted);
        assert_eq!(record.timestamp, 150);
        assert!(record.payload.is_empty());
        assert_eq!(record.ttl, NO_EXPIRY);
        assert_eq!(engine.len().unwrap(), 1, "tombstone must stay in storage");
    }

    #[test]
    fn test_delete_with_tombstone_retention() {
        let store = LocalStore::new(Arc::new(MemoryStore::new())).with_tombstone_retention(Some(1_000));

        store.delete(b"k1", 5_000).unwrap();
        assert_eq!(store.get(b"k1").unwrap().ttl, 6_000);
    }

    #[test]
    fn test_unknown_is_never_persisted() {
        let (engine, store) = memory_store();

        assert_eq!(
            store.put(b"k1", &Record::unknown()).unwrap_err(),
            StoreError::UnknownState
        );
        assert_eq!(engine.len().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_bytes_surface_as_corrupt() {
        let (engine, store) = memory_store();
        engine.put(b"bad", vec![1, 2, 3]).unwrap();

        assert!(matches!(store.get(b"bad"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_remove_is_physical() {
        let (_, store) = memory_store();
        store
            .put(b"k1", &Record::present(b"v".to_vec(), 1, NO_EXPIRY))
            .unwrap();

        assert!(store.remove(b"k1").unwrap());
        assert!(!store.remove(b"k1").unwrap());
        assert_eq!(store.get(b"k1").unwrap_err(), StoreError::NotFound);
    }

    // ============================================================
    // SWEEP TESTS
    // ============================================================

    #[test]
    fn test_sweep_expired_removes_only_expired() {
        let (_, store) = memory_store();
        let now = 10_000;

        store.put(b"expired", &Record::present(b"a".to_vec(), 1, now - 1)).unwrap();
        store.put(b"edge", &Record::present(b"b".to_vec(), 1, now)).unwrap();
        store.put(b"live", &Record::present(b"c".to_vec(), 1, now + 1)).unwrap();
        store.put(b"forever", &Record::present(b"d".to_vec(), 1, NO_EXPIRY)).unwrap();
        store.delete(b"gone", 1).unwrap();

        let removed = store.sweep_expired(SweepPolicy::Expired, now).unwrap();

        assert_eq!(removed, 2);
        assert!(store.get(b"expired").is_err());
        assert!(store.get(b"edge").is_err());
        assert!(store.get(b"live").is_ok());
        assert!(store.get(b"forever").is_ok());
        assert_eq!(
            store.get(b"gone").unwrap().state,
            RecordState::Deleted,
            "tombstones without retention survive sweeps"
        );
    }

    #[test]
    fn test_sweep_removes_tombstone_after_retention() {
        let store = LocalStore::new(Arc::new(MemoryStore::new())).with_tombstone_retention(Some(100));
        store.delete(b"k1", 1_000).unwrap();

        assert_eq!(store.sweep_expired(SweepPolicy::Expired, 1_050).unwrap(), 0);
        assert_eq!(store.sweep_expired(SweepPolicy::Expired, 1_100).unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_sweep_older_than() {
        let (_, store) = memory_store();

        store.put(b"old", &Record::present(b"a".to_vec(), 1_000, NO_EXPIRY)).unwrap();
        store.put(b"new", &Record::present(b"b".to_vec(), 9_500, NO_EXPIRY)).unwrap();

        let removed = store
            .sweep_expired(SweepPolicy::OlderThan(Duration::from_secs(1)), 10_000)
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.get(b"old").is_err());
        assert!(store.get(b"new").is_ok());
    }

    #[test]
    fn test_sweep_older_than_drops_tombstones() {
        let (_, store) = memory_store();
        store.delete(b"gone", 1_000).unwrap();

        let policy = SweepPolicy::OlderThan(Duration::from_secs(1));
        assert_eq!(store.sweep_expired(SweepPolicy::Expired, 10_000).unwrap(), 0);
        assert_eq!(store.sweep_expired(policy, 10_000).unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_sweep_skips_corrupt_entries() {
        let (engine, store) = memory_store();
        engine.put(b"bad", vec![0; 3]).unwrap();
        store.put(b"expired", &Record::present(Vec::new(), 1, 1)).unwrap();

        let removed = store.sweep_expired(SweepPolicy::Expired, 100).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(engine.get(b"bad").unwrap(), Some(vec![0; 3]));
    }

    #[tokio::test]
    async fn test_sweeper_sweep_once() {
        let (_, store) = memory_store();
        let store = Arc::new(store);
        store.put(b"expired", &Record::present(Vec::new(), 1, 1)).unwrap();
        store.put(b"live", &Record::present(Vec::new(), 1, NO_EXPIRY)).unwrap();

        let sweeper = ExpirySweeper::new(store.clone(), SweepPolicy::Expired, Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once().await, 1);
        assert_eq!(sweeper.sweep_once().await, 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    // ============================================================
    // ENGINE TESTS
    // ============================================================

    fn check_engine_contract(engine: &dyn ByteStore) {
        assert_eq!(engine.get(b"k").unwrap(), None);

        engine.put(b"k", b"one".to_vec()).unwrap();
        engine.put(b"k", b"two".to_vec()).unwrap();
        engine.put(b"other", b"x".to_vec()).unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(engine.len().unwrap(), 2);

        let mut keys = engine.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec![b"k".to_vec(), b"other".to_vec()]);

        assert!(!engine.remove_if(b"k", &|v: &[u8]| v == b"one").unwrap());
        assert!(engine.remove_if(b"k", &|v: &[u8]| v == b"two").unwrap());
        assert!(!engine.remove_if(b"missing", &|_: &[u8]| true).unwrap());
        assert_eq!(engine.get(b"k").unwrap(), None);
        assert_eq!(engine.len().unwrap(), 1);

        engine.flush().unwrap();
    }

    #[test]
    fn test_memory_engine_contract() {
        check_engine_contract(&MemoryStore::new());
    }

    #[test]
    fn test_fjall_engine_contract() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FjallStore::open(dir.path()).unwrap();
        check_engine_contract(&engine);
    }

    #[test]
    fn test_local_store_over_fjall() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(Arc::new(FjallStore::open(dir.path()).unwrap()));

        store.put(b"k1", &Record::present(b"v1".to_vec(), 10, NO_EXPIRY)).unwrap();
        store.delete(b"k1", 20).unwrap();

        let record = store.get(b"k1").unwrap();
        assert_eq!(record.state, RecordState::Deleted);
        assert_eq!(record.timestamp, 20);
    }
}
