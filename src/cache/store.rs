//! Bounded, content-addressable blob store with FIFO eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use bytes::Bytes;

use crate::observability::metrics;

/// A stored blob. Immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobEntry {
    /// Advisory filename, may be empty.
    pub filename: String,
    /// MIME type the blob was stored under.
    pub mime_type: String,
    /// The payload itself.
    pub bytes: Bytes,
}

impl BlobEntry {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Default)]
struct StoreInner {
    /// Sum of all entry byte-lengths. Always equals the map contents.
    size: u64,
    entries: HashMap<String, BlobEntry>,
    /// Hashes in insertion order, oldest first.
    order: VecDeque<String>,
}

/// A thread-safe byte-budgeted map of content hash → blob.
///
/// Inserting past the budget evicts the oldest entries until the store fits
/// again. The entry being inserted is never evicted by its own insert, so a
/// single blob larger than the whole budget is kept (alone) rather than
/// rejected.
pub struct BlobStore {
    inner: Mutex<StoreInner>,
    capacity: u64,
}

impl BlobStore {
    /// Create a store with a fixed byte budget.
    ///
    /// Panics if `capacity` is zero. That is a configuration error and is
    /// caught by config validation before the store is built; reaching it
    /// here aborts startup.
    pub fn new(capacity: u64) -> Self {
        assert!(capacity > 0, "blob store capacity must be larger than 0");
        Self {
            inner: Mutex::new(StoreInner::default()),
            capacity,
        }
    }

    /// Insert or replace the blob at `key`. Returns whether the key was new.
    ///
    /// Replacing an existing key keeps its position in the eviction order.
    pub fn put(&self, key: &str, filename: &str, mime_type: &str, bytes: Bytes) -> bool {
        let mut inner = self.inner.lock().expect("blob store lock poisoned");

        let replaced_size = inner.entries.get(key).map(|e| e.size());
        let was_new = replaced_size.is_none();
        if let Some(old) = replaced_size {
            inner.size -= old;
        } else {
            inner.order.push_back(key.to_string());
        }

        inner.size += bytes.len() as u64;
        inner.entries.insert(
            key.to_string(),
            BlobEntry {
                filename: filename.to_string(),
                mime_type: mime_type.to_string(),
                bytes,
            },
        );

        // Evict oldest-first until we fit, but never the key just inserted:
        // an oversized blob stays resident on its own.
        while inner.size > self.capacity {
            let oldest = match inner.order.front() {
                Some(oldest) if oldest != key => oldest.clone(),
                _ => break,
            };
            inner.order.pop_front();
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.size -= evicted.size();
                tracing::debug!(key = %oldest, freed = evicted.size(), "Evicted blob");
            }
        }

        metrics::record_cache_size(inner.size);
        was_new
    }

    /// Look up a blob by its content hash.
    pub fn get(&self, key: &str) -> Option<BlobEntry> {
        let inner = self.inner.lock().expect("blob store lock poisoned");
        inner.entries.get(key).cloned()
    }

    /// Current sum of stored entry sizes, in bytes.
    pub fn size(&self) -> u64 {
        self.inner.lock().expect("blob store lock poisoned").size
    }

    /// Stored hashes, oldest first.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("blob store lock poisoned");
        inner.order.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &BlobStore, key: &str, bytes: &[u8]) -> bool {
        store.put(key, "foo.txt", "", Bytes::copy_from_slice(bytes))
    }

    #[test]
    fn fifo_eviction_ledger() {
        let store = BlobStore::new(10);

        put(&store, "a", &[1, 1, 1]);
        assert_eq!(store.size(), 3);
        assert_eq!(store.keys(), vec!["a"]);
        assert_eq!(
            store.get("a"),
            Some(BlobEntry {
                filename: "foo.txt".into(),
                mime_type: "".into(),
                bytes: Bytes::from_static(&[1, 1, 1]),
            })
        );

        put(&store, "b", &[2, 2, 2]);
        assert_eq!(store.size(), 6);
        assert_eq!(store.keys().len(), 2);

        // Replacing a key shrinks the ledger but keeps the order.
        put(&store, "b", &[3, 3]);
        assert_eq!(store.size(), 5);
        assert_eq!(store.keys(), vec!["a", "b"]);

        // Going over budget evicts the oldest entry only.
        put(&store, "c", &[4, 4, 4, 4, 4, 4]);
        assert_eq!(store.size(), 8);
        assert_eq!(store.keys(), vec!["b", "c"]);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn put_reports_new_keys() {
        let store = BlobStore::new(100);
        assert!(put(&store, "k", &[1]));
        assert!(!put(&store, "k", &[2]));
        assert!(put(&store, "other", &[3]));
    }

    #[test]
    fn oversized_entry_survives_alone() {
        let store = BlobStore::new(4);
        put(&store, "a", &[1, 1]);
        put(&store, "b", &[2, 2]);

        // Larger than the whole budget: everything else goes, the new
        // entry itself is kept.
        put(&store, "big", &[9; 10]);
        assert_eq!(store.keys(), vec!["big"]);
        assert_eq!(store.size(), 10);
        assert!(store.get("big").is_some());
    }

    #[test]
    fn size_stays_bounded_by_budget_or_newest_entry() {
        let store = BlobStore::new(8);
        for i in 0..64u8 {
            let size = (i % 5) as usize + 1;
            put(&store, &format!("k{i}"), &vec![i; size]);
            assert!(store.size() <= 8.max(size as u64));
        }
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        BlobStore::new(0);
    }
}
