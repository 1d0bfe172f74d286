//! Nullable store: thread-safe in-memory buckets for testing.

use entangle_store::{KvStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// An in-memory bucketed key/value store.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullKvStore {
    buckets: Mutex<HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
    fail_writes: Mutex<bool>,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make every following write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Number of keys in a bucket (for assertions).
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Backend("null store: writes disabled".into()));
        }
        Ok(())
    }
}

impl Default for NullKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for NullKvStore {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_owned())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_batch(&self, bucket: &str, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut buckets = self.buckets.lock().unwrap();
        let target = buckets.entry(bucket.to_owned()).or_default();
        for (key, value) in pairs {
            target.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
