//! Persistence for the entanglement engine.
//!
//! The engine only needs named buckets of opaque key/value pairs. Backends
//! (LMDB, in-memory for testing) implement [`KvStore`]; everything above
//! works through [`EntangleCache`].

pub mod cache;
pub mod error;

pub use cache::{EntangleCache, ENTANGLE_STATE_BUCKET, ENTANGLE_TX_BUCKET};
pub use error::StoreError;

/// Bucketed key/value storage. Buckets spring into existence on first use.
pub trait KvStore: Send + Sync {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Write several pairs atomically.
    fn put_batch(&self, bucket: &str, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StoreError> {
        for (key, value) in pairs {
            self.put(bucket, key, value)?;
        }
        Ok(())
    }
}
