//! Entangle dedupe records and per-block state snapshots on top of a
//! [`KvStore`].

use std::sync::Arc;

use entangle_types::{AssetType, ForeignTxHash, Hash256};

use crate::{KvStore, StoreError};

/// Foreign transactions already credited. Key: hash text bytes + asset tag.
pub const ENTANGLE_TX_BUCKET: &str = "entangle-tx";

/// Encoded state after each block. Key: height (i32 LE) + block hash.
pub const ENTANGLE_STATE_BUCKET: &str = "entanglestate";

const PRESENT: &[u8] = &[1];

#[derive(Clone)]
pub struct EntangleCache {
    store: Arc<dyn KvStore>,
}

impl EntangleCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn tx_key(hash: &ForeignTxHash, asset: AssetType) -> Vec<u8> {
        let mut key = Vec::with_capacity(hash.as_bytes().len() + 1);
        key.extend_from_slice(hash.as_bytes());
        key.push(asset.tag());
        key
    }

    /// Heights beyond `i32::MAX` are rejected rather than wrapped.
    pub fn state_key(height: u64, block: &Hash256) -> Result<Vec<u8>, StoreError> {
        let height = i32::try_from(height)
            .map_err(|_| StoreError::Backend(format!("height {height} exceeds i32")))?;
        let mut key = Vec::with_capacity(4 + 32);
        key.extend_from_slice(&height.to_le_bytes());
        key.extend_from_slice(block.as_bytes());
        Ok(key)
    }

    pub fn is_entangled(&self, hash: &ForeignTxHash, asset: AssetType) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(ENTANGLE_TX_BUCKET, &Self::tx_key(hash, asset))?
            .is_some())
    }

    pub fn mark_entangled(&self, txs: &[(ForeignTxHash, AssetType)]) -> Result<(), StoreError> {
        if txs.is_empty() {
            return Ok(());
        }
        let pairs: Vec<_> = txs
            .iter()
            .map(|(hash, asset)| (Self::tx_key(hash, *asset), PRESENT.to_vec()))
            .collect();
        self.store.put_batch(ENTANGLE_TX_BUCKET, &pairs)?;
        tracing::debug!(count = txs.len(), "recorded entangled foreign txs");
        Ok(())
    }

    pub fn save_state(&self, height: u64, block: &Hash256, encoded: &[u8]) -> Result<(), StoreError> {
        let key = Self::state_key(height, block)?;
        self.store.put(ENTANGLE_STATE_BUCKET, &key, encoded)?;
        tracing::debug!(height, %block, bytes = encoded.len(), "saved entangle state");
        Ok(())
    }

    /// `None` when no snapshot was saved for that block.
    pub fn load_state(&self, height: u64, block: &Hash256) -> Result<Option<Vec<u8>>, StoreError> {
        let key = Self::state_key(height, block)?;
        self.store.get(ENTANGLE_STATE_BUCKET, &key)
    }
}
