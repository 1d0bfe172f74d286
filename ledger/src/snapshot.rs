//! Canonical state encoding.
//!
//! The encoding is bincode over the state's ordered collections, so two
//! states holding the same data encode identically regardless of the order
//! operations inserted it. The snapshot hash is Blake2b-256 of that
//! encoding.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use entangle_types::EntangleParams;

use crate::error::StateError;
use crate::state::EntangleState;

impl EntangleState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        bincode::serialize(self).map_err(|e| StateError::Serialization(e.to_string()))
    }

    /// Decode a snapshot and rebuild the address index.
    pub fn from_bytes(bytes: &[u8], params: EntangleParams) -> Result<Self, StateError> {
        let mut state: EntangleState =
            bincode::deserialize(bytes).map_err(|e| StateError::Serialization(e.to_string()))?;
        state.params = params;
        state.rebuild_index();
        Ok(state)
    }

    pub fn snapshot_hash(&self) -> Result<[u8; 32], StateError> {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.to_bytes()?);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Ok(out)
    }
}
