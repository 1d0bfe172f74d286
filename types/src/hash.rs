//! Hash types for host-chain objects and foreign transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte host-chain hash (transaction or block).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A foreign transaction id as the hex text the foreign node reports.
///
/// Stored and compared as text so that lookups through the foreign RPC use
/// exactly the bytes carried in the payload.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ForeignTxHash(String);

impl ForeignTxHash {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Hex text of a raw 32-byte hash.
    pub fn from_raw(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ForeignTxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "ForeignTxHash({shown})")
    }
}

impl fmt::Display for ForeignTxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_hash_from_raw_is_64_hex_chars() {
        let h = ForeignTxHash::from_raw(&[0xab; 32]);
        assert_eq!(h.as_bytes().len(), 64);
        assert!(h.as_str().starts_with("abab"));
    }

    #[test]
    fn hash256_display_is_full_hex() {
        let h = Hash256::new([1u8; 32]);
        assert_eq!(h.to_string().len(), 64);
        assert!(!h.is_zero());
        assert!(Hash256::ZERO.is_zero());
    }
}
