//! Native address and beacon routing tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A native-chain address in its encoded string form.
///
/// Beacons and users are keyed by this string; ordering is lexicographic
/// on the raw bytes, which canonical encodings rely on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NativeAddress(String);

impl NativeAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NativeAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NativeAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The pubkey-hash a beacon's staking output pays, doubling as the
/// deposit-routing identifier.
///
/// Read as a big-endian integer its value must fall in
/// [`RoutingTag::MIN_VALUE`]`..=`[`RoutingTag::MAX_VALUE`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoutingTag(Vec<u8>);

impl RoutingTag {
    pub const MIN_VALUE: u64 = 10;
    pub const MAX_VALUE: u64 = 99;
    /// Width of a pubkey-hash.
    pub const WIDTH: usize = 20;

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// A full-width tag whose numeric value is `value`.
    pub fn from_value(value: u64) -> Self {
        let mut bytes = vec![0u8; Self::WIDTH];
        bytes[Self::WIDTH - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Big-endian numeric value, `None` when it does not fit in 64 bits.
    pub fn numeric_value(&self) -> Option<u64> {
        let first = self.0.iter().position(|b| *b != 0).unwrap_or(self.0.len());
        let significant = &self.0[first..];
        if significant.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[8 - significant.len()..].copy_from_slice(significant);
        Some(u64::from_be_bytes(buf))
    }

    pub fn in_reserved_range(&self) -> bool {
        matches!(
            self.numeric_value(),
            Some(v) if (Self::MIN_VALUE..=Self::MAX_VALUE).contains(&v)
        )
    }
}

impl fmt::Debug for RoutingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutingTag({})", hex::encode(&self.0))
    }
}

impl fmt::Display for RoutingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.numeric_value() {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(&hex::encode(&self.0)),
        }
    }
}
