//! Per-block snapshot of cumulative foreign volume, written into a coinbase
//! output so the curve position can be recomputed from chain data alone.
//!
//! Layout: `count(1)` then `count × (tag(1) | len(1) | amount BE)`.

use entangle_types::{Amount, AssetType};
use serde::{Deserialize, Serialize};

use crate::cursor::{put_amount, Cursor};
use crate::error::CodecError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepedItem {
    pub asset: AssetType,
    pub amount: Amount,
}

/// Ordered list with at most one entry per asset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepedAmount {
    items: Vec<KeepedItem>,
}

impl KeepedAmount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[KeepedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Accumulate onto the existing entry for the asset, or append one.
    pub fn add(&mut self, asset: AssetType, amount: Amount) -> Result<(), CodecError> {
        match self.items.iter_mut().find(|item| item.asset == asset) {
            Some(item) => {
                item.amount = item.amount.checked_add(amount).ok_or(CodecError::InvalidValue {
                    field: "amount",
                    reason: format!("{asset} total overflows"),
                })?;
            }
            None => self.items.push(KeepedItem { asset, amount }),
        }
        Ok(())
    }

    pub fn get(&self, asset: AssetType) -> Option<Amount> {
        self.items
            .iter()
            .find(|item| item.asset == asset)
            .map(|item| item.amount)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.items.len() * 18);
        out.push(self.items.len() as u8);
        for item in &self.items {
            out.push(item.asset.tag());
            put_amount(&mut out, item.amount);
        }
        out
    }

    /// An empty buffer is the empty snapshot.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        let mut cur = Cursor::new(data);
        let count = cur.u8("count")?;
        let mut keeped = Self::default();
        for _ in 0..count {
            let tag = cur.u8("asset tag")?;
            let asset = AssetType::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
            let amount = cur.amount("amount")?;
            if keeped.get(asset).is_some() {
                return Err(CodecError::DuplicateAsset(tag));
            }
            keeped.items.push(KeepedItem { asset, amount });
        }
        cur.finish()?;
        Ok(keeped)
    }
}
