//! Fixed-layout deposit claims.
//!
//! ```text
//! entangle: tag(1) | index u32 LE | height u64 LE |                  len(1) | amount BE | hash
//! exchange: tag(1) | index u32 LE | height u64 LE | beacon u64 LE  | len(1) | amount BE | hash
//! ```
//!
//! The hash field width is fixed by the asset tag.

use entangle_types::{Amount, AssetType, ForeignTxHash};
use serde::{Deserialize, Serialize};

use crate::cursor::{put_amount, Cursor};
use crate::error::CodecError;

/// Payloads this short cannot hold a header and any hash.
pub const ENTANGLE_MIN_LEN: usize = 14;
pub const EXCHANGE_MIN_LEN: usize = 22;

/// Claim that a foreign transaction output deposited `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangleTxInfo {
    pub asset: AssetType,
    /// Output index inside the foreign transaction.
    pub index: u32,
    /// Foreign block height holding the transaction.
    pub height: u64,
    pub amount: Amount,
    pub ext_tx_hash: ForeignTxHash,
}

impl EntangleTxInfo {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTANGLE_MIN_LEN + self.ext_tx_hash.as_bytes().len() + 16);
        out.push(self.asset.tag());
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        put_amount(&mut out, self.amount);
        out.extend_from_slice(self.ext_tx_hash.as_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() <= ENTANGLE_MIN_LEN {
            return Err(CodecError::TooShort {
                len: data.len(),
                min: ENTANGLE_MIN_LEN,
            });
        }
        let mut cur = Cursor::new(data);
        let asset = read_tag(&mut cur)?;
        let index = cur.u32_le("index")?;
        let height = cur.u64_le("height")?;
        let amount = cur.amount("amount")?;
        let ext_tx_hash = read_hash(&mut cur, asset)?;
        cur.finish()?;
        Ok(Self {
            asset,
            index,
            height,
            amount,
            ext_tx_hash,
        })
    }
}

/// Deposit claim routed to a specific beacon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTxInfo {
    pub asset: AssetType,
    pub index: u32,
    pub height: u64,
    pub beacon_id: u64,
    pub amount: Amount,
    pub ext_tx_hash: ForeignTxHash,
}

impl ExchangeTxInfo {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EXCHANGE_MIN_LEN + self.ext_tx_hash.as_bytes().len() + 16);
        out.push(self.asset.tag());
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.beacon_id.to_le_bytes());
        put_amount(&mut out, self.amount);
        out.extend_from_slice(self.ext_tx_hash.as_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() <= EXCHANGE_MIN_LEN {
            return Err(CodecError::TooShort {
                len: data.len(),
                min: EXCHANGE_MIN_LEN,
            });
        }
        let mut cur = Cursor::new(data);
        let asset = read_tag(&mut cur)?;
        let index = cur.u32_le("index")?;
        let height = cur.u64_le("height")?;
        let beacon_id = cur.u64_le("beacon id")?;
        let amount = cur.amount("amount")?;
        let ext_tx_hash = read_hash(&mut cur, asset)?;
        cur.finish()?;
        Ok(Self {
            asset,
            index,
            height,
            beacon_id,
            amount,
            ext_tx_hash,
        })
    }

    /// The beacon-less view used by the legacy entangle path.
    pub fn as_entangle(&self) -> EntangleTxInfo {
        EntangleTxInfo {
            asset: self.asset,
            index: self.index,
            height: self.height,
            amount: self.amount,
            ext_tx_hash: self.ext_tx_hash.clone(),
        }
    }
}

fn read_tag(cur: &mut Cursor<'_>) -> Result<AssetType, CodecError> {
    let tag = cur.u8("asset tag")?;
    AssetType::from_tag(tag).ok_or(CodecError::UnknownTag(tag))
}

fn read_hash(cur: &mut Cursor<'_>, asset: AssetType) -> Result<ForeignTxHash, CodecError> {
    let raw = cur.take(asset.hash_width(), "foreign tx hash")?;
    let text = std::str::from_utf8(raw).map_err(|e| CodecError::InvalidValue {
        field: "ext_tx_hash",
        reason: e.to_string(),
    })?;
    Ok(ForeignTxHash::new(text))
}
