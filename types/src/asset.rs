//! Foreign asset types and the beacon asset flag set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A foreign chain whose coins can be entangled.
///
/// Variants are declared in wire-tag order so the derived `Ord` matches the
/// tag order used by canonical encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Doge,
    Ltc,
    Btc,
    Bsv,
    Bch,
}

impl AssetType {
    pub const ALL: [AssetType; 5] = [
        AssetType::Doge,
        AssetType::Ltc,
        AssetType::Btc,
        AssetType::Bsv,
        AssetType::Bch,
    ];

    /// One-byte tag used in transaction payloads.
    pub fn tag(self) -> u8 {
        match self {
            AssetType::Doge => 0xF0,
            AssetType::Ltc => 0xF1,
            AssetType::Btc => 0xF2,
            AssetType::Bsv => 0xF3,
            AssetType::Bch => 0xF4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xF0 => Some(AssetType::Doge),
            0xF1 => Some(AssetType::Ltc),
            0xF2 => Some(AssetType::Btc),
            0xF3 => Some(AssetType::Bsv),
            0xF4 => Some(AssetType::Bch),
            _ => None,
        }
    }

    /// The bit this asset occupies in a beacon's [`AssetFlags`].
    pub fn flag(self) -> u32 {
        match self {
            AssetType::Btc => AssetFlags::BTC,
            AssetType::Bch => AssetFlags::BCH,
            AssetType::Bsv => AssetFlags::BSV,
            AssetType::Ltc => AssetFlags::LTC,
            AssetType::Doge => AssetFlags::DOGE,
        }
    }

    /// Width in bytes of the foreign transaction hash field for this tag.
    ///
    /// The hash travels as its 64-character hex text on every chain.
    pub fn hash_width(self) -> usize {
        match self {
            AssetType::Doge
            | AssetType::Ltc
            | AssetType::Btc
            | AssetType::Bsv
            | AssetType::Bch => 64,
        }
    }

    pub fn ticker(self) -> &'static str {
        match self {
            AssetType::Doge => "DOGE",
            AssetType::Ltc => "LTC",
            AssetType::Btc => "BTC",
            AssetType::Bsv => "BSV",
            AssetType::Bch => "BCH",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

/// Bit set of assets a beacon accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetFlags(u32);

impl AssetFlags {
    pub const BTC: u32 = 1 << 0;
    pub const BCH: u32 = 1 << 1;
    pub const BSV: u32 = 1 << 2;
    pub const LTC: u32 = 1 << 3;
    pub const USDT: u32 = 1 << 4;
    pub const DOGE: u32 = 1 << 5;

    const KNOWN: u32 = Self::BTC | Self::BCH | Self::BSV | Self::LTC | Self::USDT | Self::DOGE;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// At least one known asset bit is set.
    pub fn is_valid(&self) -> bool {
        self.0 & Self::KNOWN != 0
    }

    pub fn contains(&self, asset: AssetType) -> bool {
        self.0 & asset.flag() != 0
    }

    /// Entangle-capable assets enabled by this flag set, in tag order.
    pub fn assets(&self) -> impl Iterator<Item = AssetType> + '_ {
        AssetType::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl From<AssetType> for AssetFlags {
    fn from(asset: AssetType) -> Self {
        Self(asset.flag())
    }
}
