use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker carried by a zero-value output, telling which record follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PayloadKind {
    Entangle = 0x01,
    Exchange = 0x02,
    BeaconRegistration = 0x03,
    BeaconPledge = 0x04,
    CoinbaseBinding = 0x05,
    Burn = 0x06,
    BurnProof = 0x07,
    WhiteListProof = 0x08,
    KeepedAmount = 0x09,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 9] = [
        PayloadKind::Entangle,
        PayloadKind::Exchange,
        PayloadKind::BeaconRegistration,
        PayloadKind::BeaconPledge,
        PayloadKind::CoinbaseBinding,
        PayloadKind::Burn,
        PayloadKind::BurnProof,
        PayloadKind::WhiteListProof,
        PayloadKind::KeepedAmount,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.byte() == byte)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadKind::Entangle => "entangle",
            PayloadKind::Exchange => "exchange",
            PayloadKind::BeaconRegistration => "beacon-registration",
            PayloadKind::BeaconPledge => "beacon-pledge",
            PayloadKind::CoinbaseBinding => "coinbase-binding",
            PayloadKind::Burn => "burn",
            PayloadKind::BurnProof => "burn-proof",
            PayloadKind::WhiteListProof => "whitelist-proof",
            PayloadKind::KeepedAmount => "keeped-amount",
        };
        f.write_str(s)
    }
}
