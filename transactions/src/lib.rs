//! Payloads carried by special host-chain transactions.
//!
//! A special transaction marks one or more zero-value outputs with a payload
//! kind and embeds a record:
//! - **Entangle / Exchange**: fixed-layout claims on a foreign deposit
//! - **BeaconRegistration / BeaconPledge / CoinbaseBinding**: beacon lifecycle
//! - **Burn**: native asset sent to the zero address for redemption
//! - **BurnProof / WhiteListProof**: foreign evidence about a beacon
//! - **KeepedAmount**: the per-block curve snapshot in the coinbase
//!
//! Fixed-layout claims live in [`entangle`]; the structured records use the
//! named-field encoding in [`field`].

mod cursor;

pub mod entangle;
pub mod error;
pub mod extract;
pub mod field;
pub mod keeped;
pub mod payload;
pub mod records;

pub use entangle::{EntangleTxInfo, ExchangeTxInfo};
pub use error::CodecError;
pub use extract::{BurnRequest, Signed};
pub use field::Record;
pub use keeped::{KeepedAmount, KeepedItem};
pub use payload::PayloadKind;
pub use records::{
    BeaconPledge, BeaconRegistration, BurnProofInfo, BurnTxInfo, CoinbaseBinding, WhiteListProof,
    WhiteUnit,
};
