//! Coinbase merge builder.
//!
//! Each block's coinbase moves the two pool reserves forward, pays the
//! native side of verified deposits, splits slashed UTXOs between the
//! prover and the zero address, merges beacon stake UTXOs and records the
//! cumulative curve position for the next block.

pub mod error;
pub mod merge;
pub mod reserve;
pub mod sequence;

pub use error::CoinbaseError;
pub use merge::{
    make_merge_coinbase_tx, pay_exchange_items, BeaconMergeItem, ExchangeItem, PoolInputs,
    PunishedReward,
};
pub use reserve::{
    enough_amount, keep_entangle_amount, keep_infos_from_state, keeped_from_output,
    over_entangle_amount,
};
pub use sequence::{fetch_outpoints_from_txs, verify_txs_sequence, EtsInfo};
