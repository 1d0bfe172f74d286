use entangle_curve::CurveError;
use entangle_ledger::StateError;
use entangle_transactions::CodecError;
use entangle_types::{ErrorKind, ScriptError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoinbaseError {
    #[error("coinbase template: {0}")]
    Template(String),

    #[error("pool reserve {reserve} cannot cover {needed}")]
    NegativeReserve { reserve: String, needed: String },

    #[error("punished output {origin} cannot pay twice {amount}")]
    NegativeChange { origin: String, amount: String },

    #[error("{0} does not fit an output value")]
    ValueOverflow(&'static str),

    #[error(
        "entangle tx {index} (height {height}, fee {fee}) follows tx {prev_index} \
         (height {prev_height}, fee {prev_fee}) out of order"
    )]
    OutOfSequence {
        prev_index: usize,
        prev_height: u64,
        prev_fee: u64,
        index: usize,
        height: u64,
        fee: u64,
    },

    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("curve: {0}")]
    Curve(#[from] CurveError),

    #[error("state: {0}")]
    State(#[from] StateError),
}

impl CoinbaseError {
    /// A reserve or change that would go negative means the block was
    /// assembled from inconsistent state and must be abandoned.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoinbaseError::NegativeReserve { .. }
            | CoinbaseError::NegativeChange { .. }
            | CoinbaseError::ValueOverflow(_) => ErrorKind::FatalInvariant,
            CoinbaseError::Curve(e) => e.kind(),
            CoinbaseError::State(e) => e.kind(),
            CoinbaseError::Codec(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}
