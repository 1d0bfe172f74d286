use entangle_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("state error: {0}")]
    State(#[from] entangle_ledger::StateError),

    #[error("verification error: {0}")]
    Verify(#[from] entangle_verification::VerifyError),

    #[error("coinbase error: {0}")]
    Coinbase(#[from] entangle_coinbase::CoinbaseError),

    #[error("codec error: {0}")]
    Codec(#[from] entangle_transactions::CodecError),

    #[error("store error: {0}")]
    Store(#[from] entangle_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] entangle_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("no snapshot stored for block {height} {hash}")]
    MissingSnapshot { height: u64, hash: String },

    #[error("coinbase snapshot carries {carried} {asset}, state holds {expected}")]
    SnapshotMismatch {
        asset: entangle_types::AssetType,
        carried: String,
        expected: String,
    },

    #[error("block {got} does not follow {expected}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("verification task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::State(e) => e.kind(),
            NodeError::Verify(e) => e.kind(),
            NodeError::Coinbase(e) => e.kind(),
            NodeError::Codec(e) => e.kind(),
            NodeError::Store(e) => e.kind(),
            NodeError::Config(_)
            | NodeError::Logging(_)
            | NodeError::SnapshotMismatch { .. }
            | NodeError::OutOfOrder { .. } => {
                ErrorKind::Validation
            }
            NodeError::Lmdb(_)
            | NodeError::MissingSnapshot { .. }
            | NodeError::Task(_)
            | NodeError::Io(_) => ErrorKind::FatalInvariant,
        }
    }
}
