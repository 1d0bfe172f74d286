use entangle_ledger::StateError;
use entangle_store::StoreError;
use entangle_transactions::{CodecError, PayloadKind};
use entangle_types::{AssetType, ErrorKind, ForeignTxHash, RpcError, ScriptClass, ScriptError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("transaction carries no {0:?} record")]
    NotSpecial(PayloadKind),

    #[error("{hash} ({asset}) was already entangled")]
    AlreadyEntangled { hash: ForeignTxHash, asset: AssetType },

    #[error("no endpoints configured for {0}")]
    NoEndpoints(AssetType),

    #[error("{asset} endpoints failed on {call}: {source}")]
    Rpc {
        asset: AssetType,
        call: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("foreign tx {hash} has {inputs} inputs and {outputs} outputs")]
    ForeignShape {
        hash: ForeignTxHash,
        inputs: usize,
        outputs: usize,
    },

    #[error("output index {index} out of range ({outputs} outputs)")]
    OutputIndex { index: u64, outputs: usize },

    #[error("input index {index} out of range ({inputs} inputs)")]
    InputIndex { index: u64, inputs: usize },

    #[error("foreign tx {hash} is not in the block at height {height}")]
    NotInBlock { hash: ForeignTxHash, height: u64 },

    #[error("claimed {claimed} but the output holds {actual}")]
    AmountMismatch { claimed: String, actual: u64 },

    #[error("deposit output has script class {0:?}")]
    WrongScriptClass(ScriptClass),

    #[error("{asset} deposit {hash} does not pay the expected custodian")]
    WrongPayee { asset: AssetType, hash: ForeignTxHash },

    #[error("no {0} pool is configured for beacon-less deposits")]
    NoPool(AssetType),

    #[error("height {height} has {confirmations} confirmations, need more than {maturity}")]
    Immature {
        height: u64,
        confirmations: u64,
        maturity: u64,
    },

    #[error("routing tag {0} outside the reserved range")]
    RoutingTagRange(u64),

    #[error("output 1 does not pay the routing tag")]
    RoutingPayment,

    #[error("output 1 holds {output} but the record stakes {record}")]
    StakeMismatch { record: String, output: u64 },

    #[error("beacon {beacon_id} did not sign the proof transaction")]
    NotBeaconSigner { beacon_id: u64 },

    #[error("transfer pays a whitelisted {asset} key of beacon {beacon_id}")]
    IllegalTransfer { beacon_id: u64, asset: AssetType },

    #[error("burn of {wanted} exceeds the entangled {origin}")]
    BurnExceedsOrigin { wanted: String, origin: String },

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("state: {0}")]
    State(#[from] StateError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    /// Evidence that contradicts a claim rejects it; evidence that is merely
    /// missing or young defers it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::NoEndpoints(_)
            | VerifyError::Rpc { .. }
            | VerifyError::Immature { .. } => ErrorKind::ExternalEvidence,
            VerifyError::AlreadyEntangled { .. } => ErrorKind::StateConflict,
            VerifyError::Codec(e) => e.kind(),
            VerifyError::State(e) => e.kind(),
            VerifyError::Store(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}
