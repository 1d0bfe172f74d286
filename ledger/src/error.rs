use entangle_curve::CurveError;
use entangle_types::{AssetType, ErrorKind, NativeAddress};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    #[error("stake {stake} is below the minimum {min}")]
    LessThanMinimum { stake: String, min: String },

    #[error("address {0} is already registered")]
    RepeatRegister(NativeAddress),

    #[error("routing tag {0} is already registered")]
    RepeatToAddress(String),

    #[error("no beacon registered for {0}")]
    NoSuchBeacon(String),

    #[error("{user} has no position with beacon {beacon_id}")]
    NoSuchUserPosition { beacon_id: u64, user: NativeAddress },

    #[error("address {0} is a beacon or whitelisted key")]
    AddressInWhiteList(NativeAddress),

    #[error("beacon {beacon_id} does not accept {asset}")]
    AssetNotSupported { beacon_id: u64, asset: AssetType },

    #[error("beacon {beacon_id} lacks collateral for {wanted}")]
    InsufficientCollateral { beacon_id: u64, wanted: String },

    #[error("burn of {wanted} exceeds redeemable {available}")]
    ExceedsRedeemable { wanted: String, available: String },

    #[error("{user} holds no {asset} with beacon {beacon_id}")]
    NoAssetOfType {
        beacon_id: u64,
        user: NativeAddress,
        asset: AssetType,
    },

    #[error("{user} already has this burn pending with beacon {beacon_id} at height {height}")]
    DuplicateBurn {
        beacon_id: u64,
        user: NativeAddress,
        height: u64,
    },

    #[error("burn proof does not match any burn item")]
    BurnProofMismatch,

    #[error("whitelist proof at height {0} already recorded")]
    RepeatProof(u64),

    #[error("beacon would hold more than {0} whitelist entries")]
    TooManyWhiteList(usize),

    #[error("beacon would hold more than {0} coinbase addresses")]
    TooManyCoinbase(usize),

    #[error("beacon {beacon_id} stake was short by {short} when slashed")]
    StakingNotEnough { beacon_id: u64, short: String },

    #[error("routing tag does not match beacon {0}")]
    ToAddressMismatch(u64),

    #[error("curve: {0}")]
    Curve(#[from] CurveError),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("serialization: {0}")]
    Serialization(String),
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::InvalidParam(_)
            | StateError::LessThanMinimum { .. }
            | StateError::TooManyWhiteList(_)
            | StateError::TooManyCoinbase(_) => ErrorKind::Validation,
            StateError::Curve(e) => e.kind(),
            StateError::Overflow(_) | StateError::Serialization(_) => ErrorKind::FatalInvariant,
            _ => ErrorKind::StateConflict,
        }
    }
}
