//! Collaborator interfaces the engine consumes but does not implement:
//! the host script layer and foreign-chain RPC access.

use serde::{Deserialize, Serialize};

use crate::address::NativeAddress;
use crate::error::{RpcError, ScriptError};
use crate::hash::ForeignTxHash;
use crate::tx::{ForeignBlock, ForeignTx, TxIn};

/// Standard script templates the engine distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptClass {
    PubKeyHash,
    ScriptHash,
    PubKey,
    MultiSig,
    NullData,
    NonStandard,
}

impl ScriptClass {
    /// Deposit outputs must use one of these.
    pub fn is_deposit_class(self) -> bool {
        matches!(self, ScriptClass::PubKeyHash | ScriptClass::ScriptHash)
    }
}

/// Opaque access to the script interpreter and address codec.
pub trait ScriptEngine: Send + Sync {
    /// Split a marker script into its payload kind byte and payload bytes.
    /// `None` when the script carries no payload.
    fn extract_payload(&self, script: &[u8]) -> Option<(u8, Vec<u8>)>;

    /// Build the marker script carrying `data` of the given kind.
    fn payload_script(&self, kind: u8, data: &[u8]) -> Result<Vec<u8>, ScriptError>;

    /// Locking script paying a native address.
    fn pay_to_address(&self, address: &NativeAddress) -> Result<Vec<u8>, ScriptError>;

    /// Locking script paying a raw 20-byte pubkey hash.
    fn pay_to_pubkey_hash(&self, hash: &[u8]) -> Result<Vec<u8>, ScriptError>;

    /// Public key that signed an input (legacy script or witness).
    fn signer_pubkey(&self, input: &TxIn) -> Result<Vec<u8>, ScriptError>;

    /// Native address controlled by a public key.
    fn address_from_pubkey(&self, pubkey: &[u8]) -> Result<NativeAddress, ScriptError>;

    fn classify(&self, script: &[u8]) -> ScriptClass;
}

/// Read access to one foreign chain node.
pub trait ForeignChainClient: Send + Sync {
    fn get_transaction(&self, hash: &ForeignTxHash) -> Result<ForeignTx, RpcError>;

    fn get_block_hash(&self, height: u64) -> Result<String, RpcError>;

    fn get_block(&self, hash: &str) -> Result<ForeignBlock, RpcError>;

    fn get_best_height(&self) -> Result<u64, RpcError>;
}
