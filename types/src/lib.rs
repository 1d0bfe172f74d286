//! Shared types for the cross-chain entanglement engine.
//!
//! Amounts, foreign asset types, addresses, hashes, the UTXO transaction
//! model, entanglement parameters, and the collaborator traits through which
//! the engine reaches the script layer and foreign chains.

pub mod address;
pub mod amount;
pub mod asset;
pub mod collab;
pub mod error;
pub mod hash;
pub mod params;
pub mod tx;

pub use address::{NativeAddress, RoutingTag};
pub use amount::{Amount, COIN};
pub use asset::{AssetFlags, AssetType};
pub use collab::{ForeignChainClient, ScriptClass, ScriptEngine};
pub use error::{ErrorKind, RpcError, ScriptError};
pub use hash::{ForeignTxHash, Hash256};
pub use params::{AssetParams, CurveParams, EntangleParams};
pub use tx::{ForeignBlock, ForeignTx, HostBlock, HostTx, OutPoint, TxIn, TxOut};
