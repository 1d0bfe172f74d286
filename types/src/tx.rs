//! Minimal UTXO transaction model shared by the host chain and foreign chains.
//!
//! Only the fields the entanglement engine reads are modelled; scripts stay
//! opaque byte strings interpreted through [`crate::ScriptEngine`].

use serde::{Deserialize, Serialize};

use crate::hash::{ForeignTxHash, Hash256};

/// Reference to a previous transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash256, index: u32) -> Self {
        Self { hash, index }
    }

    /// The null outpoint spent by a coinbase input.
    pub fn null() -> Self {
        Self {
            hash: Hash256::ZERO,
            index: u32::MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub signature_script: Vec<u8>,
    /// Segregated witness stack; empty for legacy inputs.
    #[serde(default)]
    pub witness: Vec<Vec<u8>>,
    pub sequence: u32,
}

impl TxIn {
    pub const MAX_SEQUENCE: u32 = u32::MAX;

    pub fn new(previous_output: OutPoint, signature_script: Vec<u8>) -> Self {
        Self {
            previous_output,
            signature_script,
            witness: Vec::new(),
            sequence: Self::MAX_SEQUENCE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: u64, script: Vec<u8>) -> Self {
        Self { value, script }
    }
}

/// A host-chain transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTx {
    pub hash: Hash256,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl HostTx {
    pub fn add_input(&mut self, input: TxIn) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TxOut) {
        self.outputs.push(output);
    }
}

/// A host-chain block as handed to the entanglement pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBlock {
    pub height: u64,
    pub hash: Hash256,
    pub txs: Vec<HostTx>,
}

/// A transaction fetched from a foreign chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignTx {
    pub hash: ForeignTxHash,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

/// A foreign block reduced to the ids of the transactions it contains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignBlock {
    pub hash: String,
    pub txids: Vec<ForeignTxHash>,
}

impl ForeignBlock {
    pub fn contains(&self, txid: &ForeignTxHash) -> bool {
        self.txids.iter().any(|t| t == txid)
    }
}
