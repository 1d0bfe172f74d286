//! Nullable foreign chain: a scripted node for one foreign asset.

use entangle_types::{ForeignBlock, ForeignChainClient, ForeignTx, ForeignTxHash, RpcError};
use std::collections::HashMap;
use std::sync::Mutex;

/// A foreign chain node whose blocks and transactions are set up by the test.
/// Thread-safe so that it can be called from `spawn_blocking`.
pub struct NullForeignChain {
    txs: Mutex<HashMap<ForeignTxHash, ForeignTx>>,
    blocks: Mutex<HashMap<u64, ForeignBlock>>,
    best_height: Mutex<u64>,
    unreachable: Mutex<bool>,
    calls: Mutex<u64>,
}

impl NullForeignChain {
    pub fn new() -> Self {
        Self {
            txs: Mutex::new(HashMap::new()),
            blocks: Mutex::new(HashMap::new()),
            best_height: Mutex::new(0),
            unreachable: Mutex::new(false),
            calls: Mutex::new(0),
        }
    }

    pub fn block_hash_at(height: u64) -> String {
        format!("{height:064x}")
    }

    /// Put a transaction into the block at `height`, creating the block if
    /// needed. The best height is raised to at least `height`.
    pub fn include(&self, tx: ForeignTx, height: u64) {
        let txid = tx.hash.clone();
        self.txs.lock().unwrap().insert(txid.clone(), tx);
        self.blocks
            .lock()
            .unwrap()
            .entry(height)
            .or_insert_with(|| ForeignBlock {
                hash: Self::block_hash_at(height),
                txids: Vec::new(),
            })
            .txids
            .push(txid);
        let mut best = self.best_height.lock().unwrap();
        *best = (*best).max(height);
    }

    /// Known to the node but not listed in any block.
    pub fn add_loose_tx(&self, tx: ForeignTx) {
        self.txs.lock().unwrap().insert(tx.hash.clone(), tx);
    }

    pub fn set_best_height(&self, height: u64) {
        *self.best_height.lock().unwrap() = height;
    }

    /// Make every call fail as if the endpoint were down.
    pub fn set_unreachable(&self, down: bool) {
        *self.unreachable.lock().unwrap() = down;
    }

    /// Number of RPC calls served or refused (for assertions).
    pub fn calls(&self) -> u64 {
        *self.calls.lock().unwrap()
    }

    fn enter(&self) -> Result<(), RpcError> {
        *self.calls.lock().unwrap() += 1;
        if *self.unreachable.lock().unwrap() {
            return Err(RpcError::Unreachable("null foreign chain is down".into()));
        }
        Ok(())
    }
}

impl Default for NullForeignChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignChainClient for NullForeignChain {
    fn get_transaction(&self, hash: &ForeignTxHash) -> Result<ForeignTx, RpcError> {
        self.enter()?;
        self.txs
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("tx {hash}")))
    }

    fn get_block_hash(&self, height: u64) -> Result<String, RpcError> {
        self.enter()?;
        self.blocks
            .lock()
            .unwrap()
            .get(&height)
            .map(|b| b.hash.clone())
            .ok_or_else(|| RpcError::NotFound(format!("block at {height}")))
    }

    fn get_block(&self, hash: &str) -> Result<ForeignBlock, RpcError> {
        self.enter()?;
        self.blocks
            .lock()
            .unwrap()
            .values()
            .find(|b| b.hash == hash)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("block {hash}")))
    }

    fn get_best_height(&self) -> Result<u64, RpcError> {
        self.enter()?;
        Ok(*self.best_height.lock().unwrap())
    }
}
