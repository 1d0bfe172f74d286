//! Wiring of storage, verification and the block pipeline.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use entangle_ledger::EntangleState;
use entangle_store::{EntangleCache, KvStore};
use entangle_store_lmdb::{check_integrity, LmdbKvStore};
use entangle_types::{AssetType, ForeignChainClient, Hash256, HostBlock, ScriptEngine};
use entangle_verification::{ClientPool, ForeignClients, Verifier};

use crate::config::NodeConfig;
use crate::processor::{BlockProcessor, BlockReport};
use crate::shutdown::{ShutdownController, StopMode};
use crate::NodeError;

/// Foreign endpoints per asset, in failover order.
pub type Endpoints = Vec<(AssetType, Vec<Arc<dyn ForeignChainClient>>)>;

pub struct EntangleNode {
    config: NodeConfig,
    processor: Arc<BlockProcessor>,
    shutdown: ShutdownController,
}

impl EntangleNode {
    /// Open the LMDB store under `config.data_dir`, starting from an empty
    /// state.
    pub fn open(
        config: NodeConfig,
        endpoints: Endpoints,
        script: Arc<dyn ScriptEngine>,
    ) -> Result<Self, NodeError> {
        let store = open_lmdb(&config.data_dir, config.map_size)?;
        Ok(Self::with_store(config, store, endpoints, script))
    }

    /// Start from an empty state over any store.
    pub fn with_store(
        config: NodeConfig,
        store: Arc<dyn KvStore>,
        endpoints: Endpoints,
        script: Arc<dyn ScriptEngine>,
    ) -> Self {
        let cache = EntangleCache::new(store);
        let verifier = build_verifier(&config, endpoints, cache.clone(), Arc::clone(&script));
        let state = EntangleState::new(config.params.clone());
        let processor = BlockProcessor::new(state, verifier, cache, script);
        Self::assemble(config, processor)
    }

    /// Resume from the snapshot stored for block `(height, hash)`.
    pub fn resume(
        config: NodeConfig,
        store: Arc<dyn KvStore>,
        endpoints: Endpoints,
        script: Arc<dyn ScriptEngine>,
        height: u64,
        hash: Hash256,
    ) -> Result<Self, NodeError> {
        let cache = EntangleCache::new(store);
        let verifier = build_verifier(&config, endpoints, cache.clone(), Arc::clone(&script));
        let processor = BlockProcessor::restore(height, hash, verifier, cache, script)?;
        Ok(Self::assemble(config, processor))
    }

    fn assemble(config: NodeConfig, processor: BlockProcessor) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            shutdown: ShutdownController::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// A bounded queue sized by the configuration, for feeding [`run`](Self::run).
    pub fn block_channel(&self) -> (mpsc::Sender<HostBlock>, mpsc::Receiver<HostBlock>) {
        mpsc::channel(self.config.queue_capacity.max(1))
    }

    /// Process blocks until the sender is dropped or a stop is requested,
    /// and return the tip the loop stopped at. A rejected block is logged
    /// and skipped; a fatal error stops the loop.
    pub async fn run(
        &self,
        mut blocks: mpsc::Receiver<HostBlock>,
        reports: Option<mpsc::Sender<BlockReport>>,
    ) -> Result<Option<(u64, Hash256)>, NodeError> {
        let mut stop = self.shutdown.subscribe();
        let mut draining = false;
        loop {
            match *stop.borrow_and_update() {
                Some(StopMode::Now) => break,
                Some(StopMode::Drain) if !draining => {
                    info!("queue closed, draining");
                    blocks.close();
                    draining = true;
                }
                _ => {}
            }
            let block = tokio::select! {
                biased;
                Ok(()) = stop.changed() => continue,
                block = blocks.recv() => match block {
                    Some(block) => block,
                    None => break,
                },
            };
            let height = block.height;
            match self.processor.process_block(block).await {
                Ok(report) => {
                    if let Some(tx) = &reports {
                        if tx.send(report).await.is_err() {
                            warn!("report receiver dropped");
                        }
                    }
                }
                Err(e) if e.kind().is_fatal() => {
                    error!(height, error = %e, "fatal error, stopping block loop");
                    return Err(e);
                }
                Err(e) => warn!(height, error = %e, kind = %e.kind(), "block rejected"),
            }
        }
        let tip = self.processor.tip().await;
        match tip {
            Some((height, hash)) => info!(height, %hash, "block loop stopped"),
            None => info!("block loop stopped before any block"),
        }
        Ok(tip)
    }
}

fn open_lmdb(path: &Path, map_size: usize) -> Result<Arc<dyn KvStore>, NodeError> {
    let store = LmdbKvStore::open(path, map_size)?;
    let report = check_integrity(store.environment().env())?;
    if !report.is_healthy() {
        for e in &report.errors {
            error!(error = %e, "integrity check");
        }
        return Err(entangle_store::StoreError::Corruption(report.errors.join("; ")).into());
    }
    info!(
        databases = report.databases_checked,
        entries = report.total_entries,
        "store integrity ok"
    );
    Ok(Arc::new(store))
}

fn build_verifier(
    config: &NodeConfig,
    endpoints: Endpoints,
    cache: EntangleCache,
    script: Arc<dyn ScriptEngine>,
) -> Arc<Verifier> {
    let mut clients = ForeignClients::new();
    for (asset, eps) in endpoints {
        clients.insert(ClientPool::new(asset, eps, config.retry));
    }
    Arc::new(Verifier::new(clients, script, Some(cache), config.params.clone()))
}
