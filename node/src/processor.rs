//! Per-block pipeline over the entangle state.
//!
//! A block goes through four stages:
//! 1. every special transaction is verified against a read snapshot, on a
//!    blocking thread since foreign evidence comes over RPC;
//! 2. accepted transactions are applied in block order to a working copy,
//!    each to its own clone that is kept only when the whole transaction
//!    applies;
//! 3. the end-of-block sweep runs on the working copy;
//! 4. the working copy is published, snapshotted by `(height, hash)`, and
//!    the credited foreign transactions are recorded for dedupe.
//!
//! A fatal error at any stage abandons the block and leaves the published
//! state as it was.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, info_span, warn, Instrument};

use entangle_coinbase::{fetch_outpoints_from_txs, keep_infos_from_state, keeped_from_output, ExchangeItem};
use entangle_ledger::{BlockSweep, BurnProofItem, EntangleState, NewBeacon, StateError};
use entangle_store::EntangleCache;
use entangle_transactions::{
    extract, BeaconPledge, BurnProofInfo, BurnRequest, CoinbaseBinding, KeepedAmount, PayloadKind,
    Signed, WhiteListProof,
};
use entangle_types::{
    AssetType, ErrorKind, ForeignTxHash, Hash256, HostBlock, HostTx, NativeAddress, ScriptEngine,
};
use entangle_verification::{
    VerifiedBurnProof, VerifiedEntangle, VerifiedExchange, VerifyError, Verifier,
};

use crate::NodeError;

/// A special transaction that passed verification.
#[derive(Clone, Debug)]
pub enum Accepted {
    Exchange(VerifiedExchange),
    Entangle(Vec<VerifiedEntangle>),
    Registration(NewBeacon),
    Pledge {
        beacon_id: u64,
        pledge: Signed<BeaconPledge>,
    },
    Binding {
        beacon_id: u64,
        binding: Signed<CoinbaseBinding>,
    },
    Burn(BurnRequest),
    BurnProof {
        info: BurnProofInfo,
        proof: VerifiedBurnProof,
    },
    WhiteListProof(WhiteListProof),
}

impl Accepted {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Accepted::Exchange(_) => PayloadKind::Exchange,
            Accepted::Entangle(_) => PayloadKind::Entangle,
            Accepted::Registration(_) => PayloadKind::BeaconRegistration,
            Accepted::Pledge { .. } => PayloadKind::BeaconPledge,
            Accepted::Binding { .. } => PayloadKind::CoinbaseBinding,
            Accepted::Burn(_) => PayloadKind::Burn,
            Accepted::BurnProof { .. } => PayloadKind::BurnProof,
            Accepted::WhiteListProof(_) => PayloadKind::WhiteListProof,
        }
    }
}

/// A transaction left out of the block's state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected {
    /// Position in the block.
    pub index: usize,
    pub kind: ErrorKind,
    pub reason: String,
}

/// What processing one block did.
#[derive(Clone, Debug, Default)]
pub struct BlockReport {
    pub height: u64,
    pub hash: Hash256,
    pub applied: usize,
    pub rejected: Vec<Rejected>,
    /// Beacon deposits credited this block, at their native value.
    pub exchanges: Vec<ExchangeItem>,
    /// Beacon-less deposits, at their foreign value, still to be priced
    /// by the coinbase that pays them.
    pub legacy: Vec<ExchangeItem>,
    pub sweep: BlockSweep,
    /// Cumulative deposits after the block, for the next coinbase.
    pub keep: KeepedAmount,
    pub snapshot_hash: [u8; 32],
}

/// Side effects of one applied transaction, merged into the report only
/// when the transaction commits.
#[derive(Default)]
struct Applied {
    exchanges: Vec<ExchangeItem>,
    legacy: Vec<ExchangeItem>,
    entangled: Vec<(ForeignTxHash, AssetType)>,
}

pub struct BlockProcessor {
    state: Arc<RwLock<EntangleState>>,
    verifier: Arc<Verifier>,
    cache: EntangleCache,
    script: Arc<dyn ScriptEngine>,
    /// Last processed block.
    tip: Mutex<Option<(u64, Hash256)>>,
}

impl BlockProcessor {
    pub fn new(
        state: EntangleState,
        verifier: Arc<Verifier>,
        cache: EntangleCache,
        script: Arc<dyn ScriptEngine>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            verifier,
            cache,
            script,
            tip: Mutex::new(None),
        }
    }

    /// Resume from the snapshot stored for `(height, hash)`.
    pub fn restore(
        height: u64,
        hash: Hash256,
        verifier: Arc<Verifier>,
        cache: EntangleCache,
        script: Arc<dyn ScriptEngine>,
    ) -> Result<Self, NodeError> {
        let bytes = cache
            .load_state(height, &hash)?
            .ok_or_else(|| NodeError::MissingSnapshot {
                height,
                hash: hash.to_string(),
            })?;
        let state = EntangleState::from_bytes(&bytes, verifier.params().clone())?;
        info!(height, %hash, "entangle state restored");
        let mut processor = Self::new(state, verifier, cache, script);
        *processor.tip.get_mut() = Some((height, hash));
        Ok(processor)
    }

    pub fn state(&self) -> Arc<RwLock<EntangleState>> {
        Arc::clone(&self.state)
    }

    pub async fn tip(&self) -> Option<(u64, Hash256)> {
        *self.tip.lock().await
    }

    // ── Block pipeline ──────────────────────────────────────────────────

    pub async fn process_block(&self, block: HostBlock) -> Result<BlockReport, NodeError> {
        let span = info_span!("entangle_block", height = block.height, hash = %block.hash);
        self.process_inner(block).instrument(span).await
    }

    async fn process_inner(&self, block: HostBlock) -> Result<BlockReport, NodeError> {
        let mut tip = self.tip.lock().await;
        if let Some((prev, _)) = *tip {
            if block.height != prev + 1 {
                return Err(NodeError::OutOfOrder {
                    expected: prev + 1,
                    got: block.height,
                });
            }
        }

        let snapshot = self.state.read().await.clone();
        self.check_coinbase_snapshot(&block, &snapshot)?;

        let verifier = Arc::clone(&self.verifier);
        let txs = block.txs.clone();
        let height = block.height;
        let verdicts = tokio::task::spawn_blocking(move || verify_block(&verifier, &snapshot, &txs, height))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;

        let mut report = BlockReport {
            height: block.height,
            hash: block.hash,
            ..BlockReport::default()
        };

        let mut state = self.state.write().await;
        let mut working = state.clone();
        let mut seen: BTreeSet<(ForeignTxHash, AssetType)> = BTreeSet::new();
        let mut committed: Vec<HostTx> = Vec::new();

        for (index, verdict) in verdicts.into_iter().enumerate() {
            let accepted = match verdict {
                Ok(None) => continue,
                Ok(Some(accepted)) => accepted,
                Err(e) if e.kind().is_fatal() => return Err(e.into()),
                Err(e) => {
                    reject(&mut report, index, e.kind(), e.to_string());
                    continue;
                }
            };

            let mut next = working.clone();
            match apply(&mut next, &accepted, block.height, &seen) {
                Ok(applied) => {
                    working = next;
                    seen.extend(applied.entangled.iter().cloned());
                    report.exchanges.extend(applied.exchanges);
                    report.legacy.extend(applied.legacy);
                    report.applied += 1;
                    if matches!(accepted, Accepted::Registration(_) | Accepted::Pledge { .. }) {
                        committed.push(block.txs[index].clone());
                    }
                    debug!(index, kind = %accepted.kind(), "special tx applied");
                }
                Err(e) if e.kind().is_fatal() => return Err(e),
                Err(e) => reject(&mut report, index, e.kind(), e.to_string()),
            }
        }

        let stakes = fetch_outpoints_from_txs(&committed, &working, self.script.as_ref());
        for (beacon_id, outpoints) in stakes {
            let mut items = working
                .ex_info(beacon_id)
                .map(|info| info.merge_items.clone())
                .unwrap_or_default();
            items.extend(outpoints);
            working.set_merge_items(beacon_id, items)?;
        }

        report.sweep = working.end_block(block.height)?;
        if !report.sweep.short_beacons.is_empty() {
            warn!(beacons = ?report.sweep.short_beacons, "stake short of punishment");
        }
        report.keep = keep_infos_from_state(&working, &AssetType::ALL)?;

        let bytes = working.to_bytes()?;
        report.snapshot_hash = working.snapshot_hash()?;
        self.cache.save_state(block.height, &block.hash, &bytes)?;
        self.cache.mark_entangled(&seen.into_iter().collect::<Vec<_>>())?;

        *state = working;
        *tip = Some((block.height, block.hash));
        info!(
            applied = report.applied,
            rejected = report.rejected.len(),
            exchanges = report.exchanges.len(),
            punished = report.sweep.timeouts.len(),
            snapshot = %hex::encode(report.snapshot_hash),
            "block processed"
        );
        Ok(report)
    }

    /// The snapshot a coinbase carries must match the cumulative deposits
    /// before the block.
    fn check_coinbase_snapshot(&self, block: &HostBlock, state: &EntangleState) -> Result<(), NodeError> {
        let Some(out) = block.txs.first().and_then(|cb| cb.outputs.get(3)) else {
            return Ok(());
        };
        let carried = keeped_from_output(out, self.script.as_ref())?;
        for item in carried.items() {
            let expected = state.all_en_assets(item.asset);
            if item.amount != expected {
                return Err(NodeError::SnapshotMismatch {
                    asset: item.asset,
                    carried: item.amount.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn reject(report: &mut BlockReport, index: usize, kind: ErrorKind, reason: String) {
    if kind.is_retryable() {
        warn!(index, %kind, %reason, "special tx deferred");
    } else {
        debug!(index, %kind, %reason, "special tx rejected");
    }
    report.rejected.push(Rejected { index, kind, reason });
}

// ── Verification ────────────────────────────────────────────────────────

fn verify_block(
    verifier: &Verifier,
    state: &EntangleState,
    txs: &[HostTx],
    height: u64,
) -> Vec<Result<Option<Accepted>, VerifyError>> {
    txs.iter().map(|tx| verify_tx(verifier, state, tx, height)).collect()
}

/// Classify and verify one transaction. Ordinary transactions give `None`.
pub fn verify_tx(
    verifier: &Verifier,
    state: &EntangleState,
    tx: &HostTx,
    height: u64,
) -> Result<Option<Accepted>, VerifyError> {
    let script = verifier.script();
    let Some(kind) = extract::special_kind(tx, script) else {
        return Ok(None);
    };
    let accepted = match kind {
        PayloadKind::Exchange => Accepted::Exchange(verifier.verify_exchange_tx(tx, state)?),
        PayloadKind::Entangle => Accepted::Entangle(verifier.verify_entangle_tx(tx)?),
        PayloadKind::BeaconRegistration => {
            let reg = verifier.verify_beacon_registration(tx, state)?;
            Accepted::Registration(verifier.new_beacon(&reg)?)
        }
        PayloadKind::BeaconPledge => {
            let (beacon_id, pledge) = verifier.verify_pledge(tx, state)?;
            Accepted::Pledge { beacon_id, pledge }
        }
        PayloadKind::CoinbaseBinding => {
            let (beacon_id, binding) = verifier.verify_coinbase_binding(tx, state)?;
            Accepted::Binding { beacon_id, binding }
        }
        PayloadKind::Burn => {
            let req = extract::burn_request(tx, script)?.ok_or(VerifyError::NotSpecial(kind))?;
            verifier.verify_burn(&req, state)?;
            Accepted::Burn(req)
        }
        PayloadKind::BurnProof => {
            let info = extract::burn_proof(tx, script)?.ok_or(VerifyError::NotSpecial(kind))?;
            let proof = verifier.verify_burn_proof(&info, state, height)?;
            Accepted::BurnProof { info, proof }
        }
        PayloadKind::WhiteListProof => {
            let proof = extract::whitelist_proof(tx, script)?.ok_or(VerifyError::NotSpecial(kind))?;
            verifier.verify_whitelist_proof(&proof, state)?;
            Accepted::WhiteListProof(proof)
        }
        PayloadKind::KeepedAmount => return Ok(None),
    };
    Ok(Some(accepted))
}

// ── Application ─────────────────────────────────────────────────────────

fn claim(
    seen: &BTreeSet<(ForeignTxHash, AssetType)>,
    applied: &mut Applied,
    hash: &ForeignTxHash,
    asset: AssetType,
) -> Result<(), NodeError> {
    let key = (hash.clone(), asset);
    if seen.contains(&key) || applied.entangled.contains(&key) {
        return Err(VerifyError::AlreadyEntangled {
            hash: hash.clone(),
            asset,
        }
        .into());
    }
    applied.entangled.push(key);
    Ok(())
}

fn beacon_address(state: &EntangleState, beacon_id: u64) -> Result<NativeAddress, StateError> {
    state
        .beacon(beacon_id)
        .map(|b| b.address.clone())
        .ok_or_else(|| StateError::NoSuchBeacon(beacon_id.to_string()))
}

/// Apply one accepted transaction to `state`. On error `state` may be
/// partly written and must be discarded.
fn apply(
    state: &mut EntangleState,
    accepted: &Accepted,
    height: u64,
    seen: &BTreeSet<(ForeignTxHash, AssetType)>,
) -> Result<Applied, NodeError> {
    let mut applied = Applied::default();
    match accepted {
        Accepted::Exchange(ex) => {
            claim(seen, &mut applied, &ex.ext_tx_hash, ex.asset)?;
            let native = state.add_entangle_item(&ex.address, ex.asset, ex.beacon_id, height, ex.amount)?;
            applied.exchanges.push(ExchangeItem {
                asset: ex.asset,
                beacon_id: ex.beacon_id,
                value: native,
                address: ex.address.clone(),
            });
        }
        Accepted::Entangle(claims) => {
            for c in claims {
                claim(seen, &mut applied, &c.ext_tx_hash, c.asset)?;
                applied.legacy.push(ExchangeItem {
                    asset: c.asset,
                    beacon_id: 0,
                    value: c.amount,
                    address: c.address.clone(),
                });
            }
        }
        Accepted::Registration(req) => {
            let id = state.register_beacon(req.clone())?;
            info!(beacon_id = id, address = %req.address, stake = %req.staking_amount, "beacon registered");
        }
        Accepted::Pledge { beacon_id, pledge } => {
            let address = beacon_address(state, *beacon_id)?;
            let stake = state.add_pledge(&address, &pledge.record.to_address, pledge.record.staking_amount)?;
            info!(beacon_id, %stake, "beacon pledged");
        }
        Accepted::Binding { beacon_id, binding } => {
            let address = beacon_address(state, *beacon_id)?;
            let added = state.append_coinbase(&address, binding.record.coinbase_addresses.clone())?;
            debug!(beacon_id, added, "coinbase addresses bound");
        }
        Accepted::Burn(req) => {
            let outcome = state.burn_asset(&req.address, req.info.asset, req.info.beacon_id, height, req.amount)?;
            debug!(beacon_id = req.info.beacon_id, user = %req.address, net = %outcome.net, "burn applied");
        }
        Accepted::BurnProof { info, proof } => {
            if info.is_beacon {
                let item = BurnProofItem {
                    height: proof.out_height,
                    tx_hash: info.tx_hash.clone(),
                };
                state.finish_handle_user_burn(info, &item)?;
            } else {
                state.close_proof_for_punished(info, &proof.item)?;
                warn!(beacon_id = info.beacon_id, user = %info.address, height = info.height, "beacon punished on user proof");
            }
        }
        Accepted::WhiteListProof(proof) => {
            state.finish_whitelist_proof(proof)?;
            let value = state.calc_slashing_for_whitelist_proof(proof.amount, proof.asset)?;
            match state.finish_beacon_punished(proof.beacon_id, value) {
                Ok(slash) => warn!(beacon_id = proof.beacon_id, %slash, "whitelist transfer punished"),
                Err(StateError::StakingNotEnough { beacon_id, short }) => {
                    warn!(beacon_id, %short, "stake short of whitelist punishment")
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(applied)
}
