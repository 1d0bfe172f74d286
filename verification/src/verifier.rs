use std::collections::BTreeSet;
use std::sync::Arc;

use entangle_ledger::{BeaconAddress, BurnItem, EntangleState, NewBeacon, StateError, WhiteListEntry};
use entangle_store::EntangleCache;
use entangle_transactions::extract;
use entangle_transactions::{
    BeaconPledge, BeaconRegistration, BurnProofInfo, BurnRequest, CoinbaseBinding, PayloadKind,
    Signed, WhiteListProof,
};
use entangle_types::{
    Amount, AssetType, EntangleParams, ForeignTxHash, HostTx, NativeAddress, RoutingTag,
    ScriptEngine, TxOut,
};
use tracing::{debug, info};

use crate::error::VerifyError;
use crate::pool::ForeignClients;

/// A routed deposit that passed every check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedExchange {
    pub asset: AssetType,
    /// Host output carrying the claim.
    pub index: u32,
    pub beacon_id: u64,
    /// Foreign amount deposited.
    pub amount: Amount,
    pub ext_tx_hash: ForeignTxHash,
    pub height: u64,
    pub pubkey: Vec<u8>,
    /// Native address credited for the deposit.
    pub address: NativeAddress,
}

/// A legacy deposit claim with no beacon attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedEntangle {
    pub asset: AssetType,
    pub index: u32,
    pub amount: Amount,
    pub ext_tx_hash: ForeignTxHash,
    pub pubkey: Vec<u8>,
    pub address: NativeAddress,
}

/// A burn proof that matched an outstanding burn item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedBurnProof {
    pub item: BurnItem,
    /// Foreign chain height the proof was observed at.
    pub out_height: u64,
}

pub struct Verifier {
    clients: ForeignClients,
    script: Arc<dyn ScriptEngine>,
    cache: Option<EntangleCache>,
    params: EntangleParams,
}

impl Verifier {
    pub fn new(
        clients: ForeignClients,
        script: Arc<dyn ScriptEngine>,
        cache: Option<EntangleCache>,
        params: EntangleParams,
    ) -> Self {
        Self {
            clients,
            script,
            cache,
            params,
        }
    }

    pub fn clients(&self) -> &ForeignClients {
        &self.clients
    }

    pub fn script(&self) -> &dyn ScriptEngine {
        self.script.as_ref()
    }

    pub fn params(&self) -> &EntangleParams {
        &self.params
    }

    fn check_not_entangled(&self, hash: &ForeignTxHash, asset: AssetType) -> Result<(), VerifyError> {
        if let Some(cache) = &self.cache {
            if cache.is_entangled(hash, asset)? {
                return Err(VerifyError::AlreadyEntangled {
                    hash: hash.clone(),
                    asset,
                });
            }
        }
        Ok(())
    }

    /// Foreign scripts that hold `asset` for the beacon: each whitelisted
    /// key of that asset, raw and as a payment to its derived address.
    fn custody_scripts(&self, beacon: &BeaconAddress, asset: AssetType) -> Vec<Vec<u8>> {
        let mut scripts = Vec::new();
        for entry in beacon.whitelist.iter().filter(|w| w.asset() == Some(asset)) {
            scripts.push(entry.unit.pubkey.clone());
            if let Ok(script) = self.script().pay_to_address(&entry.address) {
                scripts.push(script);
            }
        }
        scripts
    }

    // ── Deposits ────────────────────────────────────────────────────────

    /// Check a routed deposit claim and resolve who gets credited.
    pub fn verify_exchange_tx(
        &self,
        tx: &HostTx,
        state: &EntangleState,
    ) -> Result<VerifiedExchange, VerifyError> {
        let info = extract::exchange_info(tx, self.script())?
            .ok_or(VerifyError::NotSpecial(PayloadKind::Exchange))?;
        self.check_not_entangled(&info.ext_tx_hash, info.asset)?;

        let beacon = state
            .beacon(info.beacon_id)
            .ok_or_else(|| StateError::NoSuchBeacon(info.beacon_id.to_string()))?;
        let payees = self.custody_scripts(beacon, info.asset);
        let pubkey = self.verify_foreign_deposit(
            info.asset,
            &info.ext_tx_hash,
            info.index,
            info.height,
            info.amount,
            &payees,
        )?;
        let address = self.script().address_from_pubkey(&pubkey)?;

        info!(
            asset = %info.asset,
            beacon_id = info.beacon_id,
            hash = %info.ext_tx_hash,
            amount = %info.amount,
            user = %address,
            "exchange tx verified"
        );
        Ok(VerifiedExchange {
            asset: info.asset,
            index: 0,
            beacon_id: info.beacon_id,
            amount: info.amount,
            ext_tx_hash: info.ext_tx_hash,
            height: info.height,
            pubkey,
            address,
        })
    }

    /// Check every beacon-less claim in a transaction. A hash claimed twice
    /// in the same transaction counts as already entangled.
    pub fn verify_entangle_tx(&self, tx: &HostTx) -> Result<Vec<VerifiedEntangle>, VerifyError> {
        let infos = extract::entangle_infos(tx, self.script())?;
        if infos.is_empty() {
            return Err(VerifyError::NotSpecial(PayloadKind::Entangle));
        }
        let mut seen = BTreeSet::new();
        for info in infos.values() {
            self.check_not_entangled(&info.ext_tx_hash, info.asset)?;
            if !seen.insert((info.ext_tx_hash.clone(), info.asset)) {
                return Err(VerifyError::AlreadyEntangled {
                    hash: info.ext_tx_hash.clone(),
                    asset: info.asset,
                });
            }
        }

        let mut out = Vec::with_capacity(infos.len());
        for (index, info) in infos {
            let pool = self
                .params
                .pool_script(info.asset)
                .ok_or(VerifyError::NoPool(info.asset))?;
            let pubkey = self.verify_foreign_deposit(
                info.asset,
                &info.ext_tx_hash,
                info.index,
                info.height,
                info.amount,
                &[pool],
            )?;
            let address = self.script().address_from_pubkey(&pubkey)?;
            out.push(VerifiedEntangle {
                asset: info.asset,
                index,
                amount: info.amount,
                ext_tx_hash: info.ext_tx_hash,
                pubkey,
                address,
            });
        }
        debug!(claims = out.len(), "entangle tx verified");
        Ok(out)
    }

    // ── Beacon lifecycle ────────────────────────────────────────────────

    /// Output 1 must pay the routing tag, and the tag must be reserved.
    fn check_routing_payment<'a>(&self, tx: &'a HostTx, tag: &RoutingTag) -> Result<&'a TxOut, VerifyError> {
        let value = tag.numeric_value().unwrap_or(u64::MAX);
        if !tag.in_reserved_range() {
            return Err(VerifyError::RoutingTagRange(value));
        }
        let out = tx.outputs.get(1).ok_or(VerifyError::RoutingPayment)?;
        if out.script != self.script().pay_to_pubkey_hash(tag.as_bytes())? {
            return Err(VerifyError::RoutingPayment);
        }
        Ok(out)
    }

    fn check_stake_output(out: &TxOut, stake: Amount) -> Result<(), VerifyError> {
        if Amount::from(out.value) != stake {
            return Err(VerifyError::StakeMismatch {
                record: stake.to_string(),
                output: out.value,
            });
        }
        Ok(())
    }

    fn check_min_stake(&self, stake: Amount) -> Result<(), VerifyError> {
        let min = self.params.min_staking_amount();
        if stake < min {
            return Err(StateError::LessThanMinimum {
                stake: stake.to_string(),
                min: min.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_coinbase(&self, addresses: &[NativeAddress]) -> Result<(), VerifyError> {
        if addresses.len() > self.params.max_coinbase {
            return Err(StateError::TooManyCoinbase(self.params.max_coinbase).into());
        }
        for addr in addresses {
            self.script().pay_to_address(addr)?;
        }
        Ok(())
    }

    fn check_tag_free(state: &EntangleState, tag: &RoutingTag) -> Result<(), VerifyError> {
        if state.beacon_id_by_to(tag).is_some() {
            return Err(StateError::RepeatToAddress(tag.to_string()).into());
        }
        Ok(())
    }

    /// The beacon a pledge or binding is signed by, which must own `tag`.
    fn owning_beacon(
        state: &EntangleState,
        address: &NativeAddress,
        tag: &RoutingTag,
    ) -> Result<u64, VerifyError> {
        let beacon = state
            .beacon_by_address(address)
            .ok_or_else(|| StateError::NoSuchBeacon(address.to_string()))?;
        if &beacon.to_address != tag {
            return Err(StateError::ToAddressMismatch(beacon.exchange_id).into());
        }
        Ok(beacon.exchange_id)
    }

    pub fn verify_beacon_registration(
        &self,
        tx: &HostTx,
        state: &EntangleState,
    ) -> Result<Signed<BeaconRegistration>, VerifyError> {
        let reg = extract::beacon_registration(tx, self.script())?
            .ok_or(VerifyError::NotSpecial(PayloadKind::BeaconRegistration))?;
        let r = &reg.record;

        if state.beacon_by_address(&reg.address).is_some() {
            return Err(StateError::RepeatRegister(reg.address.clone()).into());
        }
        let out = self.check_routing_payment(tx, &r.to_address)?;
        Self::check_stake_output(out, r.staking_amount)?;

        if !self.params.valid_fee(r.fee) {
            return Err(StateError::InvalidParam("fee").into());
        }
        if !self.params.valid_keep_time(r.keep_time) {
            return Err(StateError::InvalidParam("keep_time").into());
        }
        self.check_min_stake(r.staking_amount)?;
        if !r.asset_flags.is_valid() {
            return Err(StateError::InvalidParam("asset_flags").into());
        }
        if r.whitelist.len() > self.params.max_whitelist {
            return Err(StateError::TooManyWhiteList(self.params.max_whitelist).into());
        }
        for unit in &r.whitelist {
            if !self.params.valid_whitelist_key(&unit.pubkey) || unit.asset_type().is_none() {
                return Err(StateError::InvalidParam("whitelist").into());
            }
        }
        self.check_coinbase(&r.coinbase_addresses)?;
        Self::check_tag_free(state, &r.to_address)?;

        info!(beacon = %reg.address, tag = %r.to_address, stake = %r.staking_amount, "beacon registration verified");
        Ok(reg)
    }

    /// Turn a verified registration into the ledger request, deriving the
    /// address of every whitelisted key.
    pub fn new_beacon(&self, reg: &Signed<BeaconRegistration>) -> Result<NewBeacon, VerifyError> {
        let r = &reg.record;
        let whitelist = r
            .whitelist
            .iter()
            .map(|unit| {
                let address = self.script().address_from_pubkey(&unit.pubkey)?;
                Ok(WhiteListEntry::new(unit.clone(), address))
            })
            .collect::<Result<Vec<_>, VerifyError>>()?;
        Ok(NewBeacon {
            address: reg.address.clone(),
            to_address: r.to_address.clone(),
            pubkey: reg.pubkey.clone(),
            staking_amount: r.staking_amount,
            fee: r.fee,
            keep_time: r.keep_time,
            asset_flags: r.asset_flags,
            whitelist,
            coinbase_addresses: r.coinbase_addresses.clone(),
        })
    }

    /// Extra stake for an existing beacon. Returns the beacon id.
    pub fn verify_pledge(
        &self,
        tx: &HostTx,
        state: &EntangleState,
    ) -> Result<(u64, Signed<BeaconPledge>), VerifyError> {
        let pledge = extract::beacon_pledge(tx, self.script())?
            .ok_or(VerifyError::NotSpecial(PayloadKind::BeaconPledge))?;
        let p = &pledge.record;

        let id = Self::owning_beacon(state, &pledge.address, &p.to_address)?;
        let out = self.check_routing_payment(tx, &p.to_address)?;
        Self::check_stake_output(out, p.staking_amount)?;
        self.check_min_stake(p.staking_amount)?;

        debug!(beacon_id = id, stake = %p.staking_amount, "pledge verified");
        Ok((id, pledge))
    }

    /// New coinbase addresses for an existing beacon. Returns the beacon id.
    pub fn verify_coinbase_binding(
        &self,
        tx: &HostTx,
        state: &EntangleState,
    ) -> Result<(u64, Signed<CoinbaseBinding>), VerifyError> {
        let binding = extract::coinbase_binding(tx, self.script())?
            .ok_or(VerifyError::NotSpecial(PayloadKind::CoinbaseBinding))?;
        let b = &binding.record;

        let id = Self::owning_beacon(state, &binding.address, &b.to_address)?;
        self.check_routing_payment(tx, &b.to_address)?;
        self.check_coinbase(&b.coinbase_addresses)?;

        debug!(beacon_id = id, count = b.coinbase_addresses.len(), "coinbase binding verified");
        Ok((id, binding))
    }

    // ── Redemption ──────────────────────────────────────────────────────

    /// The burner must hold a position of that asset with the beacon, and
    /// cannot burn more than it entangled.
    pub fn verify_burn(&self, req: &BurnRequest, state: &EntangleState) -> Result<(), VerifyError> {
        let info = &req.info;
        if state.beacon(info.beacon_id).is_none() {
            return Err(StateError::NoSuchBeacon(info.beacon_id.to_string()).into());
        }
        if state.user_entities(info.beacon_id, &req.address).next().is_none() {
            return Err(StateError::NoSuchUserPosition {
                beacon_id: info.beacon_id,
                user: req.address.clone(),
            }
            .into());
        }
        let entity = state
            .entity(info.beacon_id, &req.address, info.asset)
            .ok_or_else(|| StateError::NoAssetOfType {
                beacon_id: info.beacon_id,
                user: req.address.clone(),
                asset: info.asset,
            })?;
        if req.amount > entity.origin_amount {
            return Err(VerifyError::BurnExceedsOrigin {
                wanted: req.amount.to_string(),
                origin: entity.origin_amount.to_string(),
            });
        }
        Ok(())
    }

    /// A beacon's proof must be signed by the beacon on the foreign chain;
    /// a user's complaint needs no foreign evidence.
    pub fn verify_burn_proof(
        &self,
        info: &BurnProofInfo,
        state: &EntangleState,
        cur_height: u64,
    ) -> Result<VerifiedBurnProof, VerifyError> {
        let beacon = state
            .beacon(info.beacon_id)
            .ok_or_else(|| StateError::NoSuchBeacon(info.beacon_id.to_string()))?;

        let mut out_height = 0;
        if info.is_beacon {
            let pool = self.clients.pool(info.asset)?;
            let tx = pool.call("get_transaction", |c| c.get_transaction(&info.tx_hash))?;
            let input = tx.inputs.first().ok_or(VerifyError::ForeignShape {
                hash: info.tx_hash.clone(),
                inputs: 0,
                outputs: tx.outputs.len(),
            })?;
            let signer = self.script().signer_pubkey(input)?;
            if self.script().address_from_pubkey(&signer)? != beacon.address {
                return Err(VerifyError::NotBeaconSigner {
                    beacon_id: info.beacon_id,
                });
            }
            if info.out_index as usize >= tx.outputs.len() {
                return Err(VerifyError::OutputIndex {
                    index: info.out_index,
                    outputs: tx.outputs.len(),
                });
            }
            out_height = pool.call("get_best_height", |c| c.get_best_height())?;
        }

        let item = state.verify_burn_proof(info, out_height, cur_height)?;
        debug!(
            beacon_id = info.beacon_id,
            user = %info.address,
            is_beacon = info.is_beacon,
            height = info.height,
            "burn proof matched"
        );
        Ok(VerifiedBurnProof { item, out_height })
    }

    /// A whitelist proof shows the beacon moved deposited funds somewhere
    /// other than its own whitelisted keys.
    pub fn verify_whitelist_proof(
        &self,
        info: &WhiteListProof,
        state: &EntangleState,
    ) -> Result<(), VerifyError> {
        let beacon = state
            .beacon(info.beacon_id)
            .ok_or_else(|| StateError::NoSuchBeacon(info.beacon_id.to_string()))?;
        if state
            .ex_info(info.beacon_id)
            .is_some_and(|ex| ex.has_proof_at(info.height))
        {
            return Err(StateError::RepeatProof(info.height).into());
        }

        let pool = self.clients.pool(info.asset)?;
        let tx = pool.call("get_transaction", |c| c.get_transaction(&info.tx_hash))?;
        let input = tx
            .inputs
            .get(info.in_index as usize)
            .ok_or(VerifyError::InputIndex {
                index: info.in_index,
                inputs: tx.inputs.len(),
            })?;
        let out = tx
            .outputs
            .get(info.out_index as usize)
            .ok_or(VerifyError::OutputIndex {
                index: info.out_index,
                outputs: tx.outputs.len(),
            })?;

        let signer = self.script().signer_pubkey(input)?;
        if signer != beacon.pubkey {
            return Err(VerifyError::NotBeaconSigner {
                beacon_id: info.beacon_id,
            });
        }

        if self.custody_scripts(beacon, info.asset).contains(&out.script) {
            return Err(VerifyError::IllegalTransfer {
                beacon_id: info.beacon_id,
                asset: info.asset,
            });
        }

        info!(beacon_id = info.beacon_id, asset = %info.asset, height = info.height, "whitelist proof verified");
        Ok(())
    }
}
