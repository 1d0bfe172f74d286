//! The entanglement state: beacon registry, user positions, merge
//! bookkeeping and the reward pools.
//!
//! Beacons live in a dense arena indexed by exchange id (ids start at 1),
//! with a secondary index by native address that is rebuilt after
//! decoding. Positions are keyed by `(beacon_id, user, asset)`.
//!
//! Every mutating operation checks all of its preconditions before it
//! touches anything, so an `Err` leaves the state exactly as it was.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use entangle_types::{
    Amount, AssetFlags, AssetType, EntangleParams, NativeAddress, OutPoint, RoutingTag,
};

use crate::beacon::{BeaconAddress, ExBeaconInfo, WhiteListEntry};
use crate::entity::{EntangleEntity, EntityKey};
use crate::error::StateError;

/// Everything a new beacon brings to its registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBeacon {
    pub address: NativeAddress,
    pub to_address: RoutingTag,
    pub pubkey: Vec<u8>,
    pub staking_amount: Amount,
    pub fee: u64,
    pub keep_time: u64,
    pub asset_flags: AssetFlags,
    pub whitelist: Vec<WhiteListEntry>,
    pub coinbase_addresses: Vec<NativeAddress>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangleState {
    pub(crate) beacons: Vec<BeaconAddress>,
    pub(crate) entities: BTreeMap<EntityKey, EntangleEntity>,
    pub(crate) ex_infos: BTreeMap<u64, ExBeaconInfo>,
    pub(crate) pool_amount1: Amount,
    pub(crate) pool_amount2: Amount,
    pub(crate) cur_exchange_id: u64,

    #[serde(skip)]
    pub(crate) by_address: HashMap<NativeAddress, u64>,
    #[serde(skip)]
    pub(crate) params: EntangleParams,
}

impl EntangleState {
    pub fn new(params: EntangleParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &EntangleParams {
        &self.params
    }

    pub fn cur_exchange_id(&self) -> u64 {
        self.cur_exchange_id
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.by_address = self
            .beacons
            .iter()
            .map(|b| (b.address.clone(), b.exchange_id))
            .collect();
    }

    // ── Beacon lookups ──────────────────────────────────────────────────

    pub fn beacon(&self, id: u64) -> Option<&BeaconAddress> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        self.beacons.get(idx)
    }

    pub(crate) fn beacon_mut(&mut self, id: u64) -> Option<&mut BeaconAddress> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        self.beacons.get_mut(idx)
    }

    pub fn beacon_by_address(&self, address: &NativeAddress) -> Option<&BeaconAddress> {
        self.by_address.get(address).and_then(|id| self.beacon(*id))
    }

    pub fn beacon_id_by_to(&self, to: &RoutingTag) -> Option<u64> {
        self.beacons
            .iter()
            .find(|b| &b.to_address == to)
            .map(|b| b.exchange_id)
    }

    pub fn beacons(&self) -> impl Iterator<Item = &BeaconAddress> {
        self.beacons.iter()
    }

    pub(crate) fn require_beacon(&self, id: u64) -> Result<&BeaconAddress, StateError> {
        self.beacon(id)
            .ok_or_else(|| StateError::NoSuchBeacon(id.to_string()))
    }

    pub(crate) fn require_beacon_mut(&mut self, id: u64) -> Result<&mut BeaconAddress, StateError> {
        self.beacon_mut(id)
            .ok_or_else(|| StateError::NoSuchBeacon(id.to_string()))
    }

    fn id_of(&self, address: &NativeAddress) -> Result<u64, StateError> {
        self.by_address
            .get(address)
            .copied()
            .ok_or_else(|| StateError::NoSuchBeacon(address.to_string()))
    }

    // ── Registration and maintenance ────────────────────────────────────

    pub fn register_beacon(&mut self, req: NewBeacon) -> Result<u64, StateError> {
        let p = &self.params;
        if !p.valid_fee(req.fee) {
            return Err(StateError::InvalidParam("fee"));
        }
        if !p.valid_keep_time(req.keep_time) {
            return Err(StateError::InvalidParam("keep time"));
        }
        if !req.asset_flags.is_valid() {
            return Err(StateError::InvalidParam("asset flags"));
        }
        if req
            .whitelist
            .iter()
            .any(|w| w.asset().is_none() || !p.valid_whitelist_key(&w.unit.pubkey))
        {
            return Err(StateError::InvalidParam("whitelist entry"));
        }
        if req.whitelist.len() > p.max_whitelist {
            return Err(StateError::TooManyWhiteList(p.max_whitelist));
        }
        if req.coinbase_addresses.len() > p.max_coinbase {
            return Err(StateError::TooManyCoinbase(p.max_coinbase));
        }
        let min = p.min_staking_amount();
        if req.staking_amount < min {
            return Err(StateError::LessThanMinimum {
                stake: req.staking_amount.to_string(),
                min: min.to_string(),
            });
        }
        if self.by_address.contains_key(&req.address) {
            return Err(StateError::RepeatRegister(req.address));
        }
        if self.beacon_id_by_to(&req.to_address).is_some() {
            return Err(StateError::RepeatToAddress(req.to_address.to_string()));
        }

        let id = self.cur_exchange_id + 1;
        let mut beacon = BeaconAddress {
            exchange_id: id,
            address: req.address,
            pubkey: req.pubkey,
            to_address: req.to_address,
            staking_amount: req.staking_amount,
            entangle_amount: Amount::ZERO,
            en_assets: BTreeMap::new(),
            frees: BTreeMap::new(),
            fee: req.fee,
            keep_time: req.keep_time,
            asset_flags: req.asset_flags,
            whitelist: req.whitelist,
            coinbase_addresses: req
                .coinbase_addresses
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect(),
        };
        beacon.init_frees();

        info!(
            beacon_id = id,
            address = %beacon.address,
            to = %beacon.to_address,
            stake = %beacon.staking_amount,
            "beacon registered"
        );
        self.by_address.insert(beacon.address.clone(), id);
        self.beacons.push(beacon);
        self.ex_infos.insert(id, ExBeaconInfo::default());
        self.cur_exchange_id = id;
        Ok(id)
    }

    /// Add whitelist keys. Entries with an unknown asset or a malformed key
    /// are skipped; the count check covers the whole request.
    pub fn append_whitelist(
        &mut self,
        address: &NativeAddress,
        entries: Vec<WhiteListEntry>,
    ) -> Result<usize, StateError> {
        let id = self.id_of(address)?;
        let max = self.params.max_whitelist;
        let key_len = self.params.whitelist_key_len;
        let beacon = self.require_beacon_mut(id)?;
        if beacon.whitelist.len() + entries.len() > max {
            return Err(StateError::TooManyWhiteList(max));
        }
        let before = beacon.whitelist.len();
        beacon.whitelist.extend(
            entries
                .into_iter()
                .filter(|w| w.asset().is_some() && w.unit.pubkey.len() == key_len),
        );
        Ok(beacon.whitelist.len() - before)
    }

    pub fn append_coinbase(
        &mut self,
        address: &NativeAddress,
        coinbases: Vec<NativeAddress>,
    ) -> Result<usize, StateError> {
        let id = self.id_of(address)?;
        let max = self.params.max_coinbase;
        let beacon = self.require_beacon_mut(id)?;
        if beacon.coinbase_addresses.len() + coinbases.len() > max {
            return Err(StateError::TooManyCoinbase(max));
        }
        let before = beacon.coinbase_addresses.len();
        beacon
            .coinbase_addresses
            .extend(coinbases.into_iter().filter(|c| !c.is_empty()));
        Ok(beacon.coinbase_addresses.len() - before)
    }

    /// Raise a beacon's stake. The pledge must name the beacon's own
    /// routing tag.
    pub fn add_pledge(
        &mut self,
        address: &NativeAddress,
        to_address: &RoutingTag,
        amount: Amount,
    ) -> Result<Amount, StateError> {
        let id = self.id_of(address)?;
        let beacon = self.require_beacon_mut(id)?;
        if &beacon.to_address != to_address {
            return Err(StateError::ToAddressMismatch(id));
        }
        let stake = beacon
            .staking_amount
            .checked_add(amount)
            .ok_or(StateError::Overflow("staking amount"))?;
        beacon.staking_amount = stake;
        debug!(beacon_id = id, %amount, %stake, "pledge added");
        Ok(stake)
    }

    pub fn update_coinbase(
        &mut self,
        address: &NativeAddress,
        old: &NativeAddress,
        new: NativeAddress,
    ) -> Result<(), StateError> {
        let id = self.id_of(address)?;
        let beacon = self.require_beacon_mut(id)?;
        for c in beacon.coinbase_addresses.iter_mut() {
            if &*c == old {
                *c = new.clone();
            }
        }
        Ok(())
    }

    pub fn update_config(
        &mut self,
        address: &NativeAddress,
        fee: u64,
        keep_time: u64,
        flags: AssetFlags,
    ) -> Result<(), StateError> {
        if !self.params.valid_fee(fee) || !self.params.valid_keep_time(keep_time) || !flags.is_valid() {
            return Err(StateError::InvalidParam("beacon config"));
        }
        let id = self.id_of(address)?;
        let beacon = self.require_beacon_mut(id)?;
        beacon.fee = fee;
        beacon.keep_time = keep_time;
        beacon.asset_flags = flags;
        beacon.init_frees();
        Ok(())
    }

    pub fn coinbase_addresses(&self, address: &NativeAddress) -> Result<Vec<NativeAddress>, StateError> {
        let id = self.id_of(address)?;
        Ok(self.require_beacon(id)?.coinbase_addresses.clone())
    }

    /// Collateral a leaving beacon could take back. The record itself is
    /// kept so outstanding burns can still be settled or punished.
    pub fn unregister_beacon(&self, address: &NativeAddress) -> Result<Amount, StateError> {
        let id = self.id_of(address)?;
        let beacon = self.require_beacon(id)?;
        let free = beacon.headroom();
        info!(beacon_id = id, %free, "beacon unregister requested");
        Ok(free)
    }

    /// Stake above what credited users and the minimum require, when any.
    pub fn limit_staking_amount(&self, id: u64) -> Option<Amount> {
        let beacon = self.beacon(id)?;
        let over = beacon
            .headroom()
            .saturating_sub(self.params.min_staking_amount());
        (!over.is_zero()).then_some(over)
    }

    /// Whether `address` is a whitelisted key address of any beacon, or,
    /// with `include_beacons`, a beacon address itself.
    pub fn address_in_whitelist(&self, address: &NativeAddress, include_beacons: bool) -> bool {
        if include_beacons && self.by_address.contains_key(address) {
            return true;
        }
        self.beacons.iter().any(|b| b.whitelists(address))
    }

    /// Mining difficulty multiplier for a coinbase address bound by one or
    /// more beacons.
    pub fn difficulty_multiplier(&self, coinbase: &NativeAddress) -> Option<u128> {
        let mut staked = Amount::ZERO;
        let mut bound = false;
        for b in self.beacons.iter().filter(|b| b.binds_coinbase(coinbase)) {
            staked = staked.checked_add(b.staking_amount)?;
            bound = true;
        }
        if !bound {
            return None;
        }
        let min = self.params.min_staking_amount().raw();
        if min == 0 {
            return None;
        }
        (staked.raw() / min).checked_mul(self.params.difficulty_bonus as u128)
    }

    // ── Merge bookkeeping ───────────────────────────────────────────────

    pub fn ex_info(&self, id: u64) -> Option<&ExBeaconInfo> {
        self.ex_infos.get(&id)
    }

    pub fn set_merge_items(&mut self, id: u64, items: Vec<OutPoint>) -> Result<(), StateError> {
        let info = self
            .ex_infos
            .get_mut(&id)
            .ok_or_else(|| StateError::NoSuchBeacon(id.to_string()))?;
        info.merge_items = items;
        Ok(())
    }

    // ── Pools ───────────────────────────────────────────────────────────

    pub fn pool_amounts(&self) -> (Amount, Amount) {
        (self.pool_amount1, self.pool_amount2)
    }

    pub fn set_pool_amounts(&mut self, amount1: Amount, amount2: Amount) {
        self.pool_amount1 = amount1;
        self.pool_amount2 = amount2;
    }

    pub fn add_pool_amounts(&mut self, amount1: Amount, amount2: Amount) -> Result<(), StateError> {
        let a = self
            .pool_amount1
            .checked_add(amount1)
            .ok_or(StateError::Overflow("pool 1"))?;
        let b = self
            .pool_amount2
            .checked_add(amount2)
            .ok_or(StateError::Overflow("pool 2"))?;
        self.pool_amount1 = a;
        self.pool_amount2 = b;
        Ok(())
    }

    pub fn sub_pool_amount1(&mut self, amount: Amount) -> Result<(), StateError> {
        self.pool_amount1 = self
            .pool_amount1
            .checked_sub(amount)
            .ok_or(StateError::Overflow("pool 1 underflow"))?;
        Ok(())
    }

    pub fn sub_pool_amount2(&mut self, amount: Amount) -> Result<(), StateError> {
        self.pool_amount2 = self
            .pool_amount2
            .checked_sub(amount)
            .ok_or(StateError::Overflow("pool 2 underflow"))?;
        Ok(())
    }

    // ── Position queries ────────────────────────────────────────────────

    pub fn entity(&self, beacon_id: u64, user: &NativeAddress, asset: AssetType) -> Option<&EntangleEntity> {
        self.entities
            .get(&EntityKey::new(beacon_id, user.clone(), asset))
    }

    pub fn entities(&self) -> impl Iterator<Item = (&EntityKey, &EntangleEntity)> {
        self.entities.iter()
    }

    /// Every position `user` holds with `beacon_id`.
    pub fn user_entities<'a>(
        &'a self,
        beacon_id: u64,
        user: &'a NativeAddress,
    ) -> impl Iterator<Item = &'a EntangleEntity> + 'a {
        self.entities
            .range(EntityKey::new(beacon_id, user.clone(), AssetType::Doge)..)
            .take_while(move |(k, _)| k.beacon_id == beacon_id && &k.user == user)
            .map(|(_, e)| e)
    }

    /// Foreign amount of `asset` deposited with one beacon.
    pub fn entangled_outside(&self, beacon_id: u64, asset: AssetType) -> Amount {
        self.entities
            .iter()
            .filter(|(k, _)| k.beacon_id == beacon_id && k.asset == asset)
            .fold(Amount::ZERO, |acc, (_, e)| acc.saturating_add(e.en_outside_amount))
    }

    /// Foreign amount of `asset` deposited across every beacon; the input
    /// to the pricing curve.
    pub fn cumulative_outside(&self, asset: AssetType) -> Amount {
        self.entities
            .iter()
            .filter(|(k, _)| k.asset == asset)
            .fold(Amount::ZERO, |acc, (_, e)| acc.saturating_add(e.en_outside_amount))
    }

    /// Sum of the beacons' own per-asset deposit counters.
    pub fn all_en_assets(&self, asset: AssetType) -> Amount {
        self.beacons
            .iter()
            .fold(Amount::ZERO, |acc, b| acc.saturating_add(b.en_asset(asset)))
    }

    /// Native amount `user` may burn against `beacon_id` across all assets.
    pub fn redeemable(&self, user: &NativeAddress, beacon_id: u64) -> Amount {
        let (released, burned) = self
            .user_entities(beacon_id, user)
            .fold((Amount::ZERO, Amount::ZERO), |(r, b), e| {
                (
                    r.saturating_add(e.max_redeem),
                    b.saturating_add(e.burns.burned_native_total),
                )
            });
        released.saturating_sub(burned)
    }
}
