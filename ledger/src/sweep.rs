//! Burn lifecycle and the per-block sweep.
//!
//! Burns start `Pending`. A beacon proof that covers the owed amount makes
//! them `Fulfilled`; a short payment or a missed deadline makes them
//! `Disputed`; punishing the beacon makes them `Punished`. `Fulfilled` and
//! `Punished` are final.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use entangle_transactions::BurnProofInfo;
use entangle_types::{Amount, AssetType, NativeAddress};

use crate::entity::{BurnItem, BurnProofItem, EntangleEntity, EntityKey, RedeemState};
use crate::error::StateError;
use crate::state::EntangleState;

/// Burns found past their deadline, by beacon, user and asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeoutReport {
    pub beacons: BTreeMap<u64, BTreeMap<NativeAddress, BTreeMap<AssetType, Vec<BurnItem>>>>,
}

impl TimeoutReport {
    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }

    /// Number of timed-out burn items.
    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn items(&self) -> impl Iterator<Item = (u64, &NativeAddress, AssetType, &BurnItem)> {
        self.beacons.iter().flat_map(|(id, users)| {
            users.iter().flat_map(move |(user, assets)| {
                assets
                    .iter()
                    .flat_map(move |(asset, items)| items.iter().map(move |i| (*id, user, *asset, i)))
            })
        })
    }
}

/// Native amount a user lost to one beacon's missed deadlines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PunishedItem {
    pub user: NativeAddress,
    pub amount: Amount,
}

/// Per beacon, what each user is owed for burns that timed out.
pub fn summarize_punished(report: &TimeoutReport) -> BTreeMap<u64, Vec<PunishedItem>> {
    report
        .beacons
        .iter()
        .map(|(id, users)| {
            let items = users
                .iter()
                .map(|(user, assets)| PunishedItem {
                    user: user.clone(),
                    amount: assets
                        .values()
                        .flatten()
                        .fold(Amount::ZERO, |acc, i| acc.saturating_add(i.amount)),
                })
                .collect();
            (*id, items)
        })
        .collect()
}

/// Outcome of the end-of-block sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSweep {
    pub timeouts: TimeoutReport,
    pub punished: BTreeMap<u64, Vec<PunishedItem>>,
    /// Beacons whose stake could not cover their slash.
    pub short_beacons: Vec<u64>,
}

impl EntangleState {
    fn proof_entity(&self, info: &BurnProofInfo) -> Result<&EntangleEntity, StateError> {
        self.require_beacon(info.beacon_id)?;
        if self.user_entities(info.beacon_id, &info.address).next().is_none() {
            return Err(StateError::NoSuchUserPosition {
                beacon_id: info.beacon_id,
                user: info.address.clone(),
            });
        }
        self.entity(info.beacon_id, &info.address, info.asset)
            .ok_or_else(|| StateError::NoAssetOfType {
                beacon_id: info.beacon_id,
                user: info.address.clone(),
                asset: info.asset,
            })
    }

    fn proof_entity_mut(&mut self, info: &BurnProofInfo) -> Result<&mut EntangleEntity, StateError> {
        self.proof_entity(info)?;
        let key = EntityKey::new(info.beacon_id, info.address.clone(), info.asset);
        self.entities
            .get_mut(&key)
            .ok_or(StateError::BurnProofMismatch)
    }

    /// Find the burn item a redemption proof answers. `out_height` is the
    /// foreign height of the proof transaction.
    pub fn verify_burn_proof(
        &self,
        info: &BurnProofInfo,
        out_height: u64,
        cur_height: u64,
    ) -> Result<BurnItem, StateError> {
        let entity = self.proof_entity(info)?;
        entity.burns.verify_proof(
            info,
            out_height,
            cur_height,
            self.params.limit_redeem_height,
        )
    }

    /// Settle the items the beacon paid in full. Returns how many moved.
    pub fn finish_handle_user_burn(
        &mut self,
        info: &BurnProofInfo,
        proof: &BurnProofItem,
    ) -> Result<usize, StateError> {
        let entity = self.proof_entity_mut(info)?;
        let n = entity.burns.finish(info.height, info.amount, proof);
        debug!(beacon_id = info.beacon_id, user = %info.address, height = info.height, n, "burns fulfilled");
        Ok(n)
    }

    /// Dispute the items the beacon underpaid. Returns how many moved.
    pub fn update_handle_user_burn(
        &mut self,
        info: &BurnProofInfo,
        proof: &BurnProofItem,
    ) -> Result<usize, StateError> {
        let entity = self.proof_entity_mut(info)?;
        let n = entity.burns.dispute(info.height, info.amount, proof);
        debug!(beacon_id = info.beacon_id, user = %info.address, height = info.height, n, "burns disputed");
        Ok(n)
    }

    /// Slash the beacon for a burn the user proved unanswered and close
    /// the item as disputed.
    pub fn close_proof_for_punished(
        &mut self,
        info: &BurnProofInfo,
        item: &BurnItem,
    ) -> Result<(), StateError> {
        self.proof_entity(info)?;
        let slash = self.slash_amount(info.amount)?;
        let entity = self.proof_entity_mut(info)?;
        entity.burns.transition(item, item.state, RedeemState::Disputed);
        let beacon = self.require_beacon_mut(info.beacon_id)?;
        let short = beacon.slash(slash);
        if !short.is_zero() {
            warn!(beacon_id = info.beacon_id, %slash, %short, "beacon stake short of proof slash");
        }
        Ok(())
    }

    /// Move every overdue pending burn to `Disputed` and report them.
    pub fn tour_all_user_burn_info(&mut self, height: u64) -> TimeoutReport {
        let limit = self.params.limit_redeem_height;
        let mut report = TimeoutReport::default();
        for (key, entity) in self.entities.iter_mut() {
            let items = entity.burns.take_timed_out(height, limit, true);
            if items.is_empty() {
                continue;
            }
            report
                .beacons
                .entry(key.beacon_id)
                .or_default()
                .entry(key.user.clone())
                .or_default()
                .insert(key.asset, items);
        }
        report
    }

    /// Mark reported burns as punished. Returns how many moved.
    pub fn update_state_to_punished(&mut self, report: &TimeoutReport) -> usize {
        let mut n = 0;
        for (beacon_id, user, asset, item) in report.items() {
            let key = EntityKey::new(beacon_id, user.clone(), asset);
            if let Some(entity) = self.entities.get_mut(&key) {
                if entity
                    .burns
                    .transition(item, RedeemState::Disputed, RedeemState::Punished)
                {
                    n += 1;
                }
            }
        }
        n
    }

    /// Slash a beacon for `amount` of unredeemed burns. The stake
    /// saturates at zero; when it could not cover the slash the deduction
    /// still happens and `StakingNotEnough` is returned.
    pub fn finish_beacon_punished(&mut self, id: u64, amount: Amount) -> Result<Amount, StateError> {
        let slash = self.slash_amount(amount)?;
        let beacon = self.require_beacon_mut(id)?;
        let short = beacon.slash(slash);
        info!(beacon_id = id, %slash, stake = %beacon.staking_amount, "beacon punished");
        if !short.is_zero() {
            return Err(StateError::StakingNotEnough {
                beacon_id: id,
                short: short.to_string(),
            });
        }
        Ok(slash)
    }

    fn slash_amount(&self, amount: Amount) -> Result<Amount, StateError> {
        amount
            .checked_mul_div(self.params.slash_multiplier as u128, 1)
            .ok_or(StateError::Overflow("slash amount"))
    }

    /// Reopen or close every position's redemption quota at `height` and
    /// recompute the beacons' free quotas from it.
    pub fn update_quota_on_block(&mut self, height: u64) {
        for beacon in self.beacons.iter_mut() {
            for free in beacon.frees.values_mut() {
                *free = Amount::ZERO;
            }
        }
        let beacons = &mut self.beacons;
        for (key, entity) in self.entities.iter_mut() {
            let Some(beacon) = key
                .beacon_id
                .checked_sub(1)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| beacons.get_mut(i))
            else {
                warn!(beacon_id = key.beacon_id, "position without beacon");
                continue;
            };
            let released = entity.release_quota(height, beacon.keep_time);
            if let Some(free) = beacon.frees.get_mut(&key.asset) {
                *free = free.saturating_add(released);
            }
        }
    }

    /// Run the end-of-block steps in order: time out overdue burns, slash
    /// their beacons, mark them punished, then update quotas.
    pub fn end_block(&mut self, height: u64) -> Result<BlockSweep, StateError> {
        let timeouts = self.tour_all_user_burn_info(height);
        let punished = summarize_punished(&timeouts);
        let mut short_beacons = Vec::new();
        for (id, items) in &punished {
            let total = items
                .iter()
                .fold(Amount::ZERO, |acc, i| acc.saturating_add(i.amount));
            match self.finish_beacon_punished(*id, total) {
                Ok(_) => {}
                Err(StateError::StakingNotEnough { .. }) => short_beacons.push(*id),
                Err(e) => return Err(e),
            }
        }
        let moved = self.update_state_to_punished(&timeouts);
        self.update_quota_on_block(height);
        if moved > 0 {
            info!(height, moved, beacons = punished.len(), "overdue burns punished");
        }
        Ok(BlockSweep {
            timeouts,
            punished,
            short_beacons,
        })
    }
}
