//! Crediting foreign deposits and burning native asset back.

use tracing::{debug, warn};

use entangle_curve::{convert, redeem_rate};
use entangle_transactions::WhiteListProof;
use entangle_types::{Amount, AssetType, NativeAddress};

use crate::entity::{BurnItem, EntangleEntity, EntityKey, RedeemState};
use crate::error::StateError;
use crate::state::EntangleState;

/// What a recorded burn is worth on each side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnOutcome {
    /// Native amount burned net of the beacon fee.
    pub net: Amount,
    /// Native beacon fee.
    pub fee: Amount,
    /// Foreign amount owed for the whole burn.
    pub redeem: Amount,
    /// Foreign value of the fee.
    pub fee_redeem: Amount,
}

impl EntangleState {
    /// Credit `foreign_amount` of `asset` deposited by `user` with a beacon.
    /// Returns the native amount credited.
    pub fn add_entangle_item(
        &mut self,
        user: &NativeAddress,
        asset: AssetType,
        beacon_id: u64,
        height: u64,
        foreign_amount: Amount,
    ) -> Result<Amount, StateError> {
        if self.address_in_whitelist(user, true) {
            return Err(StateError::AddressInWhiteList(user.clone()));
        }
        let beacon = self.require_beacon(beacon_id)?;
        if !beacon.asset_flags.contains(asset) {
            return Err(StateError::AssetNotSupported { beacon_id, asset });
        }

        let reserve = self.cumulative_outside(asset);
        let native = convert(self.params.curve(asset), reserve, foreign_amount)?;

        let headroom = beacon.headroom();
        let needed = native
            .checked_add(self.params.min_staking_amount())
            .ok_or(StateError::Overflow("collateral check"))?;
        if headroom.is_zero() || headroom < needed {
            warn!(beacon_id, %asset, %native, %headroom, "deposit exceeds beacon collateral");
            return Err(StateError::InsufficientCollateral {
                beacon_id,
                wanted: native.to_string(),
            });
        }

        let key = EntityKey::new(beacon_id, user.clone(), asset);
        let mut entity = self
            .entities
            .get(&key)
            .cloned()
            .unwrap_or_else(|| EntangleEntity::new(beacon_id, user.clone(), asset, height));
        let valid_origin = entity.valid_origin();
        let overflow = || StateError::Overflow("entangle credit");
        entity.en_outside_amount = entity
            .en_outside_amount
            .checked_add(foreign_amount)
            .ok_or_else(overflow)?;
        entity.origin_amount = entity.origin_amount.checked_add(native).ok_or_else(overflow)?;
        entity.max_redeem = entity.max_redeem.checked_add(native).ok_or_else(overflow)?;
        entity.advance_clock(valid_origin, foreign_amount, self.params.quota_weight)?;

        let beacon = self.require_beacon(beacon_id)?;
        let en_asset = beacon
            .en_asset(asset)
            .checked_add(foreign_amount)
            .ok_or_else(overflow)?;
        let entangled = beacon
            .entangle_amount
            .checked_add(native)
            .ok_or_else(overflow)?;

        let beacon = self.require_beacon_mut(beacon_id)?;
        beacon.en_assets.insert(asset, en_asset);
        beacon.entangle_amount = entangled;
        self.entities.insert(key, entity);

        debug!(beacon_id, %user, %asset, %foreign_amount, %native, "deposit credited");
        Ok(native)
    }

    /// Burn `amount` native units of `user`'s `asset` position with a
    /// beacon, recording what the beacon now owes on the foreign chain.
    pub fn burn_asset(
        &mut self,
        user: &NativeAddress,
        asset: AssetType,
        beacon_id: u64,
        height: u64,
        amount: Amount,
    ) -> Result<BurnOutcome, StateError> {
        let beacon = self.require_beacon(beacon_id)?;
        let fee_rate = beacon.fee;
        if self.user_entities(beacon_id, user).next().is_none() {
            return Err(StateError::NoSuchUserPosition {
                beacon_id,
                user: user.clone(),
            });
        }
        let key = EntityKey::new(beacon_id, user.clone(), asset);
        let missing = || StateError::NoAssetOfType {
            beacon_id,
            user: user.clone(),
            asset,
        };
        if !self.entities.contains_key(&key) {
            return Err(missing());
        }
        let available = self.redeemable(user, beacon_id);
        if amount > available {
            return Err(StateError::ExceedsRedeemable {
                wanted: amount.to_string(),
                available: available.to_string(),
            });
        }

        let rate = redeem_rate(self.params.curve(asset), self.cumulative_outside(asset))?;
        let redeem = rate.apply(amount)?;
        let fee = amount
            .checked_mul_div(fee_rate as u128, self.params.max_fee as u128)
            .ok_or(StateError::Overflow("burn fee"))?;
        let fee_redeem = rate.apply(fee)?;

        let item = BurnItem {
            amount,
            fee_amount: fee,
            redeem_amount: redeem,
            fee_redeem_amount: fee_redeem,
            height,
            state: RedeemState::Pending,
            proof: None,
        };
        let entity = self
            .entities
            .get_mut(&key)
            .ok_or_else(missing)?;
        if !entity.burns.add_item(item)? {
            return Err(StateError::DuplicateBurn {
                beacon_id,
                user: user.clone(),
                height,
            });
        }

        debug!(beacon_id, %user, %asset, %amount, %redeem, %fee, "burn recorded");
        Ok(BurnOutcome {
            net: amount.saturating_sub(fee),
            fee,
            redeem,
            fee_redeem,
        })
    }

    /// Record a whitelist-transfer proof against its beacon. A proof at an
    /// already recorded foreign height is refused.
    pub fn finish_whitelist_proof(&mut self, proof: &WhiteListProof) -> Result<(), StateError> {
        let info = self
            .ex_infos
            .get_mut(&proof.beacon_id)
            .ok_or_else(|| StateError::NoSuchBeacon(proof.beacon_id.to_string()))?;
        info.append_proof(proof)
    }

    /// Native value of a foreign amount at the current cumulative volume.
    pub fn calc_slashing_for_whitelist_proof(
        &self,
        amount: Amount,
        asset: AssetType,
    ) -> Result<Amount, StateError> {
        let reserve = self.cumulative_outside(asset);
        Ok(convert(self.params.curve(asset), reserve, amount)?)
    }
}
