//! User positions and the burns recorded against them.

use serde::{Deserialize, Serialize};

use entangle_transactions::BurnProofInfo;
use entangle_types::{Amount, AssetType, ForeignTxHash, NativeAddress};

use crate::error::StateError;

/// Composite key of a position. Ordering is `(beacon_id, user, asset tag)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub beacon_id: u64,
    pub user: NativeAddress,
    pub asset: AssetType,
}

impl EntityKey {
    pub fn new(beacon_id: u64, user: NativeAddress, asset: AssetType) -> Self {
        Self {
            beacon_id,
            user,
            asset,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RedeemState {
    #[default]
    Pending,
    Fulfilled,
    Disputed,
    Punished,
}

impl RedeemState {
    pub fn code(self) -> u8 {
        match self {
            RedeemState::Pending => 0,
            RedeemState::Fulfilled => 1,
            RedeemState::Disputed => 2,
            RedeemState::Punished => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RedeemState::Fulfilled | RedeemState::Punished)
    }
}

/// Foreign transaction a beacon (or user) offered as redemption evidence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnProofItem {
    pub height: u64,
    pub tx_hash: ForeignTxHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnItem {
    /// Native amount burned.
    pub amount: Amount,
    /// Native part of `amount` kept as beacon fee.
    pub fee_amount: Amount,
    /// Foreign amount owed for `amount`.
    pub redeem_amount: Amount,
    /// Foreign value of the fee.
    pub fee_redeem_amount: Amount,
    pub height: u64,
    pub state: RedeemState,
    pub proof: Option<BurnProofItem>,
}

impl BurnItem {
    /// Foreign amount the beacon must actually pay.
    pub fn owed(&self) -> Amount {
        self.redeem_amount.saturating_sub(self.fee_redeem_amount)
    }

    fn same_request(&self, other: &BurnItem) -> bool {
        self.height == other.height
            && self.amount == other.amount
            && self.fee_amount == other.fee_amount
            && self.redeem_amount == other.redeem_amount
            && self.fee_redeem_amount == other.fee_redeem_amount
    }

    fn matches(&self, height: u64, amount: Amount, state: RedeemState) -> bool {
        self.height == height && self.amount == amount && self.state == state
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnInfos {
    pub items: Vec<BurnItem>,
    /// Foreign amount owed across every burn.
    pub redeemed_outside_total: Amount,
    /// Native amount burned across every burn.
    pub burned_native_total: Amount,
}

impl BurnInfos {
    /// Record a pending burn. An identical pending request is not recorded
    /// twice; returns whether the item was added.
    pub(crate) fn add_item(&mut self, item: BurnItem) -> Result<bool, StateError> {
        let duplicate = self
            .items
            .iter()
            .any(|v| v.state == RedeemState::Pending && v.same_request(&item));
        if duplicate {
            return Ok(false);
        }
        let redeemed = self
            .redeemed_outside_total
            .checked_add(item.redeem_amount)
            .ok_or(StateError::Overflow("redeemed outside total"))?;
        let burned = self
            .burned_native_total
            .checked_add(item.amount)
            .ok_or(StateError::Overflow("burned native total"))?;
        self.redeemed_outside_total = redeemed;
        self.burned_native_total = burned;
        self.items.push(item);
        Ok(true)
    }

    /// Pending items older than `limit` blocks at `height`. With `update`
    /// they are moved to `Disputed`; the returned copies keep the state
    /// they had when found.
    pub(crate) fn take_timed_out(&mut self, height: u64, limit: u64, update: bool) -> Vec<BurnItem> {
        let mut out = Vec::new();
        for v in self.items.iter_mut() {
            if v.state == RedeemState::Pending && height.saturating_sub(v.height) > limit {
                out.push(v.clone());
                if update {
                    v.state = RedeemState::Disputed;
                }
            }
        }
        out
    }

    /// Highest foreign height any proof has been accepted at, and whether
    /// `tx` already backs one of them.
    pub fn latest_proof(&self, tx: &ForeignTxHash) -> (u64, bool) {
        let mut height = 0;
        let mut used = false;
        for proof in self.items.iter().filter_map(|v| v.proof.as_ref()) {
            if proof.tx_hash.is_empty() {
                continue;
            }
            height = height.max(proof.height);
            used |= &proof.tx_hash == tx;
        }
        (height, used)
    }

    pub(crate) fn verify_proof(
        &self,
        info: &BurnProofInfo,
        out_height: u64,
        cur_height: u64,
        limit: u64,
    ) -> Result<BurnItem, StateError> {
        let pending = self
            .items
            .iter()
            .filter(|v| v.height == info.height && v.state == RedeemState::Pending);

        if info.is_beacon {
            let (latest, used) = self.latest_proof(&info.tx_hash);
            if out_height < latest || used {
                return Err(StateError::BurnProofMismatch);
            }
            pending
                .filter(|v| v.proof.is_none() && info.amount >= v.owed())
                .cloned()
                .next()
                .ok_or(StateError::BurnProofMismatch)
        } else {
            pending
                .filter(|v| {
                    info.amount < v.owed() || cur_height.saturating_sub(v.height) > limit
                })
                .cloned()
                .next()
                .ok_or(StateError::BurnProofMismatch)
        }
    }

    /// Settle every non-terminal item at `height` the paid `amount` covers.
    pub(crate) fn finish(&mut self, height: u64, amount: Amount, proof: &BurnProofItem) -> usize {
        let mut n = 0;
        for v in self.items.iter_mut() {
            if v.height == height && !v.state.is_terminal() && amount >= v.owed() {
                v.state = RedeemState::Fulfilled;
                v.proof = Some(proof.clone());
                n += 1;
            }
        }
        n
    }

    /// Dispute every pending item at `height` the paid `amount` falls short of.
    pub(crate) fn dispute(&mut self, height: u64, amount: Amount, proof: &BurnProofItem) -> usize {
        let mut n = 0;
        for v in self.items.iter_mut() {
            if v.height == height && v.state == RedeemState::Pending && amount < v.owed() {
                v.state = RedeemState::Disputed;
                v.proof = Some(proof.clone());
                n += 1;
            }
        }
        n
    }

    /// Move the item matching `item` from `from` to `to`. Terminal items
    /// never move.
    pub(crate) fn transition(&mut self, item: &BurnItem, from: RedeemState, to: RedeemState) -> bool {
        if from.is_terminal() {
            return false;
        }
        match self
            .items
            .iter_mut()
            .find(|v| v.matches(item.height, item.amount, from))
        {
            Some(v) => {
                v.state = to;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangleEntity {
    pub exchange_id: u64,
    pub address: NativeAddress,
    pub asset: AssetType,
    pub height: u64,
    /// Effective height of the redemption clock.
    pub old_height: u64,
    /// Foreign amount deposited.
    pub en_outside_amount: Amount,
    /// Native amount credited.
    pub origin_amount: Amount,
    /// Native amount currently released for burning.
    pub max_redeem: Amount,
    pub burns: BurnInfos,
}

impl EntangleEntity {
    pub(crate) fn new(exchange_id: u64, address: NativeAddress, asset: AssetType, height: u64) -> Self {
        Self {
            exchange_id,
            address,
            asset,
            height,
            old_height: height,
            en_outside_amount: Amount::ZERO,
            origin_amount: Amount::ZERO,
            max_redeem: Amount::ZERO,
            burns: BurnInfos::default(),
        }
    }

    /// Native amount the user may still burn against this position.
    pub fn valid_redeem(&self) -> Amount {
        self.max_redeem.saturating_sub(self.burns.burned_native_total)
    }

    pub fn valid_origin(&self) -> Amount {
        self.origin_amount.saturating_sub(self.burns.burned_native_total)
    }

    pub fn valid_outside(&self) -> Amount {
        self.en_outside_amount
            .saturating_sub(self.burns.redeemed_outside_total)
    }

    /// Push the redemption clock forward for a new deposit of `amount`
    /// foreign units. `valid_origin` is measured before the deposit.
    pub(crate) fn advance_clock(&mut self, valid_origin: Amount, amount: Amount, weight: u64) -> Result<(), StateError> {
        let overflow = || StateError::Overflow("redemption clock");
        let total = valid_origin.checked_add(amount).ok_or_else(overflow)?;
        if total.is_zero() {
            return Ok(());
        }
        let weighted = (self.old_height as u128)
            .checked_mul(valid_origin.raw())
            .and_then(|t| t.checked_add((weight as u128).checked_mul(amount.raw())?))
            .ok_or_else(overflow)?;
        let step = u64::try_from(weighted / total.raw()).map_err(|_| overflow())?;
        self.old_height = self.old_height.checked_add(step).ok_or_else(overflow)?;
        Ok(())
    }

    /// Apply the keep-time window at `cur_height`. Inside the window the
    /// quota is closed; past it the whole credited amount is released.
    /// Returns the foreign amount this position makes free.
    pub(crate) fn release_quota(&mut self, cur_height: u64, keep_time: u64) -> Amount {
        if cur_height.saturating_sub(self.old_height) < keep_time {
            self.max_redeem = Amount::ZERO;
            Amount::ZERO
        } else {
            self.max_redeem = self.origin_amount;
            self.valid_outside()
        }
    }
}
