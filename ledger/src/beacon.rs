//! Beacon records: registered custodians, their collateral and the
//! per-beacon bookkeeping the coinbase merge needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use entangle_transactions::{WhiteListProof, WhiteUnit};
use entangle_types::{Amount, AssetFlags, AssetType, NativeAddress, OutPoint, RoutingTag};

use crate::error::StateError;

/// A whitelisted foreign key together with the native address it controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteListEntry {
    pub unit: WhiteUnit,
    pub address: NativeAddress,
}

impl WhiteListEntry {
    pub fn new(unit: WhiteUnit, address: NativeAddress) -> Self {
        Self { unit, address }
    }

    pub fn asset(&self) -> Option<AssetType> {
        self.unit.asset_type()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconAddress {
    pub exchange_id: u64,
    pub address: NativeAddress,
    pub pubkey: Vec<u8>,
    pub to_address: RoutingTag,
    pub staking_amount: Amount,
    /// Native amount credited to users against this beacon.
    pub entangle_amount: Amount,
    /// Cumulative foreign deposits per asset.
    pub en_assets: BTreeMap<AssetType, Amount>,
    /// Foreign amount released for redemption per asset.
    pub frees: BTreeMap<AssetType, Amount>,
    pub fee: u64,
    pub keep_time: u64,
    pub asset_flags: AssetFlags,
    pub whitelist: Vec<WhiteListEntry>,
    pub coinbase_addresses: Vec<NativeAddress>,
}

impl BeaconAddress {
    /// Collateral not yet backing credited native amount. Negative
    /// headroom reads as zero.
    pub fn headroom(&self) -> Amount {
        self.staking_amount.saturating_sub(self.entangle_amount)
    }

    pub fn en_asset(&self, asset: AssetType) -> Amount {
        self.en_assets.get(&asset).copied().unwrap_or_default()
    }

    pub fn free_quota(&self, asset: AssetType) -> Amount {
        self.frees.get(&asset).copied().unwrap_or_default()
    }

    pub fn whitelists(&self, address: &NativeAddress) -> bool {
        self.whitelist.iter().any(|w| &w.address == address)
    }

    pub fn binds_coinbase(&self, address: &NativeAddress) -> bool {
        self.coinbase_addresses.iter().any(|c| c == address)
    }

    /// Zero a free-quota slot for every enabled asset that lacks one.
    pub(crate) fn init_frees(&mut self) {
        for asset in self.asset_flags.assets() {
            self.frees.entry(asset).or_insert(Amount::ZERO);
        }
    }

    /// Deduct a slash from the stake. The stake saturates at zero; the
    /// shortfall, if any, is returned.
    pub(crate) fn slash(&mut self, amount: Amount) -> Amount {
        let short = amount.saturating_sub(self.staking_amount);
        self.staking_amount = self.staking_amount.saturating_sub(amount);
        short
    }
}

/// Merge bookkeeping kept beside each beacon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExBeaconInfo {
    /// Outputs paid to the beacon that the next coinbase merges.
    pub merge_items: Vec<OutPoint>,
    pub proofs: Vec<WhiteListProof>,
}

impl ExBeaconInfo {
    pub fn has_proof_at(&self, height: u64) -> bool {
        self.proofs.iter().any(|p| p.height == height)
    }

    pub fn append_proof(&mut self, proof: &WhiteListProof) -> Result<(), StateError> {
        if self.has_proof_at(proof.height) {
            return Err(StateError::RepeatProof(proof.height));
        }
        self.proofs.push(proof.clone());
        Ok(())
    }
}
