//! Assembling the entangle part of a coinbase transaction.
//!
//! The miner's template arrives with at least three inputs and four
//! outputs:
//!
//! | slot      | role                                   |
//! |-----------|----------------------------------------|
//! | input 0   | coinbase input                         |
//! | input 1,2 | pool reserve UTXOs (filled in here)    |
//! | output 0  | miner reward                           |
//! | output 1  | pool 1 reserve, pays exchanges         |
//! | output 2  | pool 2 reserve                         |
//! | output 3  | curve snapshot ([`crate::keep_entangle_amount`]) |
//!
//! Exchange payouts, punishment rewards and beacon merges are appended
//! after the template outputs.

use std::collections::BTreeMap;

use entangle_ledger::EntangleState;
use entangle_transactions::extract::ZERO_PUBKEY_HASH;
use entangle_types::{
    Amount, AssetType, HostTx, NativeAddress, OutPoint, RoutingTag, ScriptEngine, TxIn, TxOut,
};
use tracing::{debug, info};

use crate::error::CoinbaseError;

/// The two pool reserve UTXOs spent and recreated by every coinbase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInputs {
    pub outpoints: [OutPoint; 2],
    pub scripts: [Vec<u8>; 2],
    pub amounts: [Amount; 2],
}

/// A verified deposit waiting to be paid out in native asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeItem {
    pub asset: AssetType,
    pub beacon_id: u64,
    /// Foreign amount before pricing, native amount after.
    pub value: Amount,
    pub address: NativeAddress,
}

/// A punished burn whose prover is paid from the slashed UTXO.
///
/// The UTXO holding `origin_amount` is split three ways: `amount` to the
/// prover, `amount` burned to the zero address, the rest back as change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PunishedReward {
    pub outpoint: OutPoint,
    pub script: Vec<u8>,
    pub origin_amount: Amount,
    pub amount: Amount,
    pub reward_to: NativeAddress,
    pub change_to: NativeAddress,
}

impl PunishedReward {
    pub fn change(&self) -> Result<Amount, CoinbaseError> {
        let twice = self
            .amount
            .checked_add(self.amount)
            .ok_or(CoinbaseError::ValueOverflow("punished amount"))?;
        self.origin_amount
            .checked_sub(twice)
            .ok_or_else(|| CoinbaseError::NegativeChange {
                origin: self.origin_amount.to_string(),
                amount: self.amount.to_string(),
            })
    }
}

/// A stake UTXO to fold into its beacon's single merged output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconMergeItem {
    pub outpoint: OutPoint,
    pub script: Vec<u8>,
    pub amount: Amount,
    pub to_address: RoutingTag,
}

fn value_of(amount: Amount, what: &'static str) -> Result<u64, CoinbaseError> {
    u64::try_from(amount.raw()).map_err(|_| CoinbaseError::ValueOverflow(what))
}

fn spend(outpoint: OutPoint, script: &[u8]) -> TxIn {
    TxIn::new(outpoint, script.to_vec())
}

fn check_template(tx: &HostTx) -> Result<(), CoinbaseError> {
    if tx.inputs.len() < 3 || tx.outputs.len() < 4 {
        return Err(CoinbaseError::Template(format!(
            "{} inputs and {} outputs, need at least 3 and 4",
            tx.inputs.len(),
            tx.outputs.len()
        )));
    }
    Ok(())
}

/// Fill the pool inputs, pay every exchange item out of pool 1, pay the
/// provers of punished burns and merge each beacon's stake UTXOs.
///
/// Without pool inputs the coinbase is left as it is.
pub fn make_merge_coinbase_tx(
    tx: &mut HostTx,
    pool: Option<&PoolInputs>,
    items: &[ExchangeItem],
    rewards: &[PunishedReward],
    merges: &BTreeMap<u64, Vec<BeaconMergeItem>>,
    script: &dyn ScriptEngine,
) -> Result<(), CoinbaseError> {
    let Some(pool) = pool else {
        return Ok(());
    };
    check_template(tx)?;

    tx.inputs[1] = spend(pool.outpoints[0], &pool.scripts[0]);
    tx.inputs[2] = spend(pool.outpoints[1], &pool.scripts[1]);

    let reserve1 = pool.amounts[0]
        .checked_add(Amount::from(tx.outputs[1].value))
        .ok_or(CoinbaseError::ValueOverflow("pool 1 reserve"))?;
    let reserve2 = pool.amounts[1]
        .checked_add(Amount::from(tx.outputs[2].value))
        .ok_or(CoinbaseError::ValueOverflow("pool 2 reserve"))?;
    tx.outputs[2].value = value_of(reserve2, "pool 2 reserve")?;

    let mut paid = Amount::ZERO;
    for item in items {
        let out = TxOut::new(value_of(item.value, "exchange payout")?, script.pay_to_address(&item.address)?);
        paid = paid
            .checked_add(item.value)
            .ok_or(CoinbaseError::ValueOverflow("exchange payouts"))?;
        tx.add_output(out);
    }
    let left = reserve1
        .checked_sub(paid)
        .ok_or_else(|| CoinbaseError::NegativeReserve {
            reserve: reserve1.to_string(),
            needed: paid.to_string(),
        })?;
    tx.outputs[1].value = value_of(left, "pool 1 reserve")?;

    let zero = script.pay_to_pubkey_hash(&ZERO_PUBKEY_HASH)?;
    for reward in rewards {
        let change = reward.change()?;
        let amount = value_of(reward.amount, "punish reward")?;
        tx.add_input(spend(reward.outpoint, &reward.script));
        tx.add_output(TxOut::new(amount, script.pay_to_address(&reward.reward_to)?));
        tx.add_output(TxOut::new(amount, zero.clone()));
        tx.add_output(TxOut::new(
            value_of(change, "punish change")?,
            script.pay_to_address(&reward.change_to)?,
        ));
    }

    for (beacon_id, group) in merges {
        let Some(first) = group.first() else {
            continue;
        };
        let mut total = Amount::ZERO;
        for m in group {
            tx.add_input(spend(m.outpoint, &m.script));
            total = total
                .checked_add(m.amount)
                .ok_or(CoinbaseError::ValueOverflow("beacon merge"))?;
        }
        let to = script.pay_to_pubkey_hash(first.to_address.as_bytes())?;
        tx.add_output(TxOut::new(value_of(total, "beacon merge")?, to));
        debug!(beacon_id, utxos = group.len(), %total, "beacon stake merged");
    }

    info!(
        exchanges = items.len(),
        rewards = rewards.len(),
        beacons = merges.len(),
        pool1 = %left,
        pool2 = %reserve2,
        "merge coinbase built"
    );
    Ok(())
}

/// Credit each deposit in `state` and pay the priced native amount.
/// Items are rewritten with their native value. Stops at the first
/// failure; the caller discards the working state.
pub fn pay_exchange_items(
    tx: &mut HostTx,
    height: u64,
    items: &mut [ExchangeItem],
    state: &mut EntangleState,
    script: &dyn ScriptEngine,
) -> Result<Amount, CoinbaseError> {
    let mut total = Amount::ZERO;
    for item in items.iter_mut() {
        let native = state.add_entangle_item(&item.address, item.asset, item.beacon_id, height, item.value)?;
        tx.add_output(TxOut::new(
            value_of(native, "exchange payout")?,
            script.pay_to_address(&item.address)?,
        ));
        item.value = native;
        total = total
            .checked_add(native)
            .ok_or(CoinbaseError::ValueOverflow("exchange payouts"))?;
    }
    Ok(total)
}
