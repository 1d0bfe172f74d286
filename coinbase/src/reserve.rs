//! Pool sufficiency and the per-block curve snapshot.

use entangle_curve::convert;
use entangle_ledger::EntangleState;
use entangle_transactions::{extract, KeepedAmount, PayloadKind};
use entangle_types::{Amount, AssetType, EntangleParams, HostTx, ScriptEngine, TxOut};
use tracing::warn;

use crate::error::CoinbaseError;
use crate::merge::{ExchangeItem, PoolInputs};

/// Native value of every item priced from the snapshot. Items of the same
/// asset move the curve for the ones after them.
fn priced_total(
    items: &[ExchangeItem],
    keep: &KeepedAmount,
    params: &EntangleParams,
) -> Result<Amount, CoinbaseError> {
    let mut cumulative = keep.clone();
    let mut total = Amount::ZERO;
    for item in items {
        let reserve = cumulative.get(item.asset).unwrap_or_default();
        let native = convert(params.curve(item.asset), reserve, item.value)?;
        cumulative.add(item.asset, item.value)?;
        total = total
            .checked_add(native)
            .ok_or(CoinbaseError::ValueOverflow("priced exchanges"))?;
    }
    Ok(total)
}

/// Whether `reserve` strictly covers the native payout of `items`.
pub fn enough_amount(
    reserve: Amount,
    items: &[ExchangeItem],
    keep: &KeepedAmount,
    params: &EntangleParams,
) -> Result<bool, CoinbaseError> {
    Ok(reserve > priced_total(items, keep, params)?)
}

/// Whether paying `items` would overdraw pool 1. `out1` is the value the
/// template already routes into pool 1.
pub fn over_entangle_amount(
    out1: u64,
    pool: &PoolInputs,
    items: &[ExchangeItem],
    keep: &KeepedAmount,
    params: &EntangleParams,
) -> Result<bool, CoinbaseError> {
    if items.is_empty() {
        return Ok(false);
    }
    let reserve = pool.amounts[0]
        .checked_add(Amount::from(out1))
        .ok_or(CoinbaseError::ValueOverflow("pool 1 reserve"))?;
    let over = !enough_amount(reserve, items, keep, params)?;
    if over {
        warn!(%reserve, items = items.len(), "exchanges exceed pool 1");
    }
    Ok(over)
}

/// Snapshot of the cumulative deposits for the given assets.
pub fn keep_infos_from_state(
    state: &EntangleState,
    assets: &[AssetType],
) -> Result<KeepedAmount, CoinbaseError> {
    let mut keep = KeepedAmount::new();
    for &asset in assets {
        if keep.get(asset).is_none() {
            keep.add(asset, state.all_en_assets(asset))?;
        }
    }
    Ok(keep)
}

/// Snapshot carried by a previous coinbase, or the empty snapshot when the
/// output holds none.
pub fn keeped_from_output(out: &TxOut, script: &dyn ScriptEngine) -> Result<KeepedAmount, CoinbaseError> {
    Ok(extract::keeped_amount(out, script)?.unwrap_or_default())
}

/// Write the snapshot into output 3 of the coinbase.
pub fn keep_entangle_amount(
    keep: &KeepedAmount,
    tx: &mut HostTx,
    script: &dyn ScriptEngine,
) -> Result<(), CoinbaseError> {
    let marker = script.payload_script(PayloadKind::KeepedAmount.byte(), &keep.to_bytes())?;
    let slot = tx
        .outputs
        .get_mut(3)
        .ok_or_else(|| CoinbaseError::Template("no output 3 for the snapshot".into()))?;
    *slot = TxOut::new(0, marker);
    Ok(())
}
