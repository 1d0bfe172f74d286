//! Block-level checks over the ordered special transactions.

use std::collections::BTreeMap;

use entangle_ledger::EntangleState;
use entangle_transactions::extract;
use entangle_types::{HostTx, OutPoint, RoutingTag, ScriptEngine};

use crate::error::CoinbaseError;

/// A block transaction with its fee rate, in block order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EtsInfo {
    pub fee_per_kb: u64,
    pub tx: HostTx,
}

/// Highest foreign height claimed by a deposit transaction, if it is one.
fn claimed_height(tx: &HostTx, script: &dyn ScriptEngine) -> Option<u64> {
    if let Ok(Some(info)) = extract::exchange_info(tx, script) {
        return Some(info.height);
    }
    extract::entangle_infos(tx, script)
        .ok()
        .and_then(|infos| infos.values().map(|i| i.height).max())
}

/// Deposit transactions must come in ascending foreign height, unless a
/// later one pays a strictly higher fee rate.
pub fn verify_txs_sequence(infos: &[EtsInfo], script: &dyn ScriptEngine) -> Result<(), CoinbaseError> {
    let mut prev: Option<(usize, u64)> = None;
    for (i, info) in infos.iter().enumerate() {
        let Some(height) = claimed_height(&info.tx, script) else {
            continue;
        };
        if let Some((pos, pre)) = prev {
            if pre > height && infos[pos].fee_per_kb <= info.fee_per_kb {
                return Err(CoinbaseError::OutOfSequence {
                    prev_index: pos,
                    prev_height: pre,
                    prev_fee: infos[pos].fee_per_kb,
                    index: i,
                    height,
                    fee: info.fee_per_kb,
                });
            }
        }
        prev = Some((i, height));
    }
    Ok(())
}

/// Stake outputs created by registrations and pledges in `txs`, grouped by
/// the beacon that owns the routing tag. These are merged in a later
/// coinbase.
pub fn fetch_outpoints_from_txs(
    txs: &[HostTx],
    state: &EntangleState,
    script: &dyn ScriptEngine,
) -> BTreeMap<u64, Vec<OutPoint>> {
    let mut res: BTreeMap<u64, Vec<OutPoint>> = BTreeMap::new();
    for tx in txs {
        let tag: Option<RoutingTag> = match extract::beacon_registration(tx, script) {
            Ok(Some(reg)) => Some(reg.record.to_address),
            _ => match extract::beacon_pledge(tx, script) {
                Ok(Some(pledge)) => Some(pledge.record.to_address),
                _ => None,
            },
        };
        let Some(tag) = tag.filter(RoutingTag::in_reserved_range) else {
            continue;
        };
        if let Some(id) = state.beacon_id_by_to(&tag) {
            res.entry(id).or_default().push(OutPoint::new(tx.hash, 1));
        }
    }
    res
}
