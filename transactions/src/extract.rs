//! Recognise special transactions on the host chain and pull their records
//! out of the marker outputs.
//!
//! Every function returns `Ok(None)` when the transaction is not of the
//! asked-for kind and an error when it is but breaks the shape rules.

use std::collections::BTreeMap;

use entangle_types::{Amount, HostTx, NativeAddress, ScriptEngine, TxOut};

use crate::entangle::{EntangleTxInfo, ExchangeTxInfo};
use crate::error::CodecError;
use crate::field::Record;
use crate::keeped::KeepedAmount;
use crate::payload::PayloadKind;
use crate::records::{
    BeaconPledge, BeaconRegistration, BurnProofInfo, BurnTxInfo, CoinbaseBinding, WhiteListProof,
};

/// Pubkey hash of the unspendable burn address.
pub const ZERO_PUBKEY_HASH: [u8; 20] = [0u8; 20];

/// A record together with the host identity that signed input 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signed<T> {
    pub record: T,
    pub address: NativeAddress,
    pub pubkey: Vec<u8>,
}

/// A burn of native asset addressed to a beacon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnRequest {
    pub info: BurnTxInfo,
    pub address: NativeAddress,
    /// Native amount sent to the zero address.
    pub amount: Amount,
}

pub fn zero_address_script(script: &dyn ScriptEngine) -> Result<Vec<u8>, CodecError> {
    Ok(script.pay_to_pubkey_hash(&ZERO_PUBKEY_HASH)?)
}

fn payload_of(out: &TxOut, script: &dyn ScriptEngine, kind: PayloadKind) -> Option<Vec<u8>> {
    match script.extract_payload(&out.script) {
        Some((k, data)) if k == kind.byte() => Some(data),
        _ => None,
    }
}

fn require_zero_value(tx: &HostTx, index: usize) -> Result<(), CodecError> {
    match tx.outputs[index].value {
        0 => Ok(()),
        value => Err(CodecError::NonZeroValue { index, value }),
    }
}

fn bad_shape(kind: PayloadKind, reason: impl Into<String>) -> CodecError {
    CodecError::BadShape {
        kind,
        reason: reason.into(),
    }
}

fn signer(
    tx: &HostTx,
    script: &dyn ScriptEngine,
    kind: PayloadKind,
) -> Result<(NativeAddress, Vec<u8>), CodecError> {
    let input = tx.inputs.first().ok_or_else(|| bad_shape(kind, "no inputs"))?;
    let pubkey = script.signer_pubkey(input)?;
    let address = script.address_from_pubkey(&pubkey)?;
    Ok((address, pubkey))
}

/// Decode the record carried by output 0.
fn first_output_record<T: Record>(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<T>, CodecError> {
    let Some(data) = tx.outputs.first().and_then(|o| payload_of(o, script, T::KIND)) else {
        return Ok(None);
    };
    let record = T::from_bytes(&data)?;
    require_zero_value(tx, 0)?;
    Ok(Some(record))
}

/// Registration, pledge and coinbase binding share one shape: a single
/// signed input, the record in output 0, the routing payment in output 1.
fn beacon_record<T: Record>(
    tx: &HostTx,
    script: &dyn ScriptEngine,
    outputs: std::ops::RangeInclusive<usize>,
) -> Result<Option<Signed<T>>, CodecError> {
    let Some(record) = first_output_record::<T>(tx, script)? else {
        return Ok(None);
    };
    if tx.inputs.len() != 1 {
        return Err(bad_shape(T::KIND, format!("{} inputs, need 1", tx.inputs.len())));
    }
    if !outputs.contains(&tx.outputs.len()) {
        return Err(bad_shape(
            T::KIND,
            format!("{} outputs, need {}..={}", tx.outputs.len(), outputs.start(), outputs.end()),
        ));
    }
    let (address, pubkey) = signer(tx, script, T::KIND)?;
    Ok(Some(Signed {
        record,
        address,
        pubkey,
    }))
}

/// All entangle claims, keyed by output index.
pub fn entangle_infos(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<BTreeMap<u32, EntangleTxInfo>, CodecError> {
    let mut infos = BTreeMap::new();
    for (index, out) in tx.outputs.iter().enumerate() {
        if let Some(data) = payload_of(out, script, PayloadKind::Entangle) {
            let info = EntangleTxInfo::from_bytes(&data)?;
            require_zero_value(tx, index)?;
            infos.insert(index as u32, info);
        }
    }
    Ok(infos)
}

/// Only output 0 may carry an exchange claim.
pub fn exchange_info(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<ExchangeTxInfo>, CodecError> {
    let Some(data) = tx
        .outputs
        .first()
        .and_then(|o| payload_of(o, script, PayloadKind::Exchange))
    else {
        return Ok(None);
    };
    let info = ExchangeTxInfo::from_bytes(&data)?;
    require_zero_value(tx, 0)?;
    Ok(Some(info))
}

pub fn beacon_registration(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<Signed<BeaconRegistration>>, CodecError> {
    beacon_record(tx, script, 2..=3)
}

pub fn beacon_pledge(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<Signed<BeaconPledge>>, CodecError> {
    beacon_record(tx, script, 2..=3)
}

pub fn coinbase_binding(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<Signed<CoinbaseBinding>>, CodecError> {
    beacon_record(tx, script, 2..=2)
}

/// Output 1 must send the burned amount to the zero address.
pub fn burn_request(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<BurnRequest>, CodecError> {
    let Some(info) = first_output_record::<BurnTxInfo>(tx, script)? else {
        return Ok(None);
    };
    let burn_out = tx
        .outputs
        .get(1)
        .ok_or_else(|| bad_shape(PayloadKind::Burn, "need at least two outputs"))?;
    if burn_out.script != zero_address_script(script)? {
        return Err(bad_shape(PayloadKind::Burn, "output 1 does not pay the zero address"));
    }
    let (address, _) = signer(tx, script, PayloadKind::Burn)?;
    Ok(Some(BurnRequest {
        info,
        address,
        amount: Amount::from(burn_out.value),
    }))
}

pub fn burn_proof(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<BurnProofInfo>, CodecError> {
    first_output_record(tx, script)
}

pub fn whitelist_proof(
    tx: &HostTx,
    script: &dyn ScriptEngine,
) -> Result<Option<WhiteListProof>, CodecError> {
    let Some(proof) = first_output_record::<WhiteListProof>(tx, script)? else {
        return Ok(None);
    };
    if tx.outputs.len() < 2 {
        return Err(bad_shape(PayloadKind::WhiteListProof, "need at least two outputs"));
    }
    Ok(Some(proof))
}

/// Snapshot carried by a coinbase output, if the script holds one.
pub fn keeped_amount(
    out: &TxOut,
    script: &dyn ScriptEngine,
) -> Result<Option<KeepedAmount>, CodecError> {
    payload_of(out, script, PayloadKind::KeepedAmount)
        .map(|data| KeepedAmount::from_bytes(&data))
        .transpose()
}

/// Which special kind a transaction is, judged by its marker outputs.
pub fn special_kind(tx: &HostTx, script: &dyn ScriptEngine) -> Option<PayloadKind> {
    let first = tx
        .outputs
        .first()
        .and_then(|o| script.extract_payload(&o.script))
        .and_then(|(k, _)| PayloadKind::from_byte(k));
    match first {
        Some(kind) if kind != PayloadKind::KeepedAmount => Some(kind),
        _ => tx
            .outputs
            .iter()
            .any(|o| payload_of(o, script, PayloadKind::Entangle).is_some())
            .then_some(PayloadKind::Entangle),
    }
}
