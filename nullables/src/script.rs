//! Nullable script engine: a tiny deterministic stand-in for the host
//! script interpreter and address codec.
//!
//! Scripts use the familiar standard templates so that classification
//! behaves like the real thing:
//! - marker:  `OP_RETURN 0xEE kind data...`
//! - P2PKH:   `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
//! - P2SH:    `OP_HASH160 <20> OP_EQUAL`
//!
//! Addresses are `N` followed by the hex of a 20-byte digest of the key.

use entangle_types::{NativeAddress, ScriptClass, ScriptEngine, ScriptError, TxIn, OutPoint};

const OP_RETURN: u8 = 0x6a;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const MARKER: u8 = 0xEE;
const MAX_PAYLOAD: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, Default)]
pub struct NullScriptEngine;

impl NullScriptEngine {
    pub fn new() -> Self {
        Self
    }

    /// Deterministic 20-byte digest standing in for HASH160.
    pub fn key_hash(pubkey: &[u8]) -> [u8; 20] {
        let mut h = [0u8; 20];
        for (i, b) in pubkey.iter().enumerate() {
            let slot = &mut h[i % 20];
            *slot = slot.wrapping_mul(31).wrapping_add(*b).wrapping_add(i as u8);
        }
        h[19] ^= pubkey.len() as u8;
        h
    }

    pub fn address_for(pubkey: &[u8]) -> NativeAddress {
        NativeAddress::new(format!("N{}", hex::encode(Self::key_hash(pubkey))))
    }

    /// An input whose signature script pushes `pubkey`.
    pub fn signed_input(pubkey: &[u8]) -> TxIn {
        let mut script = Vec::with_capacity(pubkey.len() + 1);
        script.push(pubkey.len() as u8);
        script.extend_from_slice(pubkey);
        TxIn::new(OutPoint::null(), script)
    }

    /// A segwit-style input carrying `pubkey` as its last witness item.
    pub fn witness_input(pubkey: &[u8]) -> TxIn {
        let mut input = TxIn::new(OutPoint::null(), Vec::new());
        input.witness = vec![vec![0x30; 71], pubkey.to_vec()];
        input
    }

    pub fn p2pkh(hash: &[u8; 20]) -> Vec<u8> {
        let mut s = vec![OP_DUP, OP_HASH160, 20];
        s.extend_from_slice(hash);
        s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        s
    }

    pub fn p2sh(hash: &[u8; 20]) -> Vec<u8> {
        let mut s = vec![OP_HASH160, 20];
        s.extend_from_slice(hash);
        s.push(OP_EQUAL);
        s
    }

    /// Marker script without going through the trait.
    pub fn marker(kind: u8, data: &[u8]) -> Vec<u8> {
        let mut s = vec![OP_RETURN, MARKER, kind];
        s.extend_from_slice(data);
        s
    }
}

impl ScriptEngine for NullScriptEngine {
    fn extract_payload(&self, script: &[u8]) -> Option<(u8, Vec<u8>)> {
        match script {
            [OP_RETURN, MARKER, kind, data @ ..] => Some((*kind, data.to_vec())),
            _ => None,
        }
    }

    fn payload_script(&self, kind: u8, data: &[u8]) -> Result<Vec<u8>, ScriptError> {
        if data.len() > MAX_PAYLOAD {
            return Err(ScriptError::PayloadTooLarge(data.len()));
        }
        Ok(Self::marker(kind, data))
    }

    fn pay_to_address(&self, address: &NativeAddress) -> Result<Vec<u8>, ScriptError> {
        let invalid = || ScriptError::InvalidAddress(address.to_string());
        let body = address.as_str().strip_prefix('N').ok_or_else(invalid)?;
        let raw = hex::decode(body).map_err(|_| invalid())?;
        let hash: [u8; 20] = raw.try_into().map_err(|_| invalid())?;
        Ok(Self::p2pkh(&hash))
    }

    fn pay_to_pubkey_hash(&self, hash: &[u8]) -> Result<Vec<u8>, ScriptError> {
        let hash: [u8; 20] = hash
            .try_into()
            .map_err(|_| ScriptError::InvalidAddress(hex::encode(hash)))?;
        Ok(Self::p2pkh(&hash))
    }

    fn signer_pubkey(&self, input: &TxIn) -> Result<Vec<u8>, ScriptError> {
        if let Some(last) = input.witness.last() {
            return Ok(last.clone());
        }
        match input.signature_script.as_slice() {
            [len, pk @ ..] if *len as usize == pk.len() && !pk.is_empty() => Ok(pk.to_vec()),
            _ => Err(ScriptError::NoSigner("no pubkey push in signature script".into())),
        }
    }

    fn address_from_pubkey(&self, pubkey: &[u8]) -> Result<NativeAddress, ScriptError> {
        if pubkey.is_empty() {
            return Err(ScriptError::InvalidPubkey);
        }
        Ok(Self::address_for(pubkey))
    }

    fn classify(&self, script: &[u8]) -> ScriptClass {
        match script {
            [OP_DUP, OP_HASH160, 20, .., OP_EQUALVERIFY, OP_CHECKSIG] if script.len() == 25 => {
                ScriptClass::PubKeyHash
            }
            [OP_HASH160, 20, .., OP_EQUAL] if script.len() == 23 => ScriptClass::ScriptHash,
            [OP_RETURN, ..] => ScriptClass::NullData,
            [len, .., OP_CHECKSIG] if *len as usize + 2 == script.len() => ScriptClass::PubKey,
            _ => ScriptClass::NonStandard,
        }
    }
}
