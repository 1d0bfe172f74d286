use entangle_nullables::NullScriptEngine;
use entangle_transactions::extract::{self, ZERO_PUBKEY_HASH};
use entangle_transactions::{
    BeaconPledge, BeaconRegistration, BurnProofInfo, BurnTxInfo, CodecError, CoinbaseBinding,
    EntangleTxInfo, ExchangeTxInfo, KeepedAmount, PayloadKind, Record, WhiteListProof,
};
use entangle_types::{
    Amount, AssetFlags, AssetType, ForeignTxHash, HostTx, NativeAddress, RoutingTag, ScriptEngine,
    TxIn, TxOut,
};

const PK: [u8; 33] = [2u8; 33];

fn engine() -> NullScriptEngine {
    NullScriptEngine::new()
}

fn marker(kind: PayloadKind, data: &[u8]) -> TxOut {
    TxOut::new(0, NullScriptEngine::marker(kind.byte(), data))
}

fn pay(value: u64) -> TxOut {
    TxOut::new(value, NullScriptEngine::p2pkh(&[7; 20]))
}

fn tx(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> HostTx {
    HostTx {
        inputs,
        outputs,
        ..HostTx::default()
    }
}

fn entangle_info(index: u32) -> EntangleTxInfo {
    EntangleTxInfo {
        asset: AssetType::Doge,
        index,
        height: 100,
        amount: Amount::coins(10),
        ext_tx_hash: ForeignTxHash::from_raw(&[index as u8; 32]),
    }
}

fn registration() -> BeaconRegistration {
    BeaconRegistration {
        to_address: RoutingTag::from_value(12),
        staking_amount: Amount::coins(200),
        fee: 10,
        keep_time: 100,
        asset_flags: AssetFlags::new(AssetFlags::DOGE),
        whitelist: vec![],
        coinbase_addresses: vec![],
    }
}

// --- entangle / exchange ---

#[test]
fn plain_tx_is_not_special() {
    let t = tx(vec![NullScriptEngine::signed_input(&PK)], vec![pay(5)]);
    assert!(extract::entangle_infos(&t, &engine()).unwrap().is_empty());
    assert_eq!(extract::exchange_info(&t, &engine()).unwrap(), None);
    assert_eq!(extract::beacon_registration(&t, &engine()).unwrap(), None);
    assert_eq!(extract::special_kind(&t, &engine()), None);
}

#[test]
fn entangle_claims_collected_by_output_index() {
    let t = tx(
        vec![],
        vec![
            pay(5),
            marker(PayloadKind::Entangle, &entangle_info(1).to_bytes()),
            marker(PayloadKind::Entangle, &entangle_info(2).to_bytes()),
        ],
    );
    let infos = extract::entangle_infos(&t, &engine()).unwrap();
    assert_eq!(infos.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(infos[&2], entangle_info(2));
    assert_eq!(extract::special_kind(&t, &engine()), Some(PayloadKind::Entangle));
}

#[test]
fn valued_marker_output_rejected() {
    let mut out = marker(PayloadKind::Entangle, &entangle_info(0).to_bytes());
    out.value = 1;
    let t = tx(vec![], vec![out]);
    assert_eq!(
        extract::entangle_infos(&t, &engine()),
        Err(CodecError::NonZeroValue { index: 0, value: 1 })
    );
}

#[test]
fn exchange_only_read_from_first_output() {
    let info = ExchangeTxInfo {
        asset: AssetType::Ltc,
        index: 0,
        height: 9,
        beacon_id: 1,
        amount: Amount::coins(1),
        ext_tx_hash: ForeignTxHash::from_raw(&[4; 32]),
    };
    let first = tx(vec![], vec![marker(PayloadKind::Exchange, &info.to_bytes())]);
    assert_eq!(extract::exchange_info(&first, &engine()).unwrap(), Some(info.clone()));

    let second = tx(vec![], vec![pay(1), marker(PayloadKind::Exchange, &info.to_bytes())]);
    assert_eq!(extract::exchange_info(&second, &engine()).unwrap(), None);
}

// --- beacon records ---

#[test]
fn registration_carries_signer_identity() {
    let t = tx(
        vec![NullScriptEngine::signed_input(&PK)],
        vec![
            marker(PayloadKind::BeaconRegistration, &registration().to_bytes()),
            pay(200),
        ],
    );
    let signed = extract::beacon_registration(&t, &engine()).unwrap().unwrap();
    assert_eq!(signed.record, registration());
    assert_eq!(signed.pubkey, PK.to_vec());
    assert_eq!(signed.address, NullScriptEngine::address_for(&PK));
    assert_eq!(extract::special_kind(&t, &engine()), Some(PayloadKind::BeaconRegistration));
}

#[test]
fn registration_shape_enforced() {
    let payload = marker(PayloadKind::BeaconRegistration, &registration().to_bytes());
    let two_inputs = tx(
        vec![NullScriptEngine::signed_input(&PK), NullScriptEngine::signed_input(&PK)],
        vec![payload.clone(), pay(1)],
    );
    assert!(matches!(
        extract::beacon_registration(&two_inputs, &engine()),
        Err(CodecError::BadShape { .. })
    ));
    let one_output = tx(vec![NullScriptEngine::signed_input(&PK)], vec![payload.clone()]);
    assert!(matches!(
        extract::beacon_registration(&one_output, &engine()),
        Err(CodecError::BadShape { .. })
    ));
    let four_outputs = tx(
        vec![NullScriptEngine::signed_input(&PK)],
        vec![payload, pay(1), pay(1), pay(1)],
    );
    assert!(extract::beacon_registration(&four_outputs, &engine()).is_err());
}

#[test]
fn pledge_and_binding_extract() {
    let pledge = BeaconPledge {
        to_address: RoutingTag::from_value(12),
        staking_amount: Amount::coins(50),
    };
    let t = tx(
        vec![NullScriptEngine::witness_input(&PK)],
        vec![marker(PayloadKind::BeaconPledge, &pledge.to_bytes()), pay(50)],
    );
    assert_eq!(extract::beacon_pledge(&t, &engine()).unwrap().unwrap().record, pledge);

    let binding = CoinbaseBinding {
        to_address: RoutingTag::from_value(12),
        coinbase_addresses: vec![NativeAddress::new("miner")],
    };
    let t = tx(
        vec![NullScriptEngine::signed_input(&PK)],
        vec![marker(PayloadKind::CoinbaseBinding, &binding.to_bytes()), pay(0), pay(0)],
    );
    assert!(extract::coinbase_binding(&t, &engine()).is_err());
}

// --- burn ---

#[test]
fn burn_reads_amount_from_zero_address_output() {
    let info = BurnTxInfo {
        asset: AssetType::Btc,
        beacon_id: 4,
    };
    let zero = engine().pay_to_pubkey_hash(&ZERO_PUBKEY_HASH).unwrap();
    let t = tx(
        vec![NullScriptEngine::signed_input(&PK)],
        vec![marker(PayloadKind::Burn, &info.to_bytes()), TxOut::new(7_000, zero)],
    );
    let burn = extract::burn_request(&t, &engine()).unwrap().unwrap();
    assert_eq!(burn.info, info);
    assert_eq!(burn.amount, Amount::new(7_000));
    assert_eq!(burn.address, NullScriptEngine::address_for(&PK));
}

#[test]
fn burn_to_live_address_rejected() {
    let info = BurnTxInfo {
        asset: AssetType::Btc,
        beacon_id: 4,
    };
    let t = tx(
        vec![NullScriptEngine::signed_input(&PK)],
        vec![marker(PayloadKind::Burn, &info.to_bytes()), pay(7_000)],
    );
    assert!(matches!(
        extract::burn_request(&t, &engine()),
        Err(CodecError::BadShape { .. })
    ));
}

// --- proofs and snapshot ---

#[test]
fn proofs_extract_from_first_output() {
    let proof = BurnProofInfo {
        beacon_id: 1,
        height: 2,
        amount: Amount::new(3),
        address: NativeAddress::new("u"),
        asset: AssetType::Bch,
        tx_hash: ForeignTxHash::from_raw(&[5; 32]),
        out_index: 0,
        is_beacon: false,
    };
    let t = tx(vec![], vec![marker(PayloadKind::BurnProof, &proof.to_bytes())]);
    assert_eq!(extract::burn_proof(&t, &engine()).unwrap(), Some(proof));

    let wl = WhiteListProof {
        beacon_id: 1,
        asset: AssetType::Bsv,
        height: 3,
        tx_hash: ForeignTxHash::from_raw(&[6; 32]),
        in_index: 0,
        out_index: 1,
        amount: Amount::new(8),
    };
    let lone = tx(vec![], vec![marker(PayloadKind::WhiteListProof, &wl.to_bytes())]);
    assert!(extract::whitelist_proof(&lone, &engine()).is_err());
    let ok = tx(vec![], vec![marker(PayloadKind::WhiteListProof, &wl.to_bytes()), pay(0)]);
    assert_eq!(extract::whitelist_proof(&ok, &engine()).unwrap(), Some(wl));
}

#[test]
fn keeped_amount_read_from_marker() {
    let mut keeped = KeepedAmount::new();
    keeped.add(AssetType::Doge, Amount::coins(1)).unwrap();
    let out = marker(PayloadKind::KeepedAmount, &keeped.to_bytes());
    assert_eq!(extract::keeped_amount(&out, &engine()).unwrap(), Some(keeped));
    assert_eq!(extract::keeped_amount(&pay(1), &engine()).unwrap(), None);
}
