use std::sync::Arc;

use entangle_ledger::{EntangleState, NewBeacon, StateError, WhiteListEntry};
use entangle_nullables::{NullForeignChain, NullKvStore, NullScriptEngine};
use entangle_store::EntangleCache;
use entangle_transactions::{
    BeaconPledge, BeaconRegistration, BurnProofInfo, BurnRequest, BurnTxInfo, CoinbaseBinding,
    ExchangeTxInfo, PayloadKind, Record, WhiteListProof, WhiteUnit,
};
use entangle_types::{
    Amount, AssetFlags, AssetType, EntangleParams, ErrorKind, ForeignChainClient, ForeignTx,
    ForeignTxHash, HostTx, NativeAddress, RoutingTag, TxOut, COIN,
};
use entangle_verification::{ClientPool, ForeignClients, RetryPolicy, Verifier, VerifyError};

const BEACON_PK: [u8; 33] = [2u8; 33];
const USER_PK: [u8; 33] = [5u8; 33];
const WHITE_PK: [u8; 64] = [9u8; 64];

fn no_wait() -> RetryPolicy {
    RetryPolicy {
        attempts: 2,
        backoff_ms: 0,
    }
}

struct Fixture {
    doge: Arc<NullForeignChain>,
    cache: EntangleCache,
    verifier: Verifier,
}

fn fixture() -> Fixture {
    let doge = Arc::new(NullForeignChain::new());
    let cache = EntangleCache::new(Arc::new(NullKvStore::new()));
    let clients = ForeignClients::new().with(ClientPool::new(
        AssetType::Doge,
        vec![doge.clone() as Arc<dyn ForeignChainClient>],
        no_wait(),
    ));
    let mut params = EntangleParams::default();
    params.doge.pool = Some(hex::encode(pool_script()));
    let verifier = Verifier::new(
        clients,
        Arc::new(NullScriptEngine::new()),
        Some(cache.clone()),
        params,
    );
    Fixture {
        doge,
        cache,
        verifier,
    }
}

fn beacon_address() -> NativeAddress {
    NullScriptEngine::address_for(&BEACON_PK)
}

fn user_address() -> NativeAddress {
    NullScriptEngine::address_for(&USER_PK)
}

fn state_with_beacon() -> EntangleState {
    let mut s = EntangleState::new(EntangleParams::default());
    s.register_beacon(NewBeacon {
        address: beacon_address(),
        to_address: RoutingTag::from_value(12),
        pubkey: BEACON_PK.to_vec(),
        staking_amount: Amount::coins(1_000),
        fee: 1_000,
        keep_time: 100,
        asset_flags: AssetFlags::new(AssetFlags::DOGE),
        whitelist: vec![WhiteListEntry::new(
            WhiteUnit::new(AssetType::Doge, WHITE_PK.to_vec()),
            NullScriptEngine::address_for(&WHITE_PK),
        )],
        coinbase_addresses: vec![],
    })
    .unwrap();
    s
}

fn host_tx(signer: &[u8], outputs: Vec<TxOut>) -> HostTx {
    HostTx {
        inputs: vec![NullScriptEngine::signed_input(signer)],
        outputs,
        ..HostTx::default()
    }
}

fn marker(kind: PayloadKind, data: &[u8]) -> TxOut {
    TxOut::new(0, NullScriptEngine::marker(kind.byte(), data))
}

fn routing_output(tag: u64, value: u64) -> TxOut {
    let tag = RoutingTag::from_value(tag);
    let hash: [u8; 20] = tag.as_bytes().try_into().unwrap();
    TxOut::new(value, NullScriptEngine::p2pkh(&hash))
}

/// Where beacon 1 holds DOGE: a payment to its whitelisted key.
fn custody_script() -> Vec<u8> {
    NullScriptEngine::p2pkh(&NullScriptEngine::key_hash(&WHITE_PK))
}

fn pool_script() -> Vec<u8> {
    NullScriptEngine::p2sh(&[1; 20])
}

fn pay_to(chain: &NullForeignChain, seed: u8, value: u64, height: u64, to: Vec<u8>) -> ForeignTxHash {
    let hash = ForeignTxHash::from_raw(&[seed; 32]);
    chain.include(
        ForeignTx {
            hash: hash.clone(),
            inputs: vec![NullScriptEngine::signed_input(&USER_PK)],
            outputs: vec![TxOut::new(value, to)],
        },
        height,
    );
    hash
}

/// A foreign deposit of `value` by the user to beacon 1, in the block at
/// `height`.
fn deposit(chain: &NullForeignChain, seed: u8, value: u64, height: u64) -> ForeignTxHash {
    pay_to(chain, seed, value, height, custody_script())
}

fn exchange_tx(hash: &ForeignTxHash, amount: u64, height: u64) -> HostTx {
    let info = ExchangeTxInfo {
        asset: AssetType::Doge,
        index: 0,
        height,
        beacon_id: 1,
        amount: Amount::from(amount),
        ext_tx_hash: hash.clone(),
    };
    host_tx(&USER_PK, vec![marker(PayloadKind::Exchange, &info.to_bytes())])
}

// --- client pool ---

#[test]
fn pool_fails_over_to_next_endpoint() {
    let down = Arc::new(NullForeignChain::new());
    down.set_unreachable(true);
    let up = Arc::new(NullForeignChain::new());
    up.set_best_height(42);
    let pool = ClientPool::new(
        AssetType::Ltc,
        vec![
            down.clone() as Arc<dyn ForeignChainClient>,
            up.clone() as Arc<dyn ForeignChainClient>,
        ],
        no_wait(),
    );
    assert_eq!(pool.call("best", |c| c.get_best_height()).unwrap(), 42);
    assert_eq!(down.calls(), 1);
    assert_eq!(up.calls(), 1);
}

#[test]
fn exhausted_pool_is_external_evidence() {
    let down = Arc::new(NullForeignChain::new());
    down.set_unreachable(true);
    let pool = ClientPool::new(
        AssetType::Btc,
        vec![down.clone() as Arc<dyn ForeignChainClient>],
        no_wait(),
    );
    let err = pool.call("best", |c| c.get_best_height()).unwrap_err();
    assert!(matches!(err, VerifyError::Rpc { asset: AssetType::Btc, .. }));
    assert_eq!(err.kind(), ErrorKind::ExternalEvidence);
    assert_eq!(down.calls(), 2);
}

#[test]
fn unconfigured_asset_has_no_endpoints() {
    let f = fixture();
    let err = f.verifier.clients().pool(AssetType::Bsv).err().unwrap();
    assert!(matches!(err, VerifyError::NoEndpoints(AssetType::Bsv)));
}

#[test]
fn retry_policy_defaults_from_empty_toml() {
    let policy: RetryPolicy = toml::from_str("").unwrap();
    assert_eq!(policy, RetryPolicy::default());
}

// --- foreign deposit ---

#[test]
fn mature_deposit_returns_signer() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(103);
    let pk = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            100,
            Amount::from(5_000u64),
            &[custody_script()],
        )
        .unwrap();
    assert_eq!(pk, USER_PK.to_vec());
}

#[test]
fn young_deposit_is_deferred() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(102);
    let err = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            100,
            Amount::from(5_000u64),
            &[custody_script()],
        )
        .unwrap_err();
    assert!(matches!(err, VerifyError::Immature { confirmations: 2, .. }));
    assert!(err.kind().is_retryable());
}

#[test]
fn wrong_amount_is_rejected() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(200);
    let err = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            100,
            Amount::from(5_001u64),
            &[custody_script()],
        )
        .unwrap_err();
    assert!(matches!(err, VerifyError::AmountMismatch { actual: 5_000, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn deposit_must_be_in_claimed_block() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    deposit(&f.doge, 2, 1, 90);
    f.doge.set_best_height(200);
    let err = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            90,
            Amount::from(5_000u64),
            &[custody_script()],
        )
        .unwrap_err();
    assert!(matches!(err, VerifyError::NotInBlock { height: 90, .. }));
}

#[test]
fn output_index_out_of_range() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    let err = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            1,
            100,
            Amount::from(5_000u64),
            &[custody_script()],
        )
        .unwrap_err();
    assert!(matches!(err, VerifyError::OutputIndex { index: 1, outputs: 1 }));
}

#[test]
fn non_standard_deposit_script_is_rejected() {
    let f = fixture();
    let hash = ForeignTxHash::from_raw(&[7; 32]);
    f.doge.include(
        ForeignTx {
            hash: hash.clone(),
            inputs: vec![NullScriptEngine::signed_input(&USER_PK)],
            outputs: vec![TxOut::new(10, vec![0x51])],
        },
        100,
    );
    f.doge.set_best_height(200);
    let err = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            100,
            Amount::from(10u64),
            &[custody_script()],
        )
        .unwrap_err();
    assert!(matches!(err, VerifyError::WrongScriptClass(_)));
}

// --- exchange / entangle ---

#[test]
fn exchange_tx_credits_depositor() {
    let f = fixture();
    let state = state_with_beacon();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(200);
    let v = f
        .verifier
        .verify_exchange_tx(&exchange_tx(&hash, 5_000, 100), &state)
        .unwrap();
    assert_eq!(v.beacon_id, 1);
    assert_eq!(v.address, user_address());
    assert_eq!(v.amount, Amount::from(5_000u64));
    assert_eq!(v.ext_tx_hash, hash);
}

#[test]
fn deposit_to_someone_else_earns_nothing() {
    let f = fixture();
    let state = state_with_beacon();
    let own = NullScriptEngine::p2pkh(&NullScriptEngine::key_hash(&USER_PK));
    let hash = pay_to(&f.doge, 1, 5_000, 100, own);
    f.doge.set_best_height(103);
    let err = f
        .verifier
        .verify_exchange_tx(&exchange_tx(&hash, 5_000, 100), &state)
        .unwrap_err();
    assert!(matches!(
        err,
        VerifyError::WrongPayee { asset: AssetType::Doge, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn exchange_deposit_must_reach_the_named_beacon() {
    let f = fixture();
    let state = state_with_beacon();
    let hash = pay_to(&f.doge, 1, 5_000, 100, pool_script());
    f.doge.set_best_height(200);
    assert!(matches!(
        f.verifier
            .verify_exchange_tx(&exchange_tx(&hash, 5_000, 100), &state),
        Err(VerifyError::WrongPayee { .. })
    ));
}

#[test]
fn entangled_hash_is_a_conflict() {
    let f = fixture();
    let state = state_with_beacon();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(200);
    f.cache
        .mark_entangled(&[(hash.clone(), AssetType::Doge)])
        .unwrap();
    let err = f
        .verifier
        .verify_exchange_tx(&exchange_tx(&hash, 5_000, 100), &state)
        .unwrap_err();
    assert!(matches!(err, VerifyError::AlreadyEntangled { .. }));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(f.doge.calls(), 0);
}

#[test]
fn exchange_to_unknown_beacon_fails() {
    let f = fixture();
    let state = EntangleState::new(EntangleParams::default());
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(200);
    let err = f
        .verifier
        .verify_exchange_tx(&exchange_tx(&hash, 5_000, 100), &state)
        .unwrap_err();
    assert!(matches!(err, VerifyError::State(StateError::NoSuchBeacon(_))));
}

fn legacy_claim(hash: ForeignTxHash) -> HostTx {
    let info = ExchangeTxInfo {
        asset: AssetType::Doge,
        index: 0,
        height: 100,
        beacon_id: 0,
        amount: Amount::from(5_000u64),
        ext_tx_hash: hash,
    }
    .as_entangle();
    host_tx(&USER_PK, vec![marker(PayloadKind::Entangle, &info.to_bytes())])
}

#[test]
fn legacy_deposit_must_pay_the_pool() {
    let f = fixture();
    let hash = deposit(&f.doge, 1, 5_000, 100);
    f.doge.set_best_height(200);
    assert!(matches!(
        f.verifier.verify_entangle_tx(&legacy_claim(hash)),
        Err(VerifyError::WrongPayee { .. })
    ));
}

#[test]
fn legacy_deposit_without_pool_is_refused() {
    let f = fixture();
    let clients = ForeignClients::new().with(ClientPool::new(
        AssetType::Doge,
        vec![f.doge.clone() as Arc<dyn ForeignChainClient>],
        no_wait(),
    ));
    let verifier = Verifier::new(
        clients,
        Arc::new(NullScriptEngine::new()),
        None,
        EntangleParams::default(),
    );
    let hash = pay_to(&f.doge, 1, 5_000, 100, pool_script());
    f.doge.set_best_height(200);
    let err = verifier.verify_entangle_tx(&legacy_claim(hash)).unwrap_err();
    assert!(matches!(err, VerifyError::NoPool(AssetType::Doge)));
    assert_eq!(f.doge.calls(), 0);
}

#[test]
fn plain_tx_is_not_an_exchange() {
    let f = fixture();
    let t = host_tx(&USER_PK, vec![TxOut::new(1, NullScriptEngine::p2pkh(&[3; 20]))]);
    let err = f.verifier.verify_exchange_tx(&t, &state_with_beacon()).unwrap_err();
    assert!(matches!(err, VerifyError::NotSpecial(PayloadKind::Exchange)));
}

#[test]
fn legacy_entangle_rejects_hash_claimed_twice() {
    let f = fixture();
    let hash = pay_to(&f.doge, 1, 5_000, 100, pool_script());
    f.doge.set_best_height(200);
    let info = ExchangeTxInfo {
        asset: AssetType::Doge,
        index: 0,
        height: 100,
        beacon_id: 0,
        amount: Amount::from(5_000u64),
        ext_tx_hash: hash,
    }
    .as_entangle();
    let one = host_tx(&USER_PK, vec![marker(PayloadKind::Entangle, &info.to_bytes())]);
    let verified = f.verifier.verify_entangle_tx(&one).unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].address, user_address());

    let twice = host_tx(
        &USER_PK,
        vec![
            marker(PayloadKind::Entangle, &info.to_bytes()),
            marker(PayloadKind::Entangle, &info.to_bytes()),
        ],
    );
    assert!(matches!(
        f.verifier.verify_entangle_tx(&twice),
        Err(VerifyError::AlreadyEntangled { .. })
    ));
}

// --- beacon lifecycle ---

fn registration(tag: u64) -> BeaconRegistration {
    BeaconRegistration {
        to_address: RoutingTag::from_value(tag),
        staking_amount: Amount::coins(200),
        fee: 100,
        keep_time: 50,
        asset_flags: AssetFlags::new(AssetFlags::DOGE | AssetFlags::LTC),
        whitelist: vec![WhiteUnit::new(AssetType::Doge, WHITE_PK.to_vec())],
        coinbase_addresses: vec![NullScriptEngine::address_for(&[4; 33])],
    }
}

fn registration_tx(signer: &[u8], reg: &BeaconRegistration, paid: u64) -> HostTx {
    let tag = reg.to_address.numeric_value().unwrap();
    host_tx(
        signer,
        vec![
            marker(PayloadKind::BeaconRegistration, &reg.to_bytes()),
            routing_output(tag, paid),
        ],
    )
}

#[test]
fn registration_verifies_and_registers() {
    let f = fixture();
    let mut state = EntangleState::new(EntangleParams::default());
    let reg = registration(20);
    let tx = registration_tx(&USER_PK, &reg, 200 * COIN as u64);
    let verified = f.verifier.verify_beacon_registration(&tx, &state).unwrap();
    assert_eq!(verified.address, user_address());

    let req = f.verifier.new_beacon(&verified).unwrap();
    assert_eq!(req.whitelist[0].address, NullScriptEngine::address_for(&WHITE_PK));
    let id = state.register_beacon(req).unwrap();
    assert_eq!(state.beacon(id).unwrap().to_address, RoutingTag::from_value(20));

    let again = f.verifier.verify_beacon_registration(&tx, &state).unwrap_err();
    assert!(matches!(again, VerifyError::State(StateError::RepeatRegister(_))));
}

#[test]
fn registration_payment_must_match_stake() {
    let f = fixture();
    let state = EntangleState::new(EntangleParams::default());
    let reg = registration(20);
    let tx = registration_tx(&USER_PK, &reg, 1);
    assert!(matches!(
        f.verifier.verify_beacon_registration(&tx, &state),
        Err(VerifyError::StakeMismatch { output: 1, .. })
    ));
}

#[test]
fn registration_tag_outside_reserved_range() {
    let f = fixture();
    let state = EntangleState::new(EntangleParams::default());
    let reg = registration(100);
    let tx = registration_tx(&USER_PK, &reg, 200 * COIN as u64);
    assert!(matches!(
        f.verifier.verify_beacon_registration(&tx, &state),
        Err(VerifyError::RoutingTagRange(100))
    ));
}

#[test]
fn registration_bounds_are_validation_errors() {
    let f = fixture();
    let state = EntangleState::new(EntangleParams::default());
    let paid = 200 * COIN as u64;

    let mut reg = registration(20);
    reg.fee = 100_001;
    let err = f
        .verifier
        .verify_beacon_registration(&registration_tx(&USER_PK, &reg, paid), &state)
        .unwrap_err();
    assert!(matches!(err, VerifyError::State(StateError::InvalidParam("fee"))));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut reg = registration(20);
    reg.whitelist = vec![WhiteUnit::new(AssetType::Doge, vec![1; 33])];
    assert!(matches!(
        f.verifier
            .verify_beacon_registration(&registration_tx(&USER_PK, &reg, paid), &state),
        Err(VerifyError::State(StateError::InvalidParam("whitelist")))
    ));

    let mut reg = registration(20);
    reg.coinbase_addresses = (0..5u8)
        .map(|i| NullScriptEngine::address_for(&[i; 33]))
        .collect();
    assert!(matches!(
        f.verifier
            .verify_beacon_registration(&registration_tx(&USER_PK, &reg, paid), &state),
        Err(VerifyError::State(StateError::TooManyCoinbase(4)))
    ));
}

#[test]
fn registration_cannot_reuse_a_tag() {
    let f = fixture();
    let state = state_with_beacon();
    let reg = registration(12);
    let tx = registration_tx(&USER_PK, &reg, 200 * COIN as u64);
    assert!(matches!(
        f.verifier.verify_beacon_registration(&tx, &state),
        Err(VerifyError::State(StateError::RepeatToAddress(_)))
    ));
}

fn pledge_tx(signer: &[u8], tag: u64, coins: u64) -> HostTx {
    let pledge = BeaconPledge {
        to_address: RoutingTag::from_value(tag),
        staking_amount: Amount::coins(coins as u128),
    };
    host_tx(
        signer,
        vec![
            marker(PayloadKind::BeaconPledge, &pledge.to_bytes()),
            routing_output(tag, coins * COIN as u64),
        ],
    )
}

#[test]
fn pledge_needs_the_owning_beacon() {
    let f = fixture();
    let state = state_with_beacon();
    let (id, pledge) = f
        .verifier
        .verify_pledge(&pledge_tx(&BEACON_PK, 12, 150), &state)
        .unwrap();
    assert_eq!(id, 1);
    assert_eq!(pledge.record.staking_amount, Amount::coins(150));

    assert!(matches!(
        f.verifier.verify_pledge(&pledge_tx(&BEACON_PK, 13, 150), &state),
        Err(VerifyError::State(StateError::ToAddressMismatch(1)))
    ));
    assert!(matches!(
        f.verifier.verify_pledge(&pledge_tx(&USER_PK, 12, 150), &state),
        Err(VerifyError::State(StateError::NoSuchBeacon(_)))
    ));
}

#[test]
fn coinbase_binding_checks_addresses() {
    let f = fixture();
    let state = state_with_beacon();
    let binding = CoinbaseBinding {
        to_address: RoutingTag::from_value(12),
        coinbase_addresses: vec![NullScriptEngine::address_for(&[6; 33])],
    };
    let tx = host_tx(
        &BEACON_PK,
        vec![
            marker(PayloadKind::CoinbaseBinding, &binding.to_bytes()),
            routing_output(12, 0),
        ],
    );
    let (id, _) = f.verifier.verify_coinbase_binding(&tx, &state).unwrap();
    assert_eq!(id, 1);

    let bad = CoinbaseBinding {
        to_address: RoutingTag::from_value(12),
        coinbase_addresses: vec![NativeAddress::from("not-an-address")],
    };
    let tx = host_tx(
        &BEACON_PK,
        vec![
            marker(PayloadKind::CoinbaseBinding, &bad.to_bytes()),
            routing_output(12, 0),
        ],
    );
    assert!(matches!(
        f.verifier.verify_coinbase_binding(&tx, &state),
        Err(VerifyError::Script(_))
    ));
}

// --- burns and proofs ---

/// The user entangles 1000 DOGE with beacon 1 and burns 10 native coins
/// at host height 20.
fn state_with_burn() -> EntangleState {
    let mut s = state_with_beacon();
    s.add_entangle_item(&user_address(), AssetType::Doge, 1, 10, Amount::coins(1_000))
        .unwrap();
    s.burn_asset(&user_address(), AssetType::Doge, 1, 20, Amount::coins(10))
        .unwrap();
    s
}

fn burn_request(coins: u128) -> BurnRequest {
    BurnRequest {
        info: BurnTxInfo {
            asset: AssetType::Doge,
            beacon_id: 1,
        },
        address: user_address(),
        amount: Amount::coins(coins),
    }
}

#[test]
fn burn_limited_by_origin_amount() {
    let f = fixture();
    let state = state_with_burn();
    let origin = state
        .entity(1, &user_address(), AssetType::Doge)
        .unwrap()
        .origin_amount;
    f.verifier.verify_burn(&burn_request(1), &state).unwrap();
    let too_much = BurnRequest {
        amount: origin + Amount::new(1),
        ..burn_request(0)
    };
    assert!(matches!(
        f.verifier.verify_burn(&too_much, &state),
        Err(VerifyError::BurnExceedsOrigin { .. })
    ));
}

#[test]
fn burn_without_position_fails() {
    let f = fixture();
    let state = state_with_beacon();
    assert!(matches!(
        f.verifier.verify_burn(&burn_request(1), &state),
        Err(VerifyError::State(StateError::NoSuchUserPosition { .. }))
    ));
}

fn owed(state: &EntangleState) -> Amount {
    state
        .entity(1, &user_address(), AssetType::Doge)
        .unwrap()
        .burns
        .items[0]
        .owed()
}

fn payout_tx(chain: &NullForeignChain, signer: &[u8]) -> ForeignTxHash {
    let hash = ForeignTxHash::from_raw(&[0x77; 32]);
    chain.include(
        ForeignTx {
            hash: hash.clone(),
            inputs: vec![NullScriptEngine::signed_input(signer)],
            outputs: vec![TxOut::new(1, NullScriptEngine::p2pkh(&[8; 20]))],
        },
        300,
    );
    hash
}

fn beacon_proof(tx_hash: ForeignTxHash, amount: Amount) -> BurnProofInfo {
    BurnProofInfo {
        beacon_id: 1,
        height: 20,
        amount,
        address: user_address(),
        asset: AssetType::Doge,
        tx_hash,
        out_index: 0,
        is_beacon: true,
    }
}

#[test]
fn beacon_burn_proof_matches_item() {
    let f = fixture();
    let state = state_with_burn();
    let hash = payout_tx(&f.doge, &BEACON_PK);
    let proof = f
        .verifier
        .verify_burn_proof(&beacon_proof(hash, owed(&state)), &state, 30)
        .unwrap();
    assert_eq!(proof.item.height, 20);
    assert_eq!(proof.out_height, 300);
}

#[test]
fn beacon_proof_signed_by_someone_else_fails() {
    let f = fixture();
    let state = state_with_burn();
    let hash = payout_tx(&f.doge, &USER_PK);
    assert!(matches!(
        f.verifier
            .verify_burn_proof(&beacon_proof(hash, owed(&state)), &state, 30),
        Err(VerifyError::NotBeaconSigner { beacon_id: 1 })
    ));
}

#[test]
fn user_complaint_needs_no_foreign_call() {
    let f = fixture();
    let state = state_with_burn();
    let complaint = BurnProofInfo {
        is_beacon: false,
        ..beacon_proof(ForeignTxHash::from_raw(&[0; 32]), Amount::ZERO)
    };
    let limit = state.params().limit_redeem_height;
    let proof = f
        .verifier
        .verify_burn_proof(&complaint, &state, 20 + limit + 1)
        .unwrap();
    assert_eq!(proof.out_height, 0);
    assert_eq!(f.doge.calls(), 0);
}

fn whitelist_proof(tx_hash: ForeignTxHash) -> WhiteListProof {
    WhiteListProof {
        beacon_id: 1,
        asset: AssetType::Doge,
        height: 300,
        tx_hash,
        in_index: 0,
        out_index: 0,
        amount: Amount::coins(1),
    }
}

fn beacon_spend(chain: &NullForeignChain, seed: u8, to: Vec<u8>) -> ForeignTxHash {
    let hash = ForeignTxHash::from_raw(&[seed; 32]);
    chain.include(
        ForeignTx {
            hash: hash.clone(),
            inputs: vec![NullScriptEngine::signed_input(&BEACON_PK)],
            outputs: vec![TxOut::new(100, to)],
        },
        300,
    );
    hash
}

#[test]
fn whitelist_proof_accepts_transfer_to_stranger() {
    let f = fixture();
    let state = state_with_beacon();
    let hash = beacon_spend(&f.doge, 0x31, NullScriptEngine::p2pkh(&[8; 20]));
    f.verifier
        .verify_whitelist_proof(&whitelist_proof(hash), &state)
        .unwrap();
}

#[test]
fn transfer_to_whitelisted_key_is_not_a_violation() {
    let f = fixture();
    let state = state_with_beacon();
    let own = NullScriptEngine::p2pkh(&NullScriptEngine::key_hash(&WHITE_PK));
    let hash = beacon_spend(&f.doge, 0x32, own);
    assert!(matches!(
        f.verifier.verify_whitelist_proof(&whitelist_proof(hash), &state),
        Err(VerifyError::IllegalTransfer { beacon_id: 1, asset: AssetType::Doge })
    ));
}

#[test]
fn whitelist_proof_is_accepted_once() {
    let f = fixture();
    let mut state = state_with_beacon();
    let hash = beacon_spend(&f.doge, 0x33, NullScriptEngine::p2pkh(&[8; 20]));
    let proof = whitelist_proof(hash);
    f.verifier.verify_whitelist_proof(&proof, &state).unwrap();
    state.finish_whitelist_proof(&proof).unwrap();
    let err = f.verifier.verify_whitelist_proof(&proof, &state).unwrap_err();
    assert!(matches!(err, VerifyError::State(StateError::RepeatProof(300))));
}

#[test]
fn whitelist_proof_input_must_exist() {
    let f = fixture();
    let state = state_with_beacon();
    let hash = beacon_spend(&f.doge, 0x34, NullScriptEngine::p2pkh(&[8; 20]));
    let proof = WhiteListProof {
        in_index: 3,
        ..whitelist_proof(hash)
    };
    assert!(matches!(
        f.verifier.verify_whitelist_proof(&proof, &state),
        Err(VerifyError::InputIndex { index: 3, inputs: 1 })
    ));
}

#[test]
fn signer_from_witness_counts() {
    let f = fixture();
    let hash = ForeignTxHash::from_raw(&[0x41; 32]);
    f.doge.include(
        ForeignTx {
            hash: hash.clone(),
            inputs: vec![NullScriptEngine::witness_input(&USER_PK)],
            outputs: vec![TxOut::new(9, custody_script())],
        },
        50,
    );
    f.doge.set_best_height(60);
    let pk = f
        .verifier
        .verify_foreign_deposit(
            AssetType::Doge,
            &hash,
            0,
            50,
            Amount::from(9u64),
            &[custody_script()],
        )
        .unwrap();
    assert_eq!(pk, USER_PK.to_vec());
}
