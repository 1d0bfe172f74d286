//! Structured beacon, burn and proof records.

use entangle_types::{Amount, AssetFlags, AssetType, ForeignTxHash, NativeAddress, RoutingTag};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::field::{FieldReader, FieldWriter, Record, Value};
use crate::payload::PayloadKind;

fn asset_from_u64(field: &'static str, raw: u64) -> Result<AssetType, CodecError> {
    u8::try_from(raw)
        .ok()
        .and_then(AssetType::from_tag)
        .ok_or_else(|| CodecError::InvalidValue {
            field,
            reason: format!("unknown asset tag {raw}"),
        })
}

fn u32_from_u64(field: &'static str, raw: u64) -> Result<u32, CodecError> {
    u32::try_from(raw).map_err(|_| CodecError::InvalidValue {
        field,
        reason: format!("{raw} exceeds u32"),
    })
}

fn addresses_value(addresses: &[NativeAddress]) -> Value {
    Value::List(
        addresses
            .iter()
            .map(|a| Value::Str(a.as_str().to_owned()))
            .collect(),
    )
}

fn addresses_from(field: &'static str, items: Vec<Value>) -> Result<Vec<NativeAddress>, CodecError> {
    items
        .into_iter()
        .map(|v| v.into_string(field).map(NativeAddress::new))
        .collect()
}

/// A foreign public key exempt from entanglement pricing.
///
/// The asset is kept as its raw tag so that unknown tags survive decoding
/// and are rejected by validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteUnit {
    pub asset: u8,
    pub pubkey: Vec<u8>,
}

impl WhiteUnit {
    pub fn new(asset: AssetType, pubkey: Vec<u8>) -> Self {
        Self {
            asset: asset.tag(),
            pubkey,
        }
    }

    pub fn asset_type(&self) -> Option<AssetType> {
        AssetType::from_tag(self.asset)
    }

    fn to_value(&self) -> Value {
        Value::List(vec![
            Value::U64(self.asset as u64),
            Value::Bytes(self.pubkey.clone()),
        ])
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        const FIELD: &str = "whitelist";
        let mut parts = value.into_list(FIELD)?.into_iter();
        let (Some(asset), Some(pubkey), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CodecError::InvalidValue {
                field: FIELD,
                reason: "entry must hold asset and key".into(),
            });
        };
        let asset = asset.into_u64(FIELD)?;
        let asset = u8::try_from(asset).map_err(|_| CodecError::InvalidValue {
            field: FIELD,
            reason: format!("asset {asset} exceeds u8"),
        })?;
        Ok(Self {
            asset,
            pubkey: pubkey.into_bytes(FIELD)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconRegistration {
    pub to_address: RoutingTag,
    pub staking_amount: Amount,
    pub fee: u64,
    pub keep_time: u64,
    pub asset_flags: AssetFlags,
    pub whitelist: Vec<WhiteUnit>,
    pub coinbase_addresses: Vec<NativeAddress>,
}

impl Record for BeaconRegistration {
    const KIND: PayloadKind = PayloadKind::BeaconRegistration;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("to_address", Value::Bytes(self.to_address.as_bytes().to_vec()))
            .field("staking_amount", Value::BigInt(self.staking_amount))
            .field("fee", Value::U64(self.fee))
            .field("keep_time", Value::U64(self.keep_time))
            .field("asset_flags", Value::U64(self.asset_flags.bits() as u64))
            .field(
                "whitelist",
                Value::List(self.whitelist.iter().map(WhiteUnit::to_value).collect()),
            )
            .field("coinbase_addresses", addresses_value(&self.coinbase_addresses));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let to_address = RoutingTag::new(r.bytes("to_address")?);
        let staking_amount = r.amount("staking_amount")?;
        let fee = r.u64("fee")?;
        let keep_time = r.u64("keep_time")?;
        let asset_flags = AssetFlags::new(u32_from_u64("asset_flags", r.u64("asset_flags")?)?);
        let whitelist = r
            .list("whitelist")?
            .into_iter()
            .map(WhiteUnit::from_value)
            .collect::<Result<_, _>>()?;
        let coinbase_addresses = addresses_from("coinbase_addresses", r.list("coinbase_addresses")?)?;
        Ok(Self {
            to_address,
            staking_amount,
            fee,
            keep_time,
            asset_flags,
            whitelist,
            coinbase_addresses,
        })
    }
}

/// Extra collateral for an existing beacon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconPledge {
    pub to_address: RoutingTag,
    pub staking_amount: Amount,
}

impl Record for BeaconPledge {
    const KIND: PayloadKind = PayloadKind::BeaconPledge;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("to_address", Value::Bytes(self.to_address.as_bytes().to_vec()))
            .field("staking_amount", Value::BigInt(self.staking_amount));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            to_address: RoutingTag::new(r.bytes("to_address")?),
            staking_amount: r.amount("staking_amount")?,
        })
    }
}

/// Binds mining addresses to a beacon for the difficulty bonus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseBinding {
    pub to_address: RoutingTag,
    pub coinbase_addresses: Vec<NativeAddress>,
}

impl Record for CoinbaseBinding {
    const KIND: PayloadKind = PayloadKind::CoinbaseBinding;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("to_address", Value::Bytes(self.to_address.as_bytes().to_vec()))
            .field("coinbase_addresses", addresses_value(&self.coinbase_addresses));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            to_address: RoutingTag::new(r.bytes("to_address")?),
            coinbase_addresses: addresses_from("coinbase_addresses", r.list("coinbase_addresses")?)?,
        })
    }
}

/// Which beacon should redeem a burn, and in which foreign asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTxInfo {
    pub asset: AssetType,
    pub beacon_id: u64,
}

impl Record for BurnTxInfo {
    const KIND: PayloadKind = PayloadKind::Burn;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("asset", Value::U64(self.asset.tag() as u64))
            .field("beacon_id", Value::U64(self.beacon_id));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            asset: asset_from_u64("asset", r.u64("asset")?)?,
            beacon_id: r.u64("beacon_id")?,
        })
    }
}

/// Evidence about a burn's redemption on the foreign chain.
///
/// Beacons submit it to show they paid; users submit it to dispute a short
/// or late payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnProofInfo {
    pub beacon_id: u64,
    /// Host height of the burn being answered.
    pub height: u64,
    /// Foreign amount actually paid.
    pub amount: Amount,
    pub address: NativeAddress,
    pub asset: AssetType,
    pub tx_hash: ForeignTxHash,
    pub out_index: u64,
    pub is_beacon: bool,
}

impl Record for BurnProofInfo {
    const KIND: PayloadKind = PayloadKind::BurnProof;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("beacon_id", Value::U64(self.beacon_id))
            .field("height", Value::U64(self.height))
            .field("amount", Value::BigInt(self.amount))
            .field("address", Value::Str(self.address.as_str().to_owned()))
            .field("asset", Value::U64(self.asset.tag() as u64))
            .field("tx_hash", Value::Str(self.tx_hash.as_str().to_owned()))
            .field("out_index", Value::U64(self.out_index))
            .field("is_beacon", Value::Bool(self.is_beacon));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            beacon_id: r.u64("beacon_id")?,
            height: r.u64("height")?,
            amount: r.amount("amount")?,
            address: NativeAddress::new(r.string("address")?),
            asset: asset_from_u64("asset", r.u64("asset")?)?,
            tx_hash: ForeignTxHash::new(r.string("tx_hash")?),
            out_index: r.u64("out_index")?,
            is_beacon: r.bool("is_beacon")?,
        })
    }
}

/// Claim that a beacon moved custody funds to a non-whitelisted key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteListProof {
    pub beacon_id: u64,
    pub asset: AssetType,
    /// Foreign height of the offending transaction.
    pub height: u64,
    pub tx_hash: ForeignTxHash,
    pub in_index: u64,
    pub out_index: u64,
    pub amount: Amount,
}

impl Record for WhiteListProof {
    const KIND: PayloadKind = PayloadKind::WhiteListProof;

    fn write_fields(&self, w: &mut FieldWriter) {
        w.field("beacon_id", Value::U64(self.beacon_id))
            .field("asset", Value::U64(self.asset.tag() as u64))
            .field("height", Value::U64(self.height))
            .field("tx_hash", Value::Str(self.tx_hash.as_str().to_owned()))
            .field("in_index", Value::U64(self.in_index))
            .field("out_index", Value::U64(self.out_index))
            .field("amount", Value::BigInt(self.amount));
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            beacon_id: r.u64("beacon_id")?,
            asset: asset_from_u64("asset", r.u64("asset")?)?,
            height: r.u64("height")?,
            tx_hash: ForeignTxHash::new(r.string("tx_hash")?),
            in_index: r.u64("in_index")?,
            out_index: r.u64("out_index")?,
            amount: r.amount("amount")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> BeaconRegistration {
        BeaconRegistration {
            to_address: RoutingTag::from_value(42),
            staking_amount: Amount::coins(1_000),
            fee: 100,
            keep_time: 500,
            asset_flags: AssetFlags::new(AssetFlags::DOGE | AssetFlags::BTC),
            whitelist: vec![WhiteUnit::new(AssetType::Doge, vec![7; 64])],
            coinbase_addresses: vec![NativeAddress::new("miner-a"), NativeAddress::new("miner-b")],
        }
    }

    // --- roundtrip ---

    #[test]
    fn registration_roundtrips() {
        let r = registration();
        assert_eq!(BeaconRegistration::from_bytes(&r.to_bytes()), Ok(r));
    }

    #[test]
    fn burn_proof_roundtrips() {
        let p = BurnProofInfo {
            beacon_id: 3,
            height: 1_000,
            amount: Amount::new(99),
            address: NativeAddress::new("user"),
            asset: AssetType::Ltc,
            tx_hash: ForeignTxHash::from_raw(&[1; 32]),
            out_index: 2,
            is_beacon: true,
        };
        assert_eq!(BurnProofInfo::from_bytes(&p.to_bytes()), Ok(p));
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(registration().to_bytes(), registration().to_bytes());
    }

    // --- rejection ---

    #[test]
    fn other_record_kind_rejected() {
        let bytes = BurnTxInfo {
            asset: AssetType::Btc,
            beacon_id: 1,
        }
        .to_bytes();
        assert!(matches!(
            BeaconPledge::from_bytes(&bytes),
            Err(CodecError::WrongKind { .. })
        ));
    }

    #[test]
    fn unknown_asset_tag_rejected() {
        let mut w = FieldWriter::new(PayloadKind::Burn);
        w.field("asset", Value::U64(0x33)).field("beacon_id", Value::U64(1));
        assert!(matches!(
            BurnTxInfo::from_bytes(&w.finish()),
            Err(CodecError::InvalidValue { field: "asset", .. })
        ));
    }

    #[test]
    fn unknown_whitelist_asset_survives_decoding() {
        let mut r = registration();
        r.whitelist = vec![WhiteUnit {
            asset: 0x01,
            pubkey: vec![0; 64],
        }];
        let decoded = BeaconRegistration::from_bytes(&r.to_bytes()).unwrap();
        assert_eq!(decoded.whitelist[0].asset_type(), None);
    }

    #[test]
    fn every_truncation_rejected() {
        let bytes = registration().to_bytes();
        for cut in 0..bytes.len() {
            assert!(BeaconRegistration::from_bytes(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn trailing_field_rejected() {
        let mut bytes = BeaconPledge {
            to_address: RoutingTag::from_value(11),
            staking_amount: Amount::coins(100),
        }
        .to_bytes();
        bytes.push(0);
        assert_eq!(BeaconPledge::from_bytes(&bytes), Err(CodecError::TrailingBytes(1)));
    }
}
