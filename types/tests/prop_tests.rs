use proptest::prelude::*;

use entangle_types::{Amount, AssetFlags, AssetType, Hash256, RoutingTag};

proptest! {
    /// Trimmed big-endian bytes decode back to the same amount.
    #[test]
    fn amount_be_bytes_roundtrip(raw in any::<u128>()) {
        let amount = Amount::new(raw);
        let bytes = amount.to_be_trimmed();
        prop_assert!(bytes.len() <= 16);
        prop_assert_eq!(Amount::from_be_slice(&bytes), Some(amount));
    }

    /// Trimmed bytes never start with a zero byte.
    #[test]
    fn amount_be_bytes_are_minimal(raw in 1u128..) {
        let bytes = Amount::new(raw).to_be_trimmed();
        prop_assert_ne!(bytes[0], 0);
    }

    /// checked_add agrees with u128 arithmetic.
    #[test]
    fn amount_checked_add(a in any::<u128>(), b in any::<u128>()) {
        let sum = Amount::new(a).checked_add(Amount::new(b));
        prop_assert_eq!(sum.map(|s| s.raw()), a.checked_add(b));
    }

    /// saturating_sub never exceeds the minuend.
    #[test]
    fn amount_saturating_sub(a in any::<u128>(), b in any::<u128>()) {
        let r = Amount::new(a).saturating_sub(Amount::new(b));
        prop_assert!(r.raw() <= a);
    }

    /// Only tags F0..=F4 decode.
    #[test]
    fn asset_tag_decoding(tag in any::<u8>()) {
        let decoded = AssetType::from_tag(tag);
        prop_assert_eq!(decoded.is_some(), (0xF0..=0xF4).contains(&tag));
        if let Some(asset) = decoded {
            prop_assert_eq!(asset.tag(), tag);
        }
    }

    /// A flag set contains an asset exactly when its bit is set.
    #[test]
    fn asset_flags_contains(bits in any::<u32>()) {
        let flags = AssetFlags::new(bits);
        for asset in AssetType::ALL {
            prop_assert_eq!(flags.contains(asset), bits & asset.flag() != 0);
        }
    }

    /// Routing tags built from a value read back the same value.
    #[test]
    fn routing_tag_value_roundtrip(v in any::<u64>()) {
        let tag = RoutingTag::from_value(v);
        prop_assert_eq!(tag.numeric_value(), Some(v));
        prop_assert_eq!(tag.in_reserved_range(), (10..=99).contains(&v));
    }

    /// Hash256 bincode serialization roundtrip.
    #[test]
    fn hash256_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash256::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: Hash256 = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }
}
