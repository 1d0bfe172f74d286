//! Entanglement parameters: beacon bounds, redemption windows, and the
//! per-asset pricing curves and confirmation depths.
//!
//! Every value is configuration, not a compile-time constant, so that
//! precision changes on one asset never leak into another.

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, COIN};
use crate::asset::AssetType;

const COIN_U64: u64 = COIN as u64;

/// Shape of one asset's bracketed pricing curve.
///
/// Inside bracket `b` (cumulative volume `b*bracket ..< (b+1)*bracket`) the
/// rate is `base_rate + step*b`, and `x` foreign units buy
/// `x * scale / rate` native units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    /// Foreign volume per bracket, in foreign raw units.
    pub bracket: u64,
    pub base_rate: u64,
    /// Rate increase per completed bracket.
    pub step: u64,
    /// Native precision multiplier.
    pub scale: u64,
}

/// Everything that differs per foreign asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    pub curve: CurveParams,
    /// Foreign confirmations required beyond the deposit height.
    pub maturity: u64,
    /// Hex locking script of the pool that beacon-less deposits must pay.
    /// Unset means such deposits are refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangleParams {
    // ── Beacons ──────────────────────────────────────────────────────────
    /// Minimum collateral, and the headroom a beacon must keep free.
    pub min_staking: u64,

    /// Upper bound for a beacon fee; also the fee divisor.
    pub max_fee: u64,

    /// Upper bound for a beacon's quota keep time, in blocks.
    pub max_keep_time: u64,

    /// Most whitelist entries a beacon may hold, at registration and after
    /// any append.
    pub max_whitelist: usize,

    /// Most coinbase bindings a beacon may hold, at registration and after
    /// any append.
    pub max_coinbase: usize,

    /// Length of a whitelisted foreign public key.
    pub whitelist_key_len: usize,

    // ── Redemption ───────────────────────────────────────────────────────
    /// Blocks a beacon has to honour a burn before it counts as timed out.
    pub limit_redeem_height: u64,

    /// Height weight of a new deposit in the quota clock average.
    pub quota_weight: u64,

    /// Stake slashed per unit of unredeemed burn.
    pub slash_multiplier: u64,

    /// Smallest punishment worth a reward output.
    pub min_punished: u64,

    /// Difficulty multiplier per `min_staking` of bound stake.
    pub difficulty_bonus: u64,

    // ── Assets ───────────────────────────────────────────────────────────
    pub doge: AssetParams,
    pub ltc: AssetParams,
    pub btc: AssetParams,
    pub bch: AssetParams,
    pub bsv: AssetParams,
}

impl EntangleParams {
    /// Mainnet values.
    pub fn mainnet_defaults() -> Self {
        let bch_like = AssetParams {
            curve: CurveParams {
                bracket: 300 * COIN_U64,
                base_rate: 10_000,
                step: 1_000,
                scale: COIN_U64,
            },
            maturity: 12,
            pool: None,
        };
        Self {
            min_staking: 100 * COIN_U64,
            max_fee: 100_000,
            max_keep_time: 100_000,
            max_whitelist: 4,
            max_coinbase: 4,
            whitelist_key_len: 64,

            limit_redeem_height: 5_000,
            quota_weight: 90,
            slash_multiplier: 2,
            min_punished: 20 * COIN_U64,
            difficulty_bonus: 10,

            doge: AssetParams {
                curve: CurveParams {
                    bracket: 12_500_000 * COIN_U64,
                    base_rate: 25 * COIN_U64,
                    step: COIN_U64,
                    scale: COIN_U64,
                },
                maturity: 2,
                pool: None,
            },
            ltc: AssetParams {
                curve: CurveParams {
                    bracket: 1_150 * COIN_U64,
                    base_rate: 80_000,
                    step: 1,
                    scale: COIN_U64,
                },
                maturity: 12,
                pool: None,
            },
            btc: AssetParams {
                curve: CurveParams {
                    bracket: COIN_U64,
                    base_rate: 200,
                    step: 10,
                    scale: COIN_U64,
                },
                maturity: 12,
                pool: None,
            },
            bch: bch_like.clone(),
            bsv: bch_like,
        }
    }

    pub fn asset(&self, asset: AssetType) -> &AssetParams {
        match asset {
            AssetType::Doge => &self.doge,
            AssetType::Ltc => &self.ltc,
            AssetType::Btc => &self.btc,
            AssetType::Bch => &self.bch,
            AssetType::Bsv => &self.bsv,
        }
    }

    pub fn curve(&self, asset: AssetType) -> &CurveParams {
        &self.asset(asset).curve
    }

    pub fn maturity(&self, asset: AssetType) -> u64 {
        self.asset(asset).maturity
    }

    /// Decoded pool script for `asset`, when one is configured and valid.
    pub fn pool_script(&self, asset: AssetType) -> Option<Vec<u8>> {
        self.asset(asset)
            .pool
            .as_deref()
            .and_then(|h| hex::decode(h).ok())
    }

    pub fn min_staking_amount(&self) -> Amount {
        Amount::from(self.min_staking)
    }

    pub fn min_punished_amount(&self) -> Amount {
        Amount::from(self.min_punished)
    }

    pub fn valid_fee(&self, fee: u64) -> bool {
        fee <= self.max_fee
    }

    pub fn valid_keep_time(&self, keep_time: u64) -> bool {
        keep_time <= self.max_keep_time
    }

    pub fn valid_whitelist_key(&self, key: &[u8]) -> bool {
        key.len() == self.whitelist_key_len
    }
}

impl Default for EntangleParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bch_and_bsv_share_a_curve() {
        let p = EntangleParams::default();
        assert_eq!(p.curve(AssetType::Bch), p.curve(AssetType::Bsv));
    }

    #[test]
    fn doge_confirms_faster_than_the_rest() {
        let p = EntangleParams::default();
        assert_eq!(p.maturity(AssetType::Doge), 2);
        for asset in [AssetType::Ltc, AssetType::Btc, AssetType::Bch, AssetType::Bsv] {
            assert_eq!(p.maturity(asset), 12);
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let p = EntangleParams::default();
        assert!(p.valid_fee(100_000));
        assert!(!p.valid_fee(100_001));
        assert!(p.valid_keep_time(0));
        assert!(!p.valid_keep_time(100_001));
        assert!(p.valid_whitelist_key(&[0u8; 64]));
        assert!(!p.valid_whitelist_key(&[0u8; 33]));
    }

    #[test]
    fn pool_script_decodes_hex() {
        let mut p = EntangleParams::default();
        assert_eq!(p.pool_script(AssetType::Doge), None);
        p.doge.pool = Some("a914".into());
        assert_eq!(p.pool_script(AssetType::Doge), Some(vec![0xa9, 0x14]));
        p.ltc.pool = Some("zz".into());
        assert_eq!(p.pool_script(AssetType::Ltc), None);
    }

    #[test]
    fn min_staking_is_one_hundred_coins() {
        assert_eq!(
            EntangleParams::default().min_staking_amount(),
            Amount::coins(100)
        );
    }
}
