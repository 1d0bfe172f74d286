//! Bracketed exchange-rate curve.
//!
//! Cumulative foreign volume is cut into brackets of fixed size. Every
//! completed bracket raises the rate by one step, so the same foreign amount
//! buys less native asset the more has already been entangled. A request
//! that straddles bracket boundaries is priced piecewise, one bracket at a
//! time, until it is fully consumed.
//!
//! All arithmetic is integer; each bracket's share is floored separately.

pub mod error;

pub use error::CurveError;

use entangle_types::{Amount, CurveParams};

/// Rate realised when burning native asset back to foreign asset:
/// `foreign = native * numerator / denominator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedeemRate {
    pub numerator: u128,
    pub denominator: u128,
}

impl RedeemRate {
    pub fn apply(&self, native: Amount) -> Result<Amount, CurveError> {
        native
            .checked_mul_div(self.numerator, self.denominator)
            .ok_or(CurveError::Overflow)
    }
}

fn check(curve: &CurveParams) -> Result<(), CurveError> {
    if curve.bracket == 0 {
        return Err(CurveError::ZeroBracket);
    }
    if curve.scale == 0 {
        return Err(CurveError::ZeroScale);
    }
    Ok(())
}

/// Rate of bracket `index`.
pub fn rate_at(curve: &CurveParams, index: u128) -> Result<u128, CurveError> {
    let rate = (curve.step as u128)
        .checked_mul(index)
        .and_then(|s| s.checked_add(curve.base_rate as u128))
        .ok_or(CurveError::Overflow)?;
    if rate == 0 {
        return Err(CurveError::ZeroRate(index));
    }
    Ok(rate)
}

/// Marginal rate at a cumulative volume.
pub fn marginal_rate(curve: &CurveParams, cumulative: Amount) -> Result<u128, CurveError> {
    check(curve)?;
    rate_at(curve, cumulative.raw() / curve.bracket as u128)
}

/// Native amount credited for `amount` foreign units deposited when
/// `cumulative` foreign units have already been entangled.
///
/// A zero request yields zero.
pub fn convert(
    curve: &CurveParams,
    cumulative: Amount,
    amount: Amount,
) -> Result<Amount, CurveError> {
    if amount.is_zero() {
        return Ok(Amount::ZERO);
    }
    check(curve)?;

    let bracket = curve.bracket as u128;
    let scale = curve.scale as u128;
    let mut keep = cumulative.raw();
    let mut change = amount.raw();
    let mut out: u128 = 0;

    while change > 0 {
        let rate = rate_at(curve, keep / bracket)?;
        let room = bracket - keep % bracket;
        let take = room.min(change);
        let part = take.checked_mul(scale).ok_or(CurveError::Overflow)? / rate;
        out = out.checked_add(part).ok_or(CurveError::Overflow)?;
        change -= take;
        keep = keep.checked_add(take).ok_or(CurveError::Overflow)?;
    }

    Ok(Amount::new(out))
}

/// Rate the next burned native unit realises at `cumulative` volume.
///
/// This is the exact inverse of the marginal conversion in the bracket that
/// holds `cumulative`.
pub fn redeem_rate(curve: &CurveParams, cumulative: Amount) -> Result<RedeemRate, CurveError> {
    Ok(RedeemRate {
        numerator: marginal_rate(curve, cumulative)?,
        denominator: curve.scale as u128,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use entangle_types::{AssetType, EntangleParams, COIN};

    fn doge() -> CurveParams {
        *EntangleParams::default().curve(AssetType::Doge)
    }

    // --- convert ---

    #[test]
    fn zero_request_is_zero() {
        assert_eq!(convert(&doge(), Amount::ZERO, Amount::ZERO), Ok(Amount::ZERO));
    }

    #[test]
    fn doge_first_bracket_is_one_for_twenty_five() {
        let out = convert(&doge(), Amount::ZERO, Amount::coins(25)).unwrap();
        assert_eq!(out, Amount::coins(1));
    }

    #[test]
    fn doge_split_across_one_boundary() {
        let c = Amount::coins(12_400_000);
        let a = Amount::coins(200_000);
        let out = convert(&doge(), c, a).unwrap();
        // 100k DOGE at 25, 100k DOGE at 26.
        let first = 100_000 * COIN / 25;
        let second = 100_000 * COIN / 26;
        assert_eq!(out.raw(), first + second);
        assert_eq!(out.raw(), 784_615_384_615);
    }

    #[test]
    fn request_spanning_many_brackets_loops() {
        let curve = CurveParams {
            bracket: 10,
            base_rate: 1,
            step: 1,
            scale: 1_000,
        };
        // 10 units at each of rates 1, 2, 3 then 5 units at 4.
        let out = convert(&curve, Amount::ZERO, Amount::new(35)).unwrap();
        assert_eq!(out.raw(), 10_000 + 5_000 + 3_333 + 1_250);
    }

    #[test]
    fn exactly_filling_a_bracket_stays_in_it() {
        let curve = CurveParams {
            bracket: 10,
            base_rate: 2,
            step: 1,
            scale: 100,
        };
        let out = convert(&curve, Amount::new(4), Amount::new(6)).unwrap();
        assert_eq!(out.raw(), 300);
    }

    #[test]
    fn btc_price_rises_per_coin() {
        let btc = *EntangleParams::default().curve(AssetType::Btc);
        let first = convert(&btc, Amount::ZERO, Amount::coins(1)).unwrap();
        let second = convert(&btc, Amount::coins(1), Amount::coins(1)).unwrap();
        assert_eq!(first.raw(), COIN * COIN / 200);
        assert_eq!(second.raw(), COIN * COIN / 210);
    }

    #[test]
    fn zero_bracket_is_rejected() {
        let mut curve = doge();
        curve.bracket = 0;
        assert_eq!(
            convert(&curve, Amount::ZERO, Amount::new(1)),
            Err(CurveError::ZeroBracket)
        );
    }

    #[test]
    fn zero_rate_is_rejected() {
        let curve = CurveParams {
            bracket: 10,
            base_rate: 0,
            step: 1,
            scale: 1,
        };
        assert_eq!(
            convert(&curve, Amount::ZERO, Amount::new(1)),
            Err(CurveError::ZeroRate(0))
        );
    }

    #[test]
    fn overflow_is_reported() {
        let curve = CurveParams {
            bracket: u64::MAX,
            base_rate: 1,
            step: 0,
            scale: u64::MAX,
        };
        let huge = Amount::new(u128::MAX / 2);
        assert_eq!(convert(&curve, Amount::ZERO, huge), Err(CurveError::Overflow));
    }

    // --- redeem_rate ---

    #[test]
    fn redeem_rate_inverts_first_bracket() {
        let rate = redeem_rate(&doge(), Amount::ZERO).unwrap();
        let foreign = rate.apply(Amount::coins(1)).unwrap();
        assert_eq!(foreign, Amount::coins(25));
    }

    #[test]
    fn redeem_rate_tracks_bracket() {
        let rate = redeem_rate(&doge(), Amount::coins(25_000_000)).unwrap();
        assert_eq!(rate.numerator, 27 * COIN);
        assert_eq!(rate.denominator, COIN);
    }

    #[test]
    fn ltc_redeem_rate_uses_scale() {
        let ltc = *EntangleParams::default().curve(AssetType::Ltc);
        let rate = redeem_rate(&ltc, Amount::ZERO).unwrap();
        let credited = convert(&ltc, Amount::ZERO, Amount::coins(1)).unwrap();
        let back = rate.apply(credited).unwrap();
        assert_eq!(back, Amount::coins(1));
    }
}
