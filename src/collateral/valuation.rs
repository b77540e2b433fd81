//! Collateral valuation math
//!
//! Fiat values are rounded to cents and asset quantities to 8 places, both with
//! half-away-from-zero rounding.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LendingError, LendingResult};

pub const FIAT_DECIMALS: u32 = 2;
pub const ASSET_DECIMALS: u32 = 8;

pub fn round_fiat(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FIAT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_asset(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ASSET_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Collateral needed to back a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub required_value: Decimal,
    pub required_amount: Decimal,
}

/// Value of the collateral a user deposited and the loan it supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub asset_value: Decimal,
    pub loan_value: Decimal,
}

pub fn ensure_ltv(ltv: Decimal) -> LendingResult<()> {
    if ltv <= Decimal::ZERO || ltv > Decimal::ONE {
        return Err(LendingError::ConfigError(format!(
            "loan-to-value ratio must be in (0, 1], got {}",
            ltv
        )));
    }
    Ok(())
}

fn ensure_price(price: Decimal) -> LendingResult<()> {
    if price <= Decimal::ZERO {
        return Err(LendingError::UpstreamUnavailable(format!(
            "price feed returned non-positive price {}",
            price
        )));
    }
    Ok(())
}

fn overflow() -> LendingError {
    LendingError::InvalidInput("amount out of range".to_string())
}

/// `required_value = loan_amount / ltv`, `required_amount = required_value / price`
pub fn requirement(
    loan_amount: Decimal,
    ltv: Decimal,
    price: Decimal,
) -> LendingResult<Requirement> {
    ensure_ltv(ltv)?;
    ensure_price(price)?;

    let required_value = round_fiat(loan_amount.checked_div(ltv).ok_or_else(overflow)?);
    let required_amount = round_asset(required_value.checked_div(price).ok_or_else(overflow)?);

    Ok(Requirement {
        required_value,
        required_amount,
    })
}

/// `asset_value = amount * price`, `loan_value = asset_value * ltv`
pub fn valuation(amount: Decimal, ltv: Decimal, price: Decimal) -> LendingResult<Valuation> {
    ensure_ltv(ltv)?;
    ensure_price(price)?;

    let asset_value = round_fiat(amount.checked_mul(price).ok_or_else(overflow)?);
    let loan_value = round_fiat(asset_value.checked_mul(ltv).ok_or_else(overflow)?);

    Ok(Valuation {
        asset_value,
        loan_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rounding_mode_is_half_away_from_zero() {
        assert_eq!(round_fiat(dec!(0.125)), dec!(0.13));
        assert_eq!(round_fiat(dec!(0.135)), dec!(0.14));
        assert_eq!(round_fiat(dec!(0.124)), dec!(0.12));
        assert_eq!(round_asset(dec!(0.000000005)), dec!(0.00000001));
        assert_eq!(round_asset(dec!(0.000000015)), dec!(0.00000002));
    }

    #[test]
    fn test_requirement() {
        let req = requirement(dec!(1000), dec!(0.5), dec!(20000)).unwrap();
        assert_eq!(req.required_value, dec!(2000));
        assert_eq!(req.required_amount, dec!(0.1));

        let req = requirement(dec!(100), dec!(0.65), dec!(3)).unwrap();
        assert_eq!(req.required_value, dec!(153.85));
        assert_eq!(req.required_amount, dec!(51.28333333));
    }

    #[test]
    fn test_valuation() {
        let v = valuation(dec!(0.5), dec!(0.5), dec!(20000)).unwrap();
        assert_eq!(v.asset_value, dec!(10000));
        assert_eq!(v.loan_value, dec!(5000));
    }

    #[test]
    fn test_rejects_bad_ltv_and_price() {
        assert!(matches!(
            requirement(dec!(100), Decimal::ZERO, dec!(1)),
            Err(LendingError::ConfigError(_))
        ));
        assert!(matches!(
            valuation(dec!(1), dec!(0.5), Decimal::ZERO),
            Err(LendingError::UpstreamUnavailable(_))
        ));
    }
}
