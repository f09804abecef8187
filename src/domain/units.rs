//! Conversion between smallest units (wei-like integers) and display amounts.

use crate::domain::Decimal;
use thiserror::Error;

/// Largest exponent accepted between smallest units and display amounts.
pub const MAX_DECIMALS: u32 = 36;

/// Fractional digits shown for display amounts.
pub const DISPLAY_DP: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("decimals must be <= {MAX_DECIMALS}, got {0}")]
    DecimalsOutOfRange(u32),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("amount out of range")]
    Overflow,
}

fn ten_pow(decimals: u32) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::DecimalsOutOfRange(decimals));
    }
    Ok(Decimal::ten_pow(decimals))
}

/// Smallest units → human amount, truncated to six fractional digits.
pub fn format_token_amount(amount: &Decimal, decimals: u32) -> Result<String, UnitsError> {
    let divisor = ten_pow(decimals)?;
    let human = amount.checked_div(divisor).ok_or(UnitsError::Overflow)?;
    Ok(human.to_fixed_string(DISPLAY_DP))
}

/// Human amount → smallest units, truncated to a whole number.
pub fn parse_token_amount(text: &str, decimals: u32) -> Result<Decimal, UnitsError> {
    let multiplier = ten_pow(decimals)?;
    let human = Decimal::from_str_canonical(text)
        .map_err(|_| UnitsError::InvalidAmount(text.to_string()))?;
    human
        .checked_mul(multiplier)
        .map(|units| units.trunc_units())
        .ok_or(UnitsError::Overflow)
}
