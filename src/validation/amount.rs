//! Decimal amount parsing and fixed-point conversion.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;
use thiserror::Error;

/// Reasons a user-supplied amount cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is not a decimal number")]
    Malformed,

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount has more than {decimals} fractional digits")]
    TooPrecise { decimals: u8 },

    #[error("amount does not fit the token's integer range")]
    Overflow,
}

/// Splits `text` into integer and fractional digit runs.
///
/// Accepts `12`, `12.5`, `.5` and `12.`; rejects signs, exponents,
/// separators and empty input.
fn split_decimal(text: &str) -> Option<(&str, &str)> {
    let (int, frac) = match text.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (text, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    (digits(int) && digits(frac)).then_some((int, frac))
}

/// Returns true when `text` is a syntactically valid positive decimal.
///
/// Only the syntax and the sign are checked; whether the value fits a
/// token's precision is decided by [`parse_amount`].
pub fn is_positive_decimal(text: &str) -> bool {
    match split_decimal(text.trim()) {
        Some((int, frac)) => int.bytes().chain(frac.bytes()).any(|b| b != b'0'),
        None => false,
    }
}

/// Converts a decimal string into its fixed-point representation at
/// `decimals` places.
pub fn parse_amount(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let (int, frac) = split_decimal(text.trim()).ok_or(AmountError::Malformed)?;

    if frac.len() > decimals as usize {
        return Err(AmountError::TooPrecise { decimals });
    }

    let int = if int.is_empty() { "0" } else { int };
    let normalized = if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    };

    let value = parse_units(&normalized, decimals)
        .map_err(|_| AmountError::Overflow)?
        .get_absolute();

    if value.is_zero() {
        return Err(AmountError::NotPositive);
    }
    Ok(value)
}

/// Renders a fixed-point value with exactly `precision` fractional digits.
///
/// Extra digits are truncated. Values that cannot be rendered show as zero.
pub fn format_amount(value: U256, decimals: u8, precision: usize) -> String {
    let full = format_units(value, decimals).unwrap_or_else(|_| "0".to_string());
    let (int, frac) = full.split_once('.').unwrap_or((full.as_str(), ""));

    if precision == 0 {
        return int.to_string();
    }

    let mut frac: String = frac.chars().take(precision).collect();
    while frac.len() < precision {
        frac.push('0');
    }
    format!("{int}.{frac}")
}
