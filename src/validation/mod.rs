//! Pre-flight validation engine.
//!
//! # Data Flow
//! ```text
//! user intent (amount, recipient)
//!     + ValidationContext (reconciled connection, cached decimals/balance)
//!     → validate_transfer (ordered checks, first failure wins)
//!     → fixed-point amount handed to the transaction controller
//! ```
//!
//! # Check order
//! 1. connected
//! 2. amount is a positive decimal
//! 3. recipient is a valid address (when given)
//! 4. converted amount ≤ cached balance
//!
//! Everything here is pure: no I/O, no shared state.

pub mod address;
pub mod amount;

use alloy::primitives::{Address, U256};
use thiserror::Error;

pub use address::{is_valid_address, parse_address};
pub use amount::{format_amount, is_positive_decimal, parse_amount, AmountError};

/// Errors detected locally, before anything reaches the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("invalid amount: {0}")]
    InvalidAmount(AmountError),

    #[error("invalid recipient address")]
    InvalidAddress,

    #[error("amount exceeds token balance")]
    InsufficientBalance,

    #[error("amount exceeds approved allowance")]
    InsufficientAllowance,
}

/// Snapshot of everything validation needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    /// Reconciled connection is connected and carries an address.
    pub connected: bool,
    /// Token decimals, already defaulted.
    pub decimals: u8,
    /// Cached token balance, `None` until fetched.
    pub balance: Option<U256>,
    /// Cached allowance, `None` until fetched.
    pub allowance: Option<U256>,
}

/// A validated transfer: the converted amount and the parsed recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub amount: U256,
    pub recipient: Option<Address>,
}

/// Runs the ordered transfer checks.
///
/// An unknown balance counts as zero.
pub fn validate_transfer(
    ctx: &ValidationContext,
    amount: &str,
    recipient: Option<&str>,
) -> Result<ValidatedTransfer, ValidationError> {
    if !ctx.connected {
        return Err(ValidationError::NotConnected);
    }

    if !is_positive_decimal(amount) {
        let reason = parse_amount(amount, ctx.decimals)
            .err()
            .unwrap_or(AmountError::Malformed);
        return Err(ValidationError::InvalidAmount(reason));
    }

    let recipient = match recipient {
        Some(text) => Some(parse_address(text).ok_or(ValidationError::InvalidAddress)?),
        None => None,
    };

    let value = parse_amount(amount, ctx.decimals).map_err(ValidationError::InvalidAmount)?;
    if value > ctx.balance.unwrap_or(U256::ZERO) {
        return Err(ValidationError::InsufficientBalance);
    }

    Ok(ValidatedTransfer {
        amount: value,
        recipient,
    })
}

/// Returns whether the cached allowance covers `amount`.
///
/// Unknown allowance or an unconvertible amount yields `false`.
pub fn check_allowance(ctx: &ValidationContext, amount: &str) -> bool {
    match (ctx.allowance, parse_amount(amount, ctx.decimals)) {
        (Some(allowance), Ok(value)) => allowance >= value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

    fn wei(n: u64) -> U256 {
        U256::from(n)
    }

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn connected(balance: U256) -> ValidationContext {
        ValidationContext {
            connected: true,
            decimals: 18,
            balance: Some(balance),
            allowance: None,
        }
    }

    #[test]
    fn test_not_connected_wins_over_everything() {
        let ctx = ValidationContext {
            connected: false,
            ..connected(U256::ZERO)
        };
        assert_eq!(
            validate_transfer(&ctx, "garbage", Some("0xbad")),
            Err(ValidationError::NotConnected)
        );
    }

    #[test]
    fn test_invalid_amounts_are_reported_before_address() {
        let ctx = connected(ether(1000));
        for bad in ["", "0", "-1", "abc", "1e18", "0.0"] {
            let err = validate_transfer(&ctx, bad, Some("not-an-address")).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidAmount(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_invalid_address() {
        let ctx = connected(ether(1000));
        for bad in ["0xabc", "hello", "0x70997970c51812dc3a010c7d01b50e0d17dc79"] {
            assert_eq!(
                validate_transfer(&ctx, "1", Some(bad)),
                Err(ValidationError::InvalidAddress)
            );
        }
    }

    #[test]
    fn test_insufficient_balance_in_base_units() {
        let ctx = connected(wei(100));
        let result = validate_transfer(&ctx, "0.00000000000000015", None);
        assert_eq!(result, Err(ValidationError::InsufficientBalance));

        let ok = validate_transfer(&ctx, "0.0000000000000001", None).unwrap();
        assert_eq!(ok.amount, wei(100));
    }

    #[test]
    fn test_unknown_balance_counts_as_zero() {
        let ctx = ValidationContext {
            balance: None,
            ..connected(U256::ZERO)
        };
        assert_eq!(
            validate_transfer(&ctx, "1", None),
            Err(ValidationError::InsufficientBalance)
        );
    }

    #[test]
    fn test_too_precise_is_invalid_amount() {
        let ctx = ValidationContext {
            decimals: 2,
            ..connected(ether(1))
        };
        assert_eq!(
            validate_transfer(&ctx, "1.001", None),
            Err(ValidationError::InvalidAmount(AmountError::TooPrecise { decimals: 2 }))
        );
    }

    #[test]
    fn test_valid_transfer_returns_converted_amount_and_recipient() {
        let ctx = connected(ether(1000));
        let ok = validate_transfer(&ctx, "10", Some(RECIPIENT)).unwrap();
        assert_eq!(ok.amount, ether(10));
        assert_eq!(ok.recipient, parse_address(RECIPIENT));
    }

    #[test]
    fn test_validation_does_not_depend_on_call_count() {
        let ctx = connected(ether(5));
        let first = validate_transfer(&ctx, "3", None);
        let second = validate_transfer(&ctx, "3", None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_check_allowance() {
        let mut ctx = connected(ether(1000));
        assert!(!check_allowance(&ctx, "1"));

        ctx.allowance = Some(ether(5));
        assert!(check_allowance(&ctx, "5"));
        assert!(!check_allowance(&ctx, "5.000000000000000001"));
        assert!(!check_allowance(&ctx, "not a number"));
    }
}
