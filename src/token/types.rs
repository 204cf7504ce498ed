//! Token metadata types.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::validation::format_amount;

/// Decimals assumed until the token reports its own.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Native currency decimals.
pub const NATIVE_DECIMALS: u8 = 18;

/// Fractional digits shown by the display helpers.
pub const DISPLAY_PRECISION: usize = 4;

/// Cache key: one entry per token and owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub token: Address,
    pub owner: Address,
}

/// Individually refreshable cache fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    Name,
    Symbol,
    Decimals,
    Balance,
    Allowance,
    NativeBalance,
}

impl TokenField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenField::Name => "name",
            TokenField::Symbol => "symbol",
            TokenField::Decimals => "decimals",
            TokenField::Balance => "balance",
            TokenField::Allowance => "allowance",
            TokenField::NativeBalance => "native_balance",
        }
    }
}

impl std::fmt::Display for TokenField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached view of one token for one owner. `None` means not fetched yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub balance: Option<U256>,
    pub allowance: Option<U256>,
    pub native_balance: Option<U256>,
}

impl TokenMetadata {
    pub fn decimals_or_default(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }

    /// Token balance for display, `0.0000` when unknown.
    pub fn formatted_balance(&self) -> String {
        format_amount(
            self.balance.unwrap_or(U256::ZERO),
            self.decimals_or_default(),
            DISPLAY_PRECISION,
        )
    }

    pub fn formatted_allowance(&self) -> String {
        format_amount(
            self.allowance.unwrap_or(U256::ZERO),
            self.decimals_or_default(),
            DISPLAY_PRECISION,
        )
    }

    pub fn formatted_native_balance(&self) -> String {
        format_amount(
            self.native_balance.unwrap_or(U256::ZERO),
            NATIVE_DECIMALS,
            DISPLAY_PRECISION,
        )
    }
}

/// A single field's fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} refresh failed: {message}")]
pub struct FieldError {
    pub field: TokenField,
    pub message: String,
}

/// Errors returned by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// No connected owner, or the owner is not the connected one.
    #[error("token queries are disabled: no connected owner")]
    Disabled,

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Outcome of a balance + allowance refresh, reported per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub owner: Address,
    pub balance: Result<U256, FieldError>,
    pub allowance: Result<U256, FieldError>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.balance.is_ok() && self.allowance.is_ok()
    }

    /// Field failures, in field order.
    pub fn errors(&self) -> Vec<&FieldError> {
        [self.balance.as_ref().err(), self.allowance.as_ref().err()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Outcome of a name/symbol/decimals load, reported per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReport {
    pub name: Result<String, FieldError>,
    pub symbol: Result<String, FieldError>,
    pub decimals: Result<u8, FieldError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_before_fetch() {
        let meta = TokenMetadata::default();
        assert_eq!(meta.decimals_or_default(), 18);
        assert_eq!(meta.formatted_balance(), "0.0000");
        assert_eq!(meta.formatted_native_balance(), "0.0000");
    }

    #[test]
    fn test_formatting_uses_token_decimals() {
        let meta = TokenMetadata {
            decimals: Some(6),
            balance: Some(U256::from(12_345_678u64)),
            allowance: Some(U256::from(500_000u64)),
            ..Default::default()
        };
        assert_eq!(meta.formatted_balance(), "12.3456");
        assert_eq!(meta.formatted_allowance(), "0.5000");
    }

    #[test]
    fn test_report_errors_are_per_field() {
        let report = RefreshReport {
            owner: Address::ZERO,
            balance: Ok(U256::from(1u64)),
            allowance: Err(FieldError {
                field: TokenField::Allowance,
                message: "execution reverted".into(),
            }),
        };
        assert!(!report.is_complete());
        let errors = report.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, TokenField::Allowance);
        assert_eq!(
            errors[0].to_string(),
            "allowance refresh failed: execution reverted"
        );
    }
}
