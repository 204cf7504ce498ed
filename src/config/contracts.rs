//! Fixed addresses used by the write path.

use alloy::primitives::Address;

use crate::config::schema::ContractsConfig;
use crate::config::validation::ConfigIssue;
use crate::validation::parse_address;

/// Parsed, validated contract and wallet addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    /// ERC-20 token all reads and `approve`/`transfer` go to.
    pub token: Address,
    /// Contract granted spending rights; target of `transferFrom`.
    pub spender: Address,
    /// Wallet tokens are pulled from by `transferFrom`.
    pub source_wallet: Address,
    /// Recipient of `transferFrom`.
    pub recipient: Address,
}

impl ContractAddresses {
    pub fn from_config(config: &ContractsConfig) -> Result<Self, Vec<ConfigIssue>> {
        let mut issues = Vec::new();
        let mut parse = |field: &str, value: &str| {
            parse_address(value).unwrap_or_else(|| {
                issues.push(ConfigIssue {
                    field: format!("contracts.{field}"),
                    message: format!("'{value}' is not a valid address"),
                });
                Address::ZERO
            })
        };

        let addresses = Self {
            token: parse("token_address", &config.token_address),
            spender: parse("spender_address", &config.spender_address),
            source_wallet: parse("source_wallet", &config.source_wallet),
            recipient: parse("recipient_address", &config.recipient_address),
        };

        if issues.is_empty() {
            Ok(addresses)
        } else {
            Err(issues)
        }
    }
}
