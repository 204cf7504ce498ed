//! The collaborator boundary between the coordinator and the chain.
//!
//! Everything the core needs from the outside world goes through
//! [`ContractTransport`]. The RPC adapter in `rpc.rs` implements it against
//! a JSON-RPC endpoint; tests implement it in memory.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

/// A read-only ERC-20 query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenQuery {
    Name,
    Symbol,
    Decimals,
    BalanceOf { owner: Address },
    Allowance { owner: Address, spender: Address },
}

impl TokenQuery {
    /// ABI function name, used in logs.
    pub fn function_name(&self) -> &'static str {
        match self {
            TokenQuery::Name => "name",
            TokenQuery::Symbol => "symbol",
            TokenQuery::Decimals => "decimals",
            TokenQuery::BalanceOf { .. } => "balanceOf",
            TokenQuery::Allowance { .. } => "allowance",
        }
    }
}

/// Decoded result of a [`TokenQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Decimals(u8),
    Amount(U256),
}

impl FieldValue {
    pub fn into_text(self) -> TransportResult<String> {
        match self {
            FieldValue::Text(text) => Ok(text),
            other => Err(TransportError::unexpected("text", &other)),
        }
    }

    pub fn into_decimals(self) -> TransportResult<u8> {
        match self {
            FieldValue::Decimals(decimals) => Ok(decimals),
            other => Err(TransportError::unexpected("decimals", &other)),
        }
    }

    pub fn into_amount(self) -> TransportResult<U256> {
        match self {
            FieldValue::Amount(amount) => Ok(amount),
            other => Err(TransportError::unexpected("amount", &other)),
        }
    }
}

/// State-changing contract function and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFunction {
    Approve {
        spender: Address,
        amount: U256,
    },
    Transfer {
        to: Address,
        amount: U256,
    },
    TransferFrom {
        from: Address,
        to: Address,
        amount: U256,
    },
}

impl ContractFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ContractFunction::Approve { .. } => "approve",
            ContractFunction::Transfer { .. } => "transfer",
            ContractFunction::TransferFrom { .. } => "transferFrom",
        }
    }

    pub fn amount(&self) -> U256 {
        match *self {
            ContractFunction::Approve { amount, .. }
            | ContractFunction::Transfer { amount, .. }
            | ContractFunction::TransferFrom { amount, .. } => amount,
        }
    }
}

/// A write call: which contract, which function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractCall {
    pub target: Address,
    pub function: ContractFunction,
}

/// Terminal outcome of a confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Included and settled.
    Confirmed { block_number: u64 },
    /// Included but failed, or dropped.
    Failed(String),
}

/// Errors reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The signer or transport refused the write before accepting it.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The confirmation wait ended in failure.
    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),

    /// Anything else, including failed reads.
    #[error("transport error: {0}")]
    Unknown(String),
}

impl TransportError {
    fn unexpected(expected: &str, got: &FieldValue) -> Self {
        TransportError::Unknown(format!("expected {expected} value, got {got:?}"))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// External "read field / write call / wait / native balance" collaborator.
#[async_trait]
pub trait ContractTransport: Send + Sync {
    /// Runs a read-only query against `token`.
    async fn read_contract_field(&self, token: Address, query: TokenQuery)
        -> TransportResult<FieldValue>;

    /// Submits a write. Resolves with the hash once the signer has accepted
    /// it, independent of inclusion.
    async fn write_contract(&self, call: ContractCall) -> TransportResult<TxHash>;

    /// Resolves once the submission is settled or has failed.
    async fn wait_for_confirmation(&self, hash: TxHash) -> TransportResult<Confirmation>;

    /// Native currency balance of `owner`.
    async fn read_native_balance(&self, owner: Address) -> TransportResult<U256>;

    /// Stops watching `hash`. In-flight network calls are not aborted.
    fn forget(&self, hash: TxHash);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::Decimals(6).into_decimals().unwrap(), 6);
        assert_eq!(
            FieldValue::Amount(U256::from(7u64)).into_amount().unwrap(),
            U256::from(7u64)
        );
        let err = FieldValue::Text("USDC".into()).into_amount().unwrap_err();
        assert!(matches!(err, TransportError::Unknown(_)));
    }

    #[test]
    fn test_function_names_match_abi() {
        let f = ContractFunction::TransferFrom {
            from: Address::ZERO,
            to: Address::ZERO,
            amount: U256::from(3u64),
        };
        assert_eq!(f.name(), "transferFrom");
        assert_eq!(f.amount(), U256::from(3u64));
        assert_eq!(
            TokenQuery::Allowance {
                owner: Address::ZERO,
                spender: Address::ZERO
            }
            .function_name(),
            "allowance"
        );
    }
}
