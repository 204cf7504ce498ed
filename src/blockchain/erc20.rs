//! ERC-20 ABI bindings and call encoding.

use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::transport::{ContractFunction, FieldValue, TokenQuery};
use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    /// Subset of the ERC-20 interface the coordinator talks to.
    #[derive(Debug)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }
}

/// Calldata for a read-only query.
pub fn encode_query(query: &TokenQuery) -> Bytes {
    let data = match *query {
        TokenQuery::Name => IERC20::nameCall {}.abi_encode(),
        TokenQuery::Symbol => IERC20::symbolCall {}.abi_encode(),
        TokenQuery::Decimals => IERC20::decimalsCall {}.abi_encode(),
        TokenQuery::BalanceOf { owner } => IERC20::balanceOfCall { owner }.abi_encode(),
        TokenQuery::Allowance { owner, spender } => {
            IERC20::allowanceCall { owner, spender }.abi_encode()
        }
    };
    data.into()
}

/// Decodes the return data of `query`.
pub fn decode_query(query: &TokenQuery, data: &[u8]) -> BlockchainResult<FieldValue> {
    let decode_err = |e: alloy::sol_types::Error| {
        BlockchainError::Decode(format!("{}: {}", query.function_name(), e))
    };

    let value = match query {
        TokenQuery::Name => {
            let name = IERC20::nameCall::abi_decode_returns(data).map_err(decode_err)?;
            FieldValue::Text(name)
        }
        TokenQuery::Symbol => {
            let symbol = IERC20::symbolCall::abi_decode_returns(data).map_err(decode_err)?;
            FieldValue::Text(symbol)
        }
        TokenQuery::Decimals => {
            let decimals = IERC20::decimalsCall::abi_decode_returns(data).map_err(decode_err)?;
            FieldValue::Decimals(decimals)
        }
        TokenQuery::BalanceOf { .. } => {
            let balance = IERC20::balanceOfCall::abi_decode_returns(data).map_err(decode_err)?;
            FieldValue::Amount(balance)
        }
        TokenQuery::Allowance { .. } => {
            let allowance = IERC20::allowanceCall::abi_decode_returns(data).map_err(decode_err)?;
            FieldValue::Amount(allowance)
        }
    };
    Ok(value)
}

/// Calldata for a state-changing call.
pub fn encode_function(function: &ContractFunction) -> Bytes {
    let data = match *function {
        ContractFunction::Approve { spender, amount } => {
            IERC20::approveCall { spender, amount }.abi_encode()
        }
        ContractFunction::Transfer { to, amount } => {
            IERC20::transferCall { to, amount }.abi_encode()
        }
        ContractFunction::TransferFrom { from, to, amount } => {
            IERC20::transferFromCall { from, to, amount }.abi_encode()
        }
    };
    data.into()
}
