//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! coordinator core
//!     → transport.rs (ContractTransport: read / write / confirm / native balance)
//!     → rpc.rs (RpcTransport, the JSON-RPC implementation)
//!         → erc20.rs (ABI encoding and decoding)
//!         → client.rs (RPC connection with failover and timeouts)
//!         → wallet.rs (signer loaded from the environment)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Writes are never replayed against a failover endpoint

pub mod client;
pub mod erc20;
pub mod rpc;
pub mod transport;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use rpc::RpcTransport;
pub use transport::{
    Confirmation, ContractCall, ContractFunction, ContractTransport, FieldValue, TokenQuery,
    TransportError, TransportResult,
};
pub use types::{BlockchainConfig, BlockchainError, ChainId};
pub use wallet::Wallet;
