//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! coordinator. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the wallet coordinator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Fixed contract and wallet addresses used by write operations.
    pub contracts: ContractsConfig,

    /// Refresh timing.
    pub refresh: RefreshConfig,

    /// Device class selection.
    pub device: DeviceConfig,

    /// RPC adapter settings.
    pub blockchain: BlockchainConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Addresses injected into the transaction controller.
///
/// Kept as strings here; `ContractAddresses::from_config` parses them.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractsConfig {
    /// ERC-20 token contract.
    pub token_address: String,

    /// Contract granted spending rights by `approve`, and target of
    /// `transferFrom`.
    pub spender_address: String,

    /// Wallet the delegated `transferFrom` moves tokens out of.
    pub source_wallet: String,

    /// Recipient of the delegated `transferFrom`.
    pub recipient_address: String,
}

/// Refresh timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delay between a confirmed transaction and the balance refresh, to
    /// tolerate indexing lag.
    pub post_success_delay_ms: u64,

    /// Delay between an address change and the first refresh.
    pub address_change_delay_ms: u64,

    /// Interval for polling connection providers.
    pub connection_poll_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            post_success_delay_ms: 2000,
            address_change_delay_ms: 0,
            connection_poll_interval_ms: 1000,
        }
    }
}

/// How the device class is chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClassSetting {
    /// Classify the user agent.
    #[default]
    Auto,
    Mobile,
    Desktop,
}

/// Device class configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeviceConfig {
    pub class: DeviceClassSetting,

    /// User agent to classify when `class = "auto"`.
    pub user_agent: Option<String>,
}

/// RPC adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, used for reads only.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required before a write counts as
    /// confirmed.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in milliseconds.
    pub confirmation_poll_ms: u64,

    /// Optional deadline for a confirmation wait. `None` waits forever.
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_poll_ms: 2000,
            confirmation_timeout_secs: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
