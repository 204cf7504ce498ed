//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all issues at once)
//!     → CoordinatorConfig (validated, immutable)
//!     → contracts.rs (addresses parsed into ContractAddresses)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The signing key never appears in the file, only in the environment

pub mod contracts;
pub mod loader;
pub mod schema;
pub mod validation;

pub use contracts::ContractAddresses;
pub use loader::{load_config, ConfigError};
pub use schema::{
    BlockchainConfig, ContractsConfig, CoordinatorConfig, DeviceClassSetting, DeviceConfig,
    ObservabilityConfig, RefreshConfig,
};
pub use validation::{validate_config, ConfigIssue};
