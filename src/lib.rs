//! Wallet coordinator library.
//!
//! Reconciles two wallet connection providers, caches ERC-20 token state
//! for the connected owner, validates write intents and drives each write
//! through an explicit Idle → Pending → Success/Error lifecycle.

pub mod account;
pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod refresh;
pub mod session;
pub mod token;
pub mod transaction;
pub mod validation;

pub use config::CoordinatorConfig;
pub use lifecycle::Shutdown;
pub use session::WalletSession;
