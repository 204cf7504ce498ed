//! Token metadata subsystem.
//!
//! # Data Flow
//! ```text
//! reconciled ConnectionState (which owner is connected?)
//!     → cache.rs (guarded reads through ContractTransport)
//!         name / symbol / decimals   (load_metadata, concurrent)
//!         balance / allowance        (refresh, concurrent, per-field results)
//!         native balance             (refresh_native_balance)
//!     → TokenMetadata snapshots for validation and UI
//! ```
//!
//! # Design Decisions
//! - Queries are refused unless the owner is the connected owner
//! - Decimals default to 18 until the token answers
//! - Each field is stored as soon as its own read completes

pub mod cache;
pub mod types;

pub use cache::TokenCache;
pub use types::{
    CacheError, CacheKey, FieldError, MetadataReport, RefreshReport, TokenField, TokenMetadata,
    DEFAULT_DECIMALS,
};
