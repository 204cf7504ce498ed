//! Refresh scheduling subsystem.
//!
//! # Triggers
//! ```text
//! reconciled address → new connected owner   → load immediately (watch_accounts)
//! transaction status → Success               → refresh after delay (schedule_refresh)
//! caller                                     → refresh_now
//!
//! all triggers → refresh_owner (joins an in-flight fetch) → TokenCache::refresh_for
//! ```
//!
//! # Design Decisions
//! - One in-flight balance/allowance fetch per owner at a time
//! - The last completed fetch for a field wins
//! - Disconnecting or switching accounts clears the previous owner's entry

pub mod scheduler;

pub use scheduler::RefreshScheduler;
