//! Transaction lifecycle subsystem.
//!
//! # State machine
//! ```text
//!            submit            confirmed
//!   Idle ──────────→ Pending ───────────→ Success
//!    ↑                  │                    │
//!    │                  │ rejected / failed  │
//!    │                  ↓                    │
//!    └──── reset ──── Error ←────────────────┘ (reset)
//! ```
//!
//! # Design Decisions
//! - One transition function (state.rs); the controller and its spawned
//!   confirmation tasks only post events
//! - Events carry the submission id; events from a superseded submission
//!   are dropped
//! - Validation failures never enter `Pending`

pub mod controller;
pub mod state;

pub use controller::{TransactionController, TxError};
pub use state::{apply, IllegalTransition, TransactionRecord, TxAction, TxEvent, TxStatus};
