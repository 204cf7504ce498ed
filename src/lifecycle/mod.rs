//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Session startup:
//!     config → reconciler → cache → scheduler → controller
//!     background tasks subscribe to Shutdown
//!
//! Session shutdown:
//!     Shutdown::trigger → polling / address watch / delayed refresh tasks exit
//! ```
//!
//! # Design Decisions
//! - Shutdown is level-triggered: tasks that subscribe late still see it
//! - Dropping the coordinator counts as shutdown

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
