//! Account reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! primary provider snapshot ──┐
//!                             ├─→ reconciler.rs (reconcile on every change)
//! secondary provider snapshot ┘        │
//!                                      ▼
//!                     watch::Receiver<ConnectionState>
//!                         → validation (is the wallet connected?)
//!                         → token cache / refresh (which owner to query?)
//! ```
//!
//! # Design Decisions
//! - Device class is decided once per session (device.rs)
//! - Consumers never see raw provider snapshots, only the reconciled state
//! - Reconciliation is a pure function over two immutable snapshots (state.rs)

pub mod device;
pub mod reconciler;
pub mod state;

pub use device::DeviceClass;
pub use reconciler::{AccountReconciler, ConnectionProvider, StaticProvider};
pub use state::{reconcile, ConnectionSnapshot, ConnectionState, SourceClass};
