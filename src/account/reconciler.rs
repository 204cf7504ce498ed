//! Reactive reconciliation of the two connection providers.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::account::device::DeviceClass;
use crate::account::state::{reconcile, ConnectionSnapshot, ConnectionState, SourceClass};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Source of raw provider snapshots (`getConnectionSnapshot`).
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connection_snapshot(&self, source: SourceClass) -> ConnectionSnapshot;
}

/// Provider that always reports the same pair of snapshots.
///
/// Used when the owner is known up front, e.g. a local signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProvider {
    pub primary: ConnectionSnapshot,
    pub secondary: ConnectionSnapshot,
}

impl StaticProvider {
    /// Primary connected as `address`, secondary absent.
    pub fn primary(address: Address) -> Self {
        Self {
            primary: ConnectionSnapshot::connected(address),
            secondary: ConnectionSnapshot::disconnected(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for StaticProvider {
    async fn connection_snapshot(&self, source: SourceClass) -> ConnectionSnapshot {
        match source {
            SourceClass::Primary => self.primary,
            SourceClass::Secondary => self.secondary,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Inputs {
    primary: ConnectionSnapshot,
    secondary: ConnectionSnapshot,
}

#[derive(Debug)]
struct Inner {
    device: DeviceClass,
    inputs: watch::Sender<Inputs>,
    state: watch::Sender<ConnectionState>,
}

/// Owner of the reconciled [`ConnectionState`].
///
/// The only writer of connection state. Every snapshot update recomputes
/// the state from both inputs; subscribers are notified only when the
/// reconciled value actually changes.
#[derive(Debug, Clone)]
pub struct AccountReconciler {
    inner: Arc<Inner>,
}

impl AccountReconciler {
    pub fn new(device: DeviceClass) -> Self {
        let (inputs, _) = watch::channel(Inputs::default());
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            inner: Arc::new(Inner {
                device,
                inputs,
                state,
            }),
        }
    }

    pub fn device(&self) -> DeviceClass {
        self.inner.device
    }

    /// Records a new snapshot from `source` and republishes the state.
    pub fn update(&self, source: SourceClass, snapshot: ConnectionSnapshot) {
        let device = self.inner.device;
        let state = &self.inner.state;

        // Recompute while holding the inputs lock so concurrent updates
        // publish in the order they were applied.
        self.inner.inputs.send_if_modified(|inputs| {
            let slot = match source {
                SourceClass::Primary => &mut inputs.primary,
                SourceClass::Secondary => &mut inputs.secondary,
            };
            if *slot == snapshot {
                return false;
            }
            *slot = snapshot;

            let next = reconcile(device, &inputs.primary, &inputs.secondary);
            state.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                tracing::info!(
                    connected = next.is_connected,
                    address = ?next.address,
                    source = ?next.source,
                    previous = ?current.address,
                    "Connection state changed"
                );
                metrics::record_connection(next.is_connected);
                *current = next;
                true
            });
            true
        });
    }

    /// Current reconciled state.
    pub fn current(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Last snapshot reported by `source`.
    pub fn snapshot(&self, source: SourceClass) -> ConnectionSnapshot {
        let inputs = self.inner.inputs.borrow();
        match source {
            SourceClass::Primary => inputs.primary,
            SourceClass::Secondary => inputs.secondary,
        }
    }

    /// Receiver that observes every reconciled change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Reads both providers once and applies their snapshots.
    pub async fn poll_once(&self, provider: &dyn ConnectionProvider) {
        let (primary, secondary) = tokio::join!(
            provider.connection_snapshot(SourceClass::Primary),
            provider.connection_snapshot(SourceClass::Secondary),
        );
        self.update(SourceClass::Primary, primary);
        self.update(SourceClass::Secondary, secondary);
    }

    /// Polls `provider` every `interval` until shutdown.
    pub fn spawn_polling(
        &self,
        provider: Arc<dyn ConnectionProvider>,
        interval: Duration,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        let reconciler = self.clone();
        tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Connection polling started");
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => reconciler.poll_once(provider.as_ref()).await,
                    _ = shutdown.recv() => {
                        tracing::info!("Connection polling stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    struct FixedProvider {
        primary: Mutex<ConnectionSnapshot>,
        secondary: Mutex<ConnectionSnapshot>,
    }

    #[async_trait]
    impl ConnectionProvider for FixedProvider {
        async fn connection_snapshot(&self, source: SourceClass) -> ConnectionSnapshot {
            match source {
                SourceClass::Primary => *self.primary.lock().unwrap(),
                SourceClass::Secondary => *self.secondary.lock().unwrap(),
            }
        }
    }

    #[test]
    fn test_update_recomputes_from_both_inputs() {
        let reconciler = AccountReconciler::new(DeviceClass::NonMobile);
        assert!(!reconciler.current().is_connected);

        reconciler.update(SourceClass::Secondary, ConnectionSnapshot::connected(addr(2)));
        assert_eq!(reconciler.current().active_address(), Some(addr(2)));

        reconciler.update(SourceClass::Primary, ConnectionSnapshot::connected(addr(1)));
        assert_eq!(reconciler.current().active_address(), Some(addr(1)));

        reconciler.update(SourceClass::Primary, ConnectionSnapshot::disconnected());
        assert_eq!(reconciler.current().active_address(), Some(addr(2)));
        assert_eq!(reconciler.snapshot(SourceClass::Primary), ConnectionSnapshot::disconnected());
    }

    #[test]
    fn test_subscribers_only_see_real_changes() {
        let reconciler = AccountReconciler::new(DeviceClass::Mobile);
        let mut rx = reconciler.subscribe();

        // Primary alone never connects a mobile device.
        reconciler.update(SourceClass::Primary, ConnectionSnapshot::connected(addr(1)));
        assert!(!reconciler.current().is_connected);
        rx.mark_unchanged();

        reconciler.update(SourceClass::Primary, ConnectionSnapshot::connected(addr(1)));
        assert!(!rx.has_changed().unwrap());

        reconciler.update(SourceClass::Secondary, ConnectionSnapshot::connected(addr(3)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().active_address(), Some(addr(3)));
    }

    #[tokio::test]
    async fn test_poll_once_reads_both_providers() {
        let provider = FixedProvider {
            primary: Mutex::new(ConnectionSnapshot::disconnected()),
            secondary: Mutex::new(ConnectionSnapshot::connected(addr(7))),
        };
        let reconciler = AccountReconciler::new(DeviceClass::NonMobile);
        reconciler.poll_once(&provider).await;

        let state = reconciler.current();
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(7)));
        assert_eq!(state.source, SourceClass::Secondary);
    }

    #[tokio::test]
    async fn test_static_provider_connects_primary() {
        let reconciler = AccountReconciler::new(DeviceClass::NonMobile);
        reconciler.poll_once(&StaticProvider::primary(addr(4))).await;
        assert_eq!(reconciler.current().active_address(), Some(addr(4)));
        assert_eq!(reconciler.current().source, SourceClass::Primary);
    }

    #[tokio::test]
    async fn test_polling_stops_on_shutdown() {
        let provider = Arc::new(FixedProvider {
            primary: Mutex::new(ConnectionSnapshot::connected(addr(1))),
            secondary: Mutex::new(ConnectionSnapshot::disconnected()),
        });
        let shutdown = crate::lifecycle::Shutdown::new();
        let reconciler = AccountReconciler::new(DeviceClass::NonMobile);

        let handle = reconciler.spawn_polling(
            provider.clone(),
            Duration::from_millis(10),
            shutdown.subscribe(),
        );

        let mut rx = reconciler.subscribe();
        rx.wait_for(|s| s.is_connected).await.unwrap();

        *provider.primary.lock().unwrap() = ConnectionSnapshot::disconnected();
        rx.wait_for(|s| !s.is_connected).await.unwrap();

        shutdown.trigger();
        handle.await.unwrap();
    }
}
