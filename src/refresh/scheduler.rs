//! Refresh triggers and de-duplication.

use alloy::primitives::Address;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::account::ConnectionState;
use crate::lifecycle::ShutdownSignal;
use crate::token::{CacheError, RefreshReport, TokenCache};

type RefreshOutcome = Result<RefreshReport, CacheError>;
type Fetch = Shared<BoxFuture<'static, RefreshOutcome>>;

/// A running fetch and the chain generation it was issued for.
#[derive(Clone)]
struct InFlight {
    generation: u64,
    fetch: Fetch,
}

struct Inner {
    cache: Arc<TokenCache>,
    in_flight: DashMap<Address, InFlight>,
    /// Bumped whenever on-chain state is known to have changed.
    generation: AtomicU64,
    address_change_delay: Duration,
}

/// Decides when the token cache is re-fetched.
///
/// Concurrent refreshes for one owner share a single in-flight fetch; a
/// trigger that arrives while a fetch is running joins it, unless the chain
/// changed after that fetch was issued. Such triggers share one follow-up
/// fetch that starts once the running one has finished.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    pub fn new(cache: Arc<TokenCache>, address_change_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                in_flight: DashMap::new(),
                generation: AtomicU64::new(0),
                address_change_delay,
            }),
        }
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.inner.cache
    }

    /// Number of owners with a refresh currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Marks every running fetch as outdated. Later triggers will not join
    /// them.
    pub fn mark_stale(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "Chain state changed, running refreshes outdated");
    }

    /// Refreshes balance and allowance for `owner`, joining any refresh
    /// already running for it that is not outdated.
    pub async fn refresh_owner(&self, owner: Address) -> RefreshOutcome {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let fetch = match self.inner.in_flight.entry(owner) {
            Entry::Occupied(entry) if entry.get().generation >= generation => {
                tracing::debug!(owner = %owner, "Joining in-flight refresh");
                entry.get().fetch.clone()
            }
            Entry::Occupied(mut entry) => {
                tracing::debug!(owner = %owner, "In-flight refresh outdated, queueing follow-up");
                let previous = entry.get().fetch.clone();
                let fetch = self.new_fetch(owner, Some(previous));
                entry.insert(InFlight {
                    generation,
                    fetch: fetch.clone(),
                });
                fetch
            }
            Entry::Vacant(entry) => {
                let fetch = self.new_fetch(owner, None);
                entry.insert(InFlight {
                    generation,
                    fetch: fetch.clone(),
                });
                fetch
            }
        };

        let outcome = fetch.clone().await;
        self.inner
            .in_flight
            .remove_if(&owner, |_, running| running.fetch.ptr_eq(&fetch));
        outcome
    }

    /// Fetch for `owner`, issued only after `after` has completed.
    fn new_fetch(&self, owner: Address, after: Option<Fetch>) -> Fetch {
        let cache = self.inner.cache.clone();
        async move {
            if let Some(previous) = after {
                let _ = previous.await;
            }
            cache.refresh_for(owner).await
        }
        .boxed()
        .shared()
    }

    /// Manual refresh of the connected owner.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let owner = self.inner.cache.active_owner().ok_or(CacheError::Disabled)?;
        self.refresh_owner(owner).await
    }

    /// Refreshes `owner` after `delay`, in the background.
    pub fn schedule_refresh(&self, owner: Address, delay: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match scheduler.refresh_owner(owner).await {
                Ok(report) if report.is_complete() => {
                    tracing::info!(owner = %owner, "Scheduled refresh completed");
                }
                Ok(report) => {
                    for err in report.errors() {
                        tracing::warn!(
                            owner = %owner,
                            error = %err,
                            "Scheduled refresh incomplete"
                        );
                    }
                }
                Err(e) => tracing::debug!(owner = %owner, error = %e, "Scheduled refresh skipped"),
            }
        })
    }

    /// Full load after the connected owner changed: token metadata, native
    /// balance, balance and allowance.
    async fn load_owner(&self, owner: Address) {
        let cache = &self.inner.cache;
        let (metadata, native, refresh) = tokio::join!(
            cache.load_metadata_for(owner),
            cache.refresh_native_balance(owner),
            self.refresh_owner(owner),
        );

        if let Ok(report) = metadata {
            for err in [report.name.err(), report.symbol.err(), report.decimals.err()]
                .into_iter()
                .flatten()
            {
                tracing::warn!(owner = %owner, error = %err, "Token metadata incomplete");
            }
        }
        if let Err(e) = native {
            tracing::warn!(owner = %owner, error = %e, "Native balance refresh failed");
        }
        match refresh {
            Ok(report) => {
                for err in report.errors() {
                    tracing::warn!(owner = %owner, error = %err, "Balance refresh incomplete");
                }
            }
            Err(e) => tracing::debug!(owner = %owner, error = %e, "Balance refresh skipped"),
        }
    }

    /// Follows the reconciled connection state until shutdown.
    ///
    /// A new connected owner is loaded (after the configured delay); the
    /// previous owner's entry is cleared when it disconnects or switches.
    pub fn watch_accounts(
        &self,
        mut accounts: watch::Receiver<ConnectionState>,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut previous: Option<Address> = None;
            let mut current = accounts.borrow_and_update().active_address();

            loop {
                if current != previous {
                    if let Some(old) = previous {
                        scheduler.inner.cache.clear(old);
                    }
                    if let Some(owner) = current {
                        tracing::info!(owner = %owner, "Connected owner changed, refreshing");
                        let loader = scheduler.clone();
                        let delay = scheduler.inner.address_change_delay;
                        tokio::spawn(async move {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            loader.load_owner(owner).await;
                        });
                    }
                    previous = current;
                }

                tokio::select! {
                    changed = accounts.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        current = accounts.borrow_and_update().active_address();
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::info!("Account watch stopped");
        })
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("cache", &self.inner.cache)
            .field("in_flight", &self.inner.in_flight.len())
            .field("address_change_delay", &self.inner.address_change_delay)
            .finish()
    }
}
