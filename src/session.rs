//! Wires the reconciler, cache, refresh scheduler and transaction
//! controller into one running session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::account::{AccountReconciler, ConnectionProvider, ConnectionState, DeviceClass};
use crate::blockchain::ContractTransport;
use crate::config::{ConfigError, ContractAddresses, CoordinatorConfig};
use crate::lifecycle::Shutdown;
use crate::refresh::RefreshScheduler;
use crate::token::TokenCache;
use crate::transaction::{TransactionController, TransactionRecord};

/// Display view of the session, as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub connection: ConnectionState,
    pub token: TokenStatus,
    pub transaction: TransactionRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: u8,
    pub balance: String,
    pub allowance: String,
    pub native_balance: String,
}

/// A running coordinator session.
pub struct WalletSession {
    contracts: ContractAddresses,
    reconciler: AccountReconciler,
    cache: Arc<TokenCache>,
    scheduler: RefreshScheduler,
    controller: TransactionController,
    shutdown: Shutdown,
    poll_interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl WalletSession {
    /// Builds a session and starts the account watch.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        config: &CoordinatorConfig,
        transport: Arc<dyn ContractTransport>,
    ) -> Result<Self, ConfigError> {
        let contracts =
            ContractAddresses::from_config(&config.contracts).map_err(ConfigError::Validation)?;
        let device = DeviceClass::detect(&config.device);
        Ok(Self::with_device(contracts, device, config, transport))
    }

    /// Like [`start`](Self::start) with explicit addresses and device class.
    pub fn with_device(
        contracts: ContractAddresses,
        device: DeviceClass,
        config: &CoordinatorConfig,
        transport: Arc<dyn ContractTransport>,
    ) -> Self {
        let refresh = &config.refresh;
        let reconciler = AccountReconciler::new(device);
        let cache = Arc::new(TokenCache::new(
            contracts.token,
            contracts.spender,
            transport.clone(),
            reconciler.subscribe(),
        ));
        let scheduler = RefreshScheduler::new(
            cache.clone(),
            Duration::from_millis(refresh.address_change_delay_ms),
        );
        let controller = TransactionController::new(
            contracts,
            transport,
            reconciler.subscribe(),
            scheduler.clone(),
            Duration::from_millis(refresh.post_success_delay_ms),
        );

        let shutdown = Shutdown::new();
        let watch = scheduler.watch_accounts(reconciler.subscribe(), shutdown.subscribe());

        tracing::info!(
            token = %contracts.token,
            spender = %contracts.spender,
            device = ?device,
            "Wallet session started"
        );

        Self {
            contracts,
            reconciler,
            cache,
            scheduler,
            controller,
            shutdown,
            poll_interval: Duration::from_millis(refresh.connection_poll_interval_ms),
            tasks: vec![watch],
        }
    }

    /// Feeds `provider` into the reconciler until shutdown.
    pub fn attach_provider(&mut self, provider: Arc<dyn ConnectionProvider>) {
        let task = self
            .reconciler
            .spawn_polling(provider, self.poll_interval, self.shutdown.subscribe());
        self.tasks.push(task);
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn reconciler(&self) -> &AccountReconciler {
        &self.reconciler
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn controller(&self) -> &TransactionController {
        &self.controller
    }

    pub fn status(&self) -> SessionStatus {
        let meta = self.cache.current();
        SessionStatus {
            connection: self.reconciler.current(),
            token: TokenStatus {
                address: self.contracts.token.to_checksum(None),
                name: meta.name.clone(),
                symbol: meta.symbol.clone(),
                decimals: meta.decimals_or_default(),
                balance: meta.formatted_balance(),
                allowance: meta.formatted_allowance(),
                native_balance: meta.formatted_native_balance(),
            },
            transaction: self.controller.record(),
        }
    }

    /// Stops background tasks and waits for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
        tracing::info!("Wallet session stopped");
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("contracts", &self.contracts)
            .field("cache", &self.cache)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
