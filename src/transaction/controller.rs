//! Transaction lifecycle controller.
//!
//! Every write follows the same template: validate, convert, enter
//! `Pending`, submit, record the hash, then observe confirmation from a
//! spawned task. All record updates go through [`state::apply`].

use alloy::primitives::{Address, TxHash, U256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::account::ConnectionState;
use crate::blockchain::transport::{
    Confirmation, ContractCall, ContractFunction, ContractTransport, TransportError,
};
use crate::config::ContractAddresses;
use crate::observability::metrics;
use crate::refresh::RefreshScheduler;
use crate::token::TokenCache;
use crate::transaction::state::{self, TransactionRecord, TxAction, TxEvent, TxStatus};
use crate::validation::{check_allowance, validate_transfer, ValidationContext, ValidationError};

/// Errors returned by the write entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Another write is still pending.
    #[error("a transaction is already pending")]
    Busy,
}

fn validation_reason(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::NotConnected => "not_connected",
        ValidationError::InvalidAmount(_) => "invalid_amount",
        ValidationError::InvalidAddress => "invalid_address",
        ValidationError::InsufficientBalance => "insufficient_balance",
        ValidationError::InsufficientAllowance => "insufficient_allowance",
    }
}

struct Inner {
    contracts: ContractAddresses,
    transport: Arc<dyn ContractTransport>,
    accounts: watch::Receiver<ConnectionState>,
    cache: Arc<TokenCache>,
    scheduler: RefreshScheduler,
    record: watch::Sender<TransactionRecord>,
    post_success_delay: Duration,
}

/// Owner of the transaction record.
#[derive(Clone)]
pub struct TransactionController {
    inner: Arc<Inner>,
}

impl TransactionController {
    pub fn new(
        contracts: ContractAddresses,
        transport: Arc<dyn ContractTransport>,
        accounts: watch::Receiver<ConnectionState>,
        scheduler: RefreshScheduler,
        post_success_delay: Duration,
    ) -> Self {
        let (record, _) = watch::channel(TransactionRecord::default());
        Self {
            inner: Arc::new(Inner {
                contracts,
                transport,
                accounts,
                cache: scheduler.cache().clone(),
                scheduler,
                record,
                post_success_delay,
            }),
        }
    }

    /// Current record snapshot.
    pub fn record(&self) -> TransactionRecord {
        self.inner.record.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionRecord> {
        self.inner.record.subscribe()
    }

    /// Grants the configured spender `amount` of the token.
    pub async fn approve_token(&self, amount: &str) -> Result<TxHash, TxError> {
        self.execute(TxAction::Approve, amount, None).await
    }

    /// Transfers `amount` of the token from the connected owner to `to`.
    pub async fn transfer_token(&self, to: &str, amount: &str) -> Result<TxHash, TxError> {
        self.execute(TxAction::Transfer, amount, Some(to)).await
    }

    /// Moves `amount` from the source wallet to the configured recipient
    /// through the spender contract. Requires a sufficient cached allowance.
    pub async fn transfer_from_contract(&self, amount: &str) -> Result<TxHash, TxError> {
        self.execute(TxAction::TransferFrom, amount, None).await
    }

    /// Returns the record to `Idle` and stops watching its hash.
    pub fn reset_transaction(&self) {
        let hash = self.inner.record.borrow().hash;
        self.transition(TxEvent::Reset);
        if let Some(hash) = hash {
            self.inner.transport.forget(hash);
        }
    }

    fn validation_context(&self) -> ValidationContext {
        let connection = *self.inner.accounts.borrow();
        let meta = connection
            .active_address()
            .map(|owner| self.inner.cache.metadata(owner))
            .unwrap_or_default();
        ValidationContext {
            connected: connection.active_address().is_some(),
            decimals: meta.decimals_or_default(),
            balance: meta.balance,
            allowance: meta.allowance,
        }
    }

    fn build_call(&self, action: TxAction, amount: U256, to: Option<Address>) -> ContractCall {
        let contracts = &self.inner.contracts;
        match action {
            TxAction::Approve => ContractCall {
                target: contracts.token,
                function: ContractFunction::Approve {
                    spender: contracts.spender,
                    amount,
                },
            },
            TxAction::Transfer => ContractCall {
                target: contracts.token,
                function: ContractFunction::Transfer {
                    to: to.unwrap_or(contracts.recipient),
                    amount,
                },
            },
            TxAction::TransferFrom => ContractCall {
                target: contracts.spender,
                function: ContractFunction::TransferFrom {
                    from: contracts.source_wallet,
                    to: contracts.recipient,
                    amount,
                },
            },
        }
    }

    /// Posts `event` to the record. Returns whether it changed.
    fn transition(&self, event: TxEvent) -> bool {
        let mut entered = None;
        let changed = self.inner.record.send_if_modified(|record| {
            let before = record.status;
            match state::apply(record, event) {
                Ok(changed) => {
                    if record.status != before {
                        entered = Some((before, record.status));
                    }
                    changed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Transaction event rejected");
                    false
                }
            }
        });
        if let Some((from, to)) = entered {
            tracing::info!(from = %from, to = %to, "Transaction status changed");
            metrics::record_transition(to.as_str());
        }
        changed
    }

    /// Enters `Pending` for `action`, resetting a finished record first.
    /// Returns the new submission id.
    fn begin(&self, action: TxAction) -> Result<u64, TxError> {
        let mut outcome = Err(TxError::Busy);
        let mut forgotten = None;
        let mut left = None;

        self.inner.record.send_if_modified(|record| {
            if record.status == TxStatus::Pending {
                return false;
            }
            if record.status.is_terminal() {
                forgotten = record.hash;
            }
            left = Some(record.status);
            let applied = state::apply(record, TxEvent::Reset)
                .and_then(|_| state::apply(record, TxEvent::Submit { action }));
            match applied {
                Ok(_) => outcome = Ok(record.submission),
                Err(e) => tracing::warn!(error = %e, "Transaction event rejected"),
            }
            true
        });

        if let Some(hash) = forgotten {
            self.inner.transport.forget(hash);
        }
        if let (Ok(submission), Some(from)) = (&outcome, left) {
            tracing::info!(
                from = %from,
                to = %TxStatus::Pending,
                submission = *submission,
                action = ?action,
                "Transaction status changed"
            );
            metrics::record_transition(TxStatus::Pending.as_str());
        }
        outcome
    }

    async fn execute(
        &self,
        action: TxAction,
        amount: &str,
        recipient: Option<&str>,
    ) -> Result<TxHash, TxError> {
        if self.inner.record.borrow().status == TxStatus::Pending {
            return Err(TxError::Busy);
        }

        let ctx = self.validation_context();
        let validated = validate_transfer(&ctx, amount, recipient).and_then(|validated| {
            if action == TxAction::TransferFrom && !check_allowance(&ctx, amount) {
                Err(ValidationError::InsufficientAllowance)
            } else {
                Ok(validated)
            }
        });
        let validated = match validated {
            Ok(validated) => validated,
            Err(e) => {
                tracing::info!(action = ?action, error = %e, "Transaction refused by validation");
                metrics::record_validation_failure(validation_reason(&e));
                self.transition(TxEvent::Invalid {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let call = self.build_call(action, validated.amount, validated.recipient);
        let submission = self.begin(action)?;

        match self.inner.transport.write_contract(call).await {
            Ok(hash) => {
                tracing::info!(
                    hash = %hash,
                    function = call.function.name(),
                    target = %call.target,
                    "Transaction submitted"
                );
                self.transition(TxEvent::Accepted { submission, hash });
                self.spawn_confirmation(submission, hash);
                Ok(hash)
            }
            Err(e) => {
                tracing::warn!(
                    function = call.function.name(),
                    error = %e,
                    "Transaction submission failed"
                );
                self.transition(TxEvent::Failed {
                    submission,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn spawn_confirmation(&self, submission: u64, hash: TxHash) {
        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = controller.inner.transport.wait_for_confirmation(hash).await;
            let event = match outcome {
                Ok(Confirmation::Confirmed { block_number }) => {
                    tracing::info!(hash = %hash, block = block_number, "Transaction confirmed");
                    TxEvent::Confirmed { submission }
                }
                Ok(Confirmation::Failed(message)) => {
                    tracing::warn!(hash = %hash, reason = %message, "Transaction failed");
                    TxEvent::Failed { submission, message }
                }
                Err(e) => {
                    tracing::warn!(hash = %hash, error = %e, "Confirmation wait failed");
                    TxEvent::Failed {
                        submission,
                        message: e.to_string(),
                    }
                }
            };

            let succeeded = matches!(event, TxEvent::Confirmed { .. });
            if succeeded {
                controller.inner.scheduler.mark_stale();
            }
            if controller.transition(event) && succeeded {
                controller.schedule_post_success_refresh();
            }
        });
    }

    fn schedule_post_success_refresh(&self) {
        match self.inner.accounts.borrow().active_address() {
            Some(owner) => {
                self.inner
                    .scheduler
                    .schedule_refresh(owner, self.inner.post_success_delay);
            }
            None => tracing::debug!("Skipping post-success refresh: wallet disconnected"),
        }
    }
}

impl std::fmt::Debug for TransactionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionController")
            .field("contracts", &self.inner.contracts)
            .field("record", &*self.inner.record.borrow())
            .finish()
    }
}
