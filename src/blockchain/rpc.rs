//! `ContractTransport` backed by a JSON-RPC endpoint.
//!
//! # Responsibilities
//! - Encode ERC-20 queries and writes (`erc20.rs`)
//! - Submit writes through the signing provider
//! - Poll receipts until the configured confirmation depth is reached
//! - Stop polling hashes the coordinator has forgotten

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::erc20;
use crate::blockchain::transport::{
    Confirmation, ContractCall, ContractTransport, FieldValue, TokenQuery, TransportError,
    TransportResult,
};
use crate::blockchain::types::{BlockchainError, BlockchainResult};

impl From<BlockchainError> for TransportError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::Wallet(_) | BlockchainError::NotAvailable(_) => {
                TransportError::SubmissionRejected(err.to_string())
            }
            BlockchainError::Reverted(_) | BlockchainError::ConfirmationTimeout(_) => {
                TransportError::ConfirmationFailed(err.to_string())
            }
            _ => TransportError::Unknown(err.to_string()),
        }
    }
}

/// JSON-RPC implementation of the collaborator boundary.
#[derive(Debug, Clone)]
pub struct RpcTransport {
    client: BlockchainClient,
    /// Hashes still being watched for confirmation.
    watched: Arc<DashSet<TxHash>>,
}

impl RpcTransport {
    pub fn new(client: BlockchainClient) -> Self {
        Self {
            client,
            watched: Arc::new(DashSet::new()),
        }
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    async fn poll_receipt(&self, hash: TxHash) -> TransportResult<Confirmation> {
        poll_until_confirmed(
            &self.client,
            &self.watched,
            hash,
            self.client.confirmation_blocks() as u64,
            Duration::from_millis(self.client.config().confirmation_poll_ms),
        )
        .await
    }
}

/// The parts of a receipt confirmation polling needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReceiptInfo {
    succeeded: bool,
    block_number: Option<u64>,
}

#[async_trait]
trait ReceiptSource: Send + Sync {
    async fn receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>>;
    async fn head(&self) -> BlockchainResult<u64>;
}

#[async_trait]
impl ReceiptSource for BlockchainClient {
    async fn receipt(&self, hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        Ok(self
            .get_transaction_receipt(hash)
            .await?
            .map(|receipt| ReceiptInfo {
                succeeded: receipt.status(),
                block_number: receipt.block_number,
            }))
    }

    async fn head(&self) -> BlockchainResult<u64> {
        self.get_block_number().await
    }
}

/// Polls until `hash` is mined with `required` confirmations, reverts, or
/// stops being watched. Lookup errors are retried on the next tick.
async fn poll_until_confirmed<S: ReceiptSource + ?Sized>(
    source: &S,
    watched: &DashSet<TxHash>,
    hash: TxHash,
    required: u64,
    every: Duration,
) -> TransportResult<Confirmation> {
    let mut ticker = interval(every);

    loop {
        ticker.tick().await;

        if !watched.contains(&hash) {
            return Err(TransportError::ConfirmationFailed(
                "confirmation watch was cancelled".to_string(),
            ));
        }

        let receipt = match source.receipt(hash).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::debug!(tx_hash = %hash, "Transaction pending");
                continue;
            }
            Err(e) => {
                tracing::warn!(tx_hash = %hash, error = %e, "Receipt lookup failed, will retry");
                continue;
            }
        };

        if !receipt.succeeded {
            return Ok(Confirmation::Failed("transaction reverted".to_string()));
        }

        if required <= 1 {
            if let Some(block_number) = receipt.block_number {
                return Ok(Confirmation::Confirmed { block_number });
            }
        }

        let current_block = match source.head().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    tx_hash = %hash,
                    error = %e,
                    "Block number lookup failed, will retry"
                );
                continue;
            }
        };
        let tx_block = receipt.block_number.unwrap_or(current_block);
        let confirmations = current_block.saturating_sub(tx_block) + 1;

        if confirmations >= required {
            return Ok(Confirmation::Confirmed {
                block_number: tx_block,
            });
        }

        tracing::debug!(
            tx_hash = %hash,
            confirmations = confirmations,
            required = required,
            "Waiting for confirmations"
        );
    }
}

#[async_trait]
impl ContractTransport for RpcTransport {
    async fn read_contract_field(
        &self,
        token: Address,
        query: TokenQuery,
    ) -> TransportResult<FieldValue> {
        let data = self.client.call(token, erc20::encode_query(&query)).await?;
        Ok(erc20::decode_query(&query, &data)?)
    }

    async fn write_contract(&self, call: ContractCall) -> TransportResult<TxHash> {
        let data = erc20::encode_function(&call.function);
        let hash = self
            .client
            .send_transaction(call.target, data)
            .await
            .map_err(|e| match e {
                BlockchainError::Timeout(_) => TransportError::Unknown(e.to_string()),
                other => TransportError::SubmissionRejected(other.to_string()),
            })?;

        self.watched.insert(hash);
        tracing::info!(
            tx_hash = %hash,
            target = %call.target,
            function = call.function.name(),
            "Transaction submitted"
        );
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> TransportResult<Confirmation> {
        let result = match self.client.config().confirmation_timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), self.poll_receipt(hash)).await {
                Ok(result) => result,
                Err(_) => Err(BlockchainError::ConfirmationTimeout(secs).into()),
            },
            None => self.poll_receipt(hash).await,
        };

        self.watched.remove(&hash);
        result
    }

    async fn read_native_balance(&self, owner: Address) -> TransportResult<U256> {
        Ok(self.client.get_balance(owner).await?)
    }

    fn forget(&self, hash: TxHash) {
        if self.watched.remove(&hash).is_some() {
            tracing::debug!(tx_hash = %hash, "Stopped watching transaction");
        }
    }
}
