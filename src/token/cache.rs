//! Token metadata cache.
//!
//! Entries are keyed by (token, owner). Reads go through the transport only
//! for the owner the reconciled connection state reports as connected; any
//! other owner is refused with [`CacheError::Disabled`]. Results that land
//! after the owner disconnected are dropped rather than stored.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::account::ConnectionState;
use crate::blockchain::transport::{ContractTransport, FieldValue, TokenQuery, TransportError};
use crate::observability::metrics;
use crate::token::types::{
    CacheError, CacheKey, FieldError, MetadataReport, RefreshReport, TokenField, TokenMetadata,
};

/// A concurrent cache of token state per owner.
pub struct TokenCache {
    token: Address,
    spender: Address,
    transport: Arc<dyn ContractTransport>,
    accounts: watch::Receiver<ConnectionState>,
    entries: DashMap<CacheKey, TokenMetadata>,
}

impl TokenCache {
    /// `spender` is the address allowances are queried for.
    pub fn new(
        token: Address,
        spender: Address,
        transport: Arc<dyn ContractTransport>,
        accounts: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            token,
            spender,
            transport,
            accounts,
            entries: DashMap::new(),
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Owner queries may currently run for.
    pub fn active_owner(&self) -> Option<Address> {
        self.accounts.borrow().active_address()
    }

    fn key(&self, owner: Address) -> CacheKey {
        CacheKey {
            token: self.token,
            owner,
        }
    }

    fn ensure_enabled(&self, owner: Address) -> Result<(), CacheError> {
        if self.active_owner() == Some(owner) {
            Ok(())
        } else {
            Err(CacheError::Disabled)
        }
    }

    /// Snapshot of the cached entry for `owner`. Never performs I/O.
    pub fn metadata(&self, owner: Address) -> TokenMetadata {
        self.entries
            .get(&self.key(owner))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot for the connected owner, or an empty entry.
    pub fn current(&self) -> TokenMetadata {
        self.active_owner()
            .map(|owner| self.metadata(owner))
            .unwrap_or_default()
    }

    /// Drops the entry for `owner`.
    pub fn clear(&self, owner: Address) {
        if self.entries.remove(&self.key(owner)).is_some() {
            tracing::debug!(owner = %owner, token = %self.token, "Token cache entry cleared");
        }
    }

    /// Applies a fetched value if `owner` is still the connected owner.
    fn store(&self, owner: Address, apply: impl FnOnce(&mut TokenMetadata)) -> bool {
        if self.active_owner() != Some(owner) {
            tracing::debug!(owner = %owner, "Discarding fetch result for inactive owner");
            return false;
        }
        let mut entry = self.entries.entry(self.key(owner)).or_default();
        apply(entry.value_mut());
        true
    }

    async fn read(&self, field: TokenField, query: TokenQuery) -> Result<FieldValue, FieldError> {
        let result = self
            .transport
            .read_contract_field(self.token, query)
            .await
            .map_err(|e| FieldError {
                field,
                message: e.to_string(),
            });
        metrics::record_refresh(field.as_str(), result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(token = %self.token, error = %e, "Token read failed");
        }
        result
    }

    fn conversion_error(field: TokenField) -> impl FnOnce(TransportError) -> FieldError {
        move |e| FieldError {
            field,
            message: e.to_string(),
        }
    }

    async fn fetch_balance(&self, owner: Address) -> Result<U256, FieldError> {
        let field = TokenField::Balance;
        let balance = self
            .read(field, TokenQuery::BalanceOf { owner })
            .await?
            .into_amount()
            .map_err(Self::conversion_error(field))?;
        self.store(owner, |meta| meta.balance = Some(balance));
        Ok(balance)
    }

    async fn fetch_allowance(&self, owner: Address) -> Result<U256, FieldError> {
        let field = TokenField::Allowance;
        let query = TokenQuery::Allowance {
            owner,
            spender: self.spender,
        };
        let allowance = self
            .read(field, query)
            .await?
            .into_amount()
            .map_err(Self::conversion_error(field))?;
        self.store(owner, |meta| meta.allowance = Some(allowance));
        Ok(allowance)
    }

    async fn fetch_text(&self, owner: Address, field: TokenField) -> Result<String, FieldError> {
        let query = match field {
            TokenField::Symbol => TokenQuery::Symbol,
            _ => TokenQuery::Name,
        };
        let text = self
            .read(field, query)
            .await?
            .into_text()
            .map_err(Self::conversion_error(field))?;
        let stored = text.clone();
        self.store(owner, |meta| match field {
            TokenField::Symbol => meta.symbol = Some(stored),
            _ => meta.name = Some(stored),
        });
        Ok(text)
    }

    async fn fetch_decimals(&self, owner: Address) -> Result<u8, FieldError> {
        let field = TokenField::Decimals;
        let decimals = self
            .read(field, TokenQuery::Decimals)
            .await?
            .into_decimals()
            .map_err(Self::conversion_error(field))?;
        self.store(owner, |meta| meta.decimals = Some(decimals));
        Ok(decimals)
    }

    /// Re-fetches balance only.
    pub async fn refresh_balance(&self, owner: Address) -> Result<U256, CacheError> {
        self.ensure_enabled(owner)?;
        Ok(self.fetch_balance(owner).await?)
    }

    /// Re-fetches allowance only.
    pub async fn refresh_allowance(&self, owner: Address) -> Result<U256, CacheError> {
        self.ensure_enabled(owner)?;
        Ok(self.fetch_allowance(owner).await?)
    }

    /// Re-fetches the native currency balance.
    pub async fn refresh_native_balance(&self, owner: Address) -> Result<U256, CacheError> {
        self.ensure_enabled(owner)?;
        let field = TokenField::NativeBalance;
        let result = self.transport.read_native_balance(owner).await;
        metrics::record_refresh(field.as_str(), result.is_ok());
        let balance = result.map_err(Self::conversion_error(field))?;
        self.store(owner, |meta| meta.native_balance = Some(balance));
        Ok(balance)
    }

    /// Re-fetches balance and allowance concurrently.
    ///
    /// Resolves once both reads have finished; each field succeeds or fails
    /// on its own.
    pub async fn refresh_for(&self, owner: Address) -> Result<RefreshReport, CacheError> {
        self.ensure_enabled(owner)?;
        let (balance, allowance) =
            tokio::join!(self.fetch_balance(owner), self.fetch_allowance(owner));

        let report = RefreshReport {
            owner,
            balance,
            allowance,
        };
        tracing::debug!(
            owner = %owner,
            balance_ok = report.balance.is_ok(),
            allowance_ok = report.allowance.is_ok(),
            "Balance refresh finished"
        );
        Ok(report)
    }

    /// Fetches name, symbol and decimals concurrently.
    pub async fn load_metadata_for(&self, owner: Address) -> Result<MetadataReport, CacheError> {
        self.ensure_enabled(owner)?;
        let (name, symbol, decimals) = tokio::join!(
            self.fetch_text(owner, TokenField::Name),
            self.fetch_text(owner, TokenField::Symbol),
            self.fetch_decimals(owner),
        );
        Ok(MetadataReport {
            name,
            symbol,
            decimals,
        })
    }

    /// [`refresh_for`](Self::refresh_for) the connected owner.
    pub async fn refresh(&self) -> Result<RefreshReport, CacheError> {
        let owner = self.active_owner().ok_or(CacheError::Disabled)?;
        self.refresh_for(owner).await
    }

    /// [`load_metadata_for`](Self::load_metadata_for) the connected owner.
    pub async fn load_metadata(&self) -> Result<MetadataReport, CacheError> {
        let owner = self.active_owner().ok_or(CacheError::Disabled)?;
        self.load_metadata_for(owner).await
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("token", &self.token)
            .field("spender", &self.spender)
            .field("entries", &self.entries.len())
            .finish()
    }
}
