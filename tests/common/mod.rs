//! Shared utilities for integration tests: a scripted in-memory transport
//! and session builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::watch;

use wallet_coordinator::account::{ConnectionSnapshot, DeviceClass, SourceClass};
use wallet_coordinator::blockchain::{
    Confirmation, ContractCall, ContractFunction, ContractTransport, FieldValue, TokenQuery,
    TransportError, TransportResult,
};
use wallet_coordinator::config::{ContractAddresses, CoordinatorConfig};
use wallet_coordinator::WalletSession;

pub const TOKEN: Address = Address::repeat_byte(0x10);
pub const SPENDER: Address = Address::repeat_byte(0x20);
pub const SOURCE_WALLET: Address = Address::repeat_byte(0x30);
pub const RECIPIENT: Address = Address::repeat_byte(0x40);
pub const OWNER: Address = Address::repeat_byte(0x50);
pub const OTHER_OWNER: Address = Address::repeat_byte(0x60);

pub const RECIPIENT_TEXT: &str = "0x7070707070707070707070707070707070707070";

pub fn contracts() -> ContractAddresses {
    ContractAddresses {
        token: TOKEN,
        spender: SPENDER,
        source_wallet: SOURCE_WALLET,
        recipient: RECIPIENT,
    }
}

/// `n` whole tokens at 18 decimals.
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    native: HashMap<Address, U256>,
}

/// In-memory ERC-20 with scripted failures and manually settled writes.
///
/// Writes are accepted immediately (unless rejection is scripted) and stay
/// unconfirmed until [`settle`](Self::settle) is called for their hash. A
/// confirmed write is applied to the ledger as if the signer were `signer`.
pub struct MockTransport {
    signer: Address,
    ledger: Mutex<Ledger>,
    decimals: u8,
    failing: Mutex<HashSet<&'static str>>,
    read_delay: Mutex<Duration>,
    reads: Mutex<HashMap<&'static str, usize>>,
    reject: Mutex<Option<String>>,
    writes: Mutex<Vec<ContractCall>>,
    pending: Mutex<HashMap<TxHash, ContractCall>>,
    settled: watch::Sender<HashMap<TxHash, Confirmation>>,
    forgotten: Mutex<Vec<TxHash>>,
    next_hash: AtomicU64,
}

impl MockTransport {
    pub fn new(signer: Address) -> Self {
        let (settled, _) = watch::channel(HashMap::new());
        Self {
            signer,
            ledger: Mutex::new(Ledger::default()),
            decimals: 18,
            failing: Mutex::new(HashSet::new()),
            read_delay: Mutex::new(Duration::ZERO),
            reads: Mutex::new(HashMap::new()),
            reject: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            settled,
            forgotten: Mutex::new(Vec::new()),
            next_hash: AtomicU64::new(1),
        }
    }

    pub fn set_balance(&self, owner: Address, amount: U256) {
        self.ledger.lock().unwrap().balances.insert(owner, amount);
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, amount: U256) {
        self.ledger
            .lock()
            .unwrap()
            .allowances
            .insert((owner, spender), amount);
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.ledger.lock().unwrap().native.insert(owner, amount);
    }

    /// Makes reads of `function` (ABI name, or `nativeBalance`) fail.
    pub fn fail_reads(&self, function: &'static str) {
        self.failing.lock().unwrap().insert(function);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn reject_writes(&self, message: &str) {
        *self.reject.lock().unwrap() = Some(message.to_string());
    }

    pub fn read_count(&self, function: &str) -> usize {
        self.reads.lock().unwrap().get(function).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<ContractCall> {
        self.writes.lock().unwrap().clone()
    }

    pub fn forgotten(&self) -> Vec<TxHash> {
        self.forgotten.lock().unwrap().clone()
    }

    /// Resolves the confirmation wait for `hash`.
    pub fn settle(&self, hash: TxHash, outcome: Confirmation) {
        let call = self.pending.lock().unwrap().remove(&hash);
        if let (Some(call), Confirmation::Confirmed { .. }) = (call, &outcome) {
            self.apply(call);
        }
        self.settled.send_modify(|settled| {
            settled.insert(hash, outcome);
        });
    }

    fn apply(&self, call: ContractCall) {
        let mut ledger = self.ledger.lock().unwrap();
        match call.function {
            ContractFunction::Approve { spender, amount } => {
                ledger.allowances.insert((self.signer, spender), amount);
            }
            ContractFunction::Transfer { to, amount } => {
                let from = ledger.balances.entry(self.signer).or_default();
                *from = from.saturating_sub(amount);
                *ledger.balances.entry(to).or_default() += amount;
            }
            ContractFunction::TransferFrom { from, to, amount } => {
                let source = ledger.balances.entry(from).or_default();
                *source = source.saturating_sub(amount);
                *ledger.balances.entry(to).or_default() += amount;
                let allowance = ledger.allowances.entry((from, call.target)).or_default();
                *allowance = allowance.saturating_sub(amount);
            }
        }
    }

    fn count_read(&self, function: &'static str) -> TransportResult<()> {
        *self.reads.lock().unwrap().entry(function).or_default() += 1;
        if self.failing.lock().unwrap().contains(function) {
            return Err(TransportError::Unknown(format!("{function} reverted")));
        }
        Ok(())
    }

    /// Answers after the configured read delay. Values are taken when the
    /// request arrives, like a node serving a snapshot of its head.
    async fn respond<T>(&self, answer: TransportResult<T>) -> TransportResult<T> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

#[async_trait]
impl ContractTransport for MockTransport {
    async fn read_contract_field(
        &self,
        token: Address,
        query: TokenQuery,
    ) -> TransportResult<FieldValue> {
        assert_eq!(token, TOKEN, "reads must target the configured token");
        let answer = self.count_read(query.function_name()).map(|()| {
            let ledger = self.ledger.lock().unwrap();
            match query {
                TokenQuery::Name => FieldValue::Text("Test Token".into()),
                TokenQuery::Symbol => FieldValue::Text("TST".into()),
                TokenQuery::Decimals => FieldValue::Decimals(self.decimals),
                TokenQuery::BalanceOf { owner } => {
                    FieldValue::Amount(ledger.balances.get(&owner).copied().unwrap_or_default())
                }
                TokenQuery::Allowance { owner, spender } => FieldValue::Amount(
                    ledger
                        .allowances
                        .get(&(owner, spender))
                        .copied()
                        .unwrap_or_default(),
                ),
            }
        });
        self.respond(answer).await
    }

    async fn write_contract(&self, call: ContractCall) -> TransportResult<TxHash> {
        self.writes.lock().unwrap().push(call);
        if let Some(message) = self.reject.lock().unwrap().clone() {
            return Err(TransportError::SubmissionRejected(message));
        }
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        let hash = TxHash::left_padding_from(&n.to_be_bytes());
        self.pending.lock().unwrap().insert(hash, call);
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> TransportResult<Confirmation> {
        let mut settled = self.settled.subscribe();
        let outcome = settled
            .wait_for(|settled| settled.contains_key(&hash))
            .await
            .map_err(|e| TransportError::Unknown(e.to_string()))?
            .get(&hash)
            .cloned();
        outcome.ok_or_else(|| TransportError::Unknown("missing outcome".into()))
    }

    async fn read_native_balance(&self, owner: Address) -> TransportResult<U256> {
        let answer = self.count_read("nativeBalance").map(|()| {
            self.ledger
                .lock()
                .unwrap()
                .native
                .get(&owner)
                .copied()
                .unwrap_or_default()
        });
        self.respond(answer).await
    }

    fn forget(&self, hash: TxHash) {
        self.forgotten.lock().unwrap().push(hash);
    }
}

/// Config with short refresh delays.
pub fn test_config() -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.refresh.post_success_delay_ms = 20;
    config.refresh.address_change_delay_ms = 0;
    config
}

pub fn start_session(transport: Arc<MockTransport>, device: DeviceClass) -> WalletSession {
    WalletSession::with_device(contracts(), device, &test_config(), transport)
}

/// Connects `owner` through the primary provider.
pub fn connect(session: &WalletSession, owner: Address) {
    session
        .reconciler()
        .update(SourceClass::Primary, ConnectionSnapshot::connected(owner));
}

pub fn disconnect(session: &WalletSession) {
    session
        .reconciler()
        .update(SourceClass::Primary, ConnectionSnapshot::disconnected());
    session
        .reconciler()
        .update(SourceClass::Secondary, ConnectionSnapshot::disconnected());
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
