//! In-memory transactional key/value store.
//!
//! `MemoryStore` implements the resource boundary with optimistic
//! concurrency: writes are buffered per transaction and validated against
//! per-key versions at commit time (first committer wins). Every begin,
//! commit and rollback is appended to an event log so callers can audit how
//! transactions were resolved.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::context::{ContextError, ExecContext};
use super::id::{TransactionId, TransactionIdGenerator};
use super::options::TxOptions;
use super::resource::{Transaction, TransactionalResource};
use super::state::{TransactionInfo, TransactionState};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Transaction pool exhausted: {max_open} transactions already open")]
    PoolExhausted { max_open: usize },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Transaction {0} is read-only")]
    ReadOnly(TransactionId),

    #[error("Transaction {id} conflicts with a concurrent commit on key '{key}'")]
    Conflict { id: TransactionId, key: String },

    #[error("Transaction {0} not found")]
    NotFound(TransactionId),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Upper bound on concurrently active transactions; `None` is unlimited.
    pub max_open_transactions: Option<usize>,
}

/// One entry in the store's transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    Begin(TransactionId),
    Commit(TransactionId),
    Rollback(TransactionId),
}

impl TxEvent {
    pub fn id(&self) -> TransactionId {
        match self {
            Self::Begin(id) | Self::Commit(id) | Self::Rollback(id) => *id,
        }
    }
}

#[derive(Default)]
struct StoreData {
    values: HashMap<String, Bytes>,
    /// Bumped on every committed write or delete. Absent means 0.
    versions: HashMap<String, u64>,
}

impl StoreData {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }
}

struct StoreInner {
    config: MemoryStoreConfig,
    id_generator: TransactionIdGenerator,
    data: RwLock<StoreData>,
    transactions: RwLock<HashMap<TransactionId, TransactionInfo>>,
    events: Mutex<Vec<TxEvent>>,
}

impl StoreInner {
    /// Marks `id` finished and logs the outcome. Lock order is `data`,
    /// then `transactions`, then `events`.
    fn finish(&self, id: TransactionId, outcome: TransactionState) {
        let mut transactions = self.transactions.write();
        let finished = transactions
            .get_mut(&id)
            .map(|info| info.finish(outcome))
            .unwrap_or(false);
        if !finished {
            return;
        }

        let event = match outcome {
            TransactionState::Committed => TxEvent::Commit(id),
            _ => TxEvent::Rollback(id),
        };
        // Logged under `transactions` so cleanup never sees a finished info
        // whose event is still pending
        self.events.lock().push(event);
        drop(transactions);
        debug!("{} {}", id, outcome);
    }
}

/// Cloning is cheap; clones share the same data and transaction table.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store with no limit on open transactions.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates an empty store governed by `config`.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                id_generator: TransactionIdGenerator::new(),
                data: RwLock::new(StoreData::default()),
                transactions: RwLock::new(HashMap::new()),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.inner.config
    }

    /// Reads the last committed value for `key`, outside any transaction.
    pub fn get_committed(&self, key: &str) -> Option<Bytes> {
        self.inner.data.read().values.get(key).cloned()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.inner.data.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of `id`, or `NotFound` once it has been cleaned up.
    pub fn state(&self, id: TransactionId) -> Result<TransactionState> {
        self.info(id).map(|info| info.state)
    }

    pub fn info(&self, id: TransactionId) -> Result<TransactionInfo> {
        self.inner
            .transactions
            .read()
            .get(&id)
            .cloned()
            .ok_or(MemoryError::NotFound(id))
    }

    /// Active transaction ids in begin order.
    pub fn active_transactions(&self) -> Vec<TransactionId> {
        let mut ids: Vec<_> = self
            .inner
            .transactions
            .read()
            .values()
            .filter(|info| info.state.is_active())
            .map(|info| info.id)
            .collect();
        ids.sort();
        ids
    }

    /// Total number of tracked transactions, active and finished.
    pub fn transaction_count(&self) -> usize {
        self.inner.transactions.read().len()
    }

    /// Forgets finished transactions, along with their entries in the event
    /// log, and returns how many transactions were removed.
    pub fn cleanup_finished(&self) -> usize {
        let mut transactions = self.inner.transactions.write();
        let before = transactions.len();
        transactions.retain(|_, info| info.state.is_active());
        let removed = before - transactions.len();

        if removed > 0 {
            self.inner
                .events
                .lock()
                .retain(|event| transactions.contains_key(&event.id()));
        }
        removed
    }

    /// Snapshot of the transaction log.
    pub fn events(&self) -> Vec<TxEvent> {
        self.inner.events.lock().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionalResource for MemoryStore {
    type Error = MemoryError;
    type Transaction = MemoryTransaction;

    fn begin(&self, ctx: &ExecContext, options: &TxOptions) -> Result<MemoryTransaction> {
        ctx.check()?;

        let id = {
            let mut transactions = self.inner.transactions.write();
            if let Some(max_open) = self.inner.config.max_open_transactions {
                let open = transactions.values().filter(|info| info.state.is_active()).count();
                if open >= max_open {
                    return Err(MemoryError::PoolExhausted { max_open });
                }
            }
            let id = self.inner.id_generator.next();
            transactions.insert(id, TransactionInfo::new(id, *options));
            self.inner.events.lock().push(TxEvent::Begin(id));
            id
        };

        debug!("Began {} ({}, read_only={})", id, options.isolation, options.read_only);

        Ok(MemoryTransaction {
            id,
            options: *options,
            ctx: ctx.clone(),
            store: Arc::clone(&self.inner),
            writes: HashMap::new(),
            observed: HashMap::new(),
            resolved: false,
        })
    }
}

/// A transaction on a [`MemoryStore`]. Rolled back on drop if unresolved.
///
/// Reads see the transaction's own pending writes, otherwise the latest
/// committed value. Uncommitted writes of other transactions are never
/// visible, so `ReadUncommitted` behaves like `ReadCommitted`.
pub struct MemoryTransaction {
    id: TransactionId,
    options: TxOptions,
    ctx: ExecContext,
    store: Arc<StoreInner>,
    /// Pending writes; `None` is a delete.
    writes: HashMap<String, Option<Bytes>>,
    /// Version of each touched key when this transaction first saw it.
    observed: HashMap<String, u64>,
    resolved: bool,
}

impl MemoryTransaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn options(&self) -> &TxOptions {
        &self.options
    }

    pub fn get(&mut self, key: &str) -> Result<Option<Bytes>> {
        self.ctx.check()?;
        if let Some(pending) = self.writes.get(key) {
            return Ok(pending.clone());
        }

        let data = self.store.data.read();
        self.observed
            .entry(key.to_string())
            .or_insert_with(|| data.version(key));
        Ok(data.values.get(key).cloned())
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<()> {
        let key = self.prepare_write(key.into())?;
        self.writes.insert(key, Some(value.into()));
        Ok(())
    }

    pub fn delete(&mut self, key: impl Into<String>) -> Result<()> {
        let key = self.prepare_write(key.into())?;
        self.writes.insert(key, None);
        Ok(())
    }

    fn prepare_write(&mut self, key: String) -> Result<String> {
        self.ctx.check()?;
        if self.options.read_only {
            return Err(MemoryError::ReadOnly(self.id));
        }
        if !self.observed.contains_key(&key) {
            let version = self.store.data.read().version(&key);
            self.observed.insert(key.clone(), version);
        }
        Ok(key)
    }

    fn resolve(&mut self, outcome: TransactionState) {
        self.resolved = true;
        self.writes.clear();
        self.store.finish(self.id, outcome);
    }

    /// First key whose committed version moved since this transaction saw it.
    fn find_conflict(&self, data: &StoreData) -> Option<String> {
        let validate_reads = self.options.isolation.validates_reads();
        self.observed
            .iter()
            .filter(|(key, _)| validate_reads || self.writes.contains_key(*key))
            .find(|(key, version)| data.version(key) != **version)
            .map(|(key, _)| key.clone())
    }
}

impl Transaction for MemoryTransaction {
    type Error = MemoryError;

    fn commit(mut self) -> Result<()> {
        if let Err(err) = self.ctx.check() {
            self.resolve(TransactionState::RolledBack);
            return Err(err.into());
        }

        let store = Arc::clone(&self.store);
        let mut data = store.data.write();

        if let Some(key) = self.find_conflict(&data) {
            drop(data);
            self.resolve(TransactionState::RolledBack);
            return Err(MemoryError::Conflict { id: self.id, key });
        }

        for (key, value) in self.writes.drain() {
            *data.versions.entry(key.clone()).or_insert(0) += 1;
            match value {
                Some(value) => {
                    data.values.insert(key, value);
                }
                None => {
                    data.values.remove(&key);
                }
            }
        }

        // Still holding `data` so the commit becomes visible with its state
        self.resolve(TransactionState::Committed);
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        self.resolve(TransactionState::RolledBack);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.resolved {
            warn!("{} dropped while active; rolling back", self.id);
            self.resolve(TransactionState::RolledBack);
        }
    }
}
