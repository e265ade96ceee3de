pub mod gate;
mod snapshot;

pub use self::gate::{TransactionGate, Visibility};
pub use self::snapshot::Snapshot;

use crate::options::TxnOptions;
use crate::util::collections::{HashMap, HashSet};
use crate::{Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use slog::{debug, Logger};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum TxnState {
    Active = 0,
    Prepared = 1,
    Committed = 2,
    Aborted = 3,
}

struct TxnRecord {
    state: AtomicU8,
}

impl TxnRecord {
    fn state(&self) -> TxnState {
        TxnState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(TxnState::Aborted)
    }

    fn transition(&self, from: TxnState, to: TxnState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A reading and writing context. Transactions without a record are
/// implicit: one snapshot taken for a single cursor call.
pub struct Transaction {
    id: u64,
    snapshot: Snapshot,
    options: TxnOptions,
    record: Option<Arc<TxnRecord>>,
}

impl Transaction {
    /// Zero for implicit transactions.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TxnState {
        self.record
            .as_ref()
            .map_or(TxnState::Active, |record| record.state())
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.state() == TxnState::Prepared
    }

    /// Active or prepared.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), TxnState::Active | TxnState::Prepared)
    }

    #[inline]
    pub fn ignore_prepare(&self) -> bool {
        self.options.ignore_prepare
    }

    #[inline]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

/// Running transactions and the aborted ids still referenced by stored
/// versions. Committed transactions leave no trace: an issued id that is
/// neither running nor aborted reads as committed.
#[derive(Default)]
struct Registry {
    running: HashMap<u64, Arc<TxnRecord>>,
    aborted: HashSet<u64>,
}

/// Hands out transaction ids and tracks the state of unfinished ones.
pub struct TxnManager {
    next_id: AtomicU64,
    registry: RwLock<Registry>,
    logger: Logger,
}

impl TxnManager {
    pub fn new(logger: Logger) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registry: RwLock::new(Registry::default()),
            logger,
        }
    }

    pub fn begin(&self, options: TxnOptions) -> Arc<Transaction> {
        let mut registry = self.registry.write().unwrap();
        let snapshot = Self::take_snapshot(&self.next_id, &registry);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(TxnRecord {
            state: AtomicU8::new(TxnState::Active as u8),
        });
        registry.running.insert(id, record.clone());
        debug!(self.logger, "begin transaction"; "txn" => id);
        Arc::new(Transaction {
            id,
            snapshot,
            options,
            record: Some(record),
        })
    }

    /// A snapshot of everything committed so far.
    pub fn implicit(&self) -> Transaction {
        let registry = self.registry.read().unwrap();
        Transaction {
            id: 0,
            snapshot: Self::take_snapshot(&self.next_id, &registry),
            options: TxnOptions::default(),
            record: None,
        }
    }

    fn take_snapshot(next_id: &AtomicU64, registry: &Registry) -> Snapshot {
        let concurrent = registry.running.keys().copied().collect();
        Snapshot::new(next_id.load(Ordering::SeqCst), concurrent)
    }

    /// Number of transactions still tracked, running or aborted.
    pub fn tracked(&self) -> usize {
        let registry = self.registry.read().unwrap();
        registry.running.len() + registry.aborted.len()
    }

    pub fn prepare(&self, txn: &Transaction) -> Result<()> {
        self.transition(txn, &[TxnState::Active], TxnState::Prepared)
    }

    pub fn commit(&self, txn: &Transaction) -> Result<()> {
        self.transition(txn, &[TxnState::Active, TxnState::Prepared], TxnState::Committed)
    }

    pub fn rollback(&self, txn: &Transaction) -> Result<()> {
        self.transition(txn, &[TxnState::Active, TxnState::Prepared], TxnState::Aborted)
    }

    /// Ids never handed out read as aborted.
    pub fn state_of(&self, id: u64) -> TxnState {
        if id == 0 || id >= self.next_id.load(Ordering::SeqCst) {
            return TxnState::Aborted;
        }
        let registry = self.registry.read().unwrap();
        if let Some(record) = registry.running.get(&id) {
            return record.state();
        }
        if registry.aborted.contains(&id) {
            TxnState::Aborted
        } else {
            TxnState::Committed
        }
    }

    fn transition(&self, txn: &Transaction, from: &[TxnState], to: TxnState) -> Result<()> {
        let record = txn.record.as_ref().ok_or_else(|| {
            Error::InvalidArgument("implicit transactions cannot change state".to_owned())
        })?;
        let mut registry = self.registry.write().unwrap();
        for state in from {
            if record.transition(*state, to) {
                match to {
                    TxnState::Committed => {
                        registry.running.remove(&txn.id);
                    }
                    TxnState::Aborted => {
                        registry.running.remove(&txn.id);
                        registry.aborted.insert(txn.id);
                    }
                    TxnState::Active | TxnState::Prepared => {}
                }
                debug!(self.logger, "transaction state changed";
                    "txn" => txn.id, "from" => ?state, "to" => ?to);
                return Ok(());
            }
        }
        Err(Error::InvalidArgument(format!(
            "transaction {} cannot move from {:?} to {:?}",
            txn.id,
            record.state(),
            to
        )))
    }
}
