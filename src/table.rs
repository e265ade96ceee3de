use crate::cursor::Cursor;
use crate::key::{Key, KeyFormat};
use crate::options::{CursorOptions, TableOptions, TxnOptions};
use crate::stats::{Stats, StatsSnapshot};
use crate::storage::evictor::Evictor;
use crate::storage::mem::MemStorage;
use crate::storage::{Storage, Version};
use crate::txn::{Transaction, TxnManager, TxnState};
use crate::util::comparator::{Comparator, KeyComparator};
use crate::{Error, Result};
use bytes::Bytes;
use slog::{info, o, Logger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A table of packed keys with versioned values.
pub struct Table {
    format: KeyFormat,
    cmp: KeyComparator,
    storage: Arc<MemStorage<KeyComparator>>,
    txns: TxnManager,
    stats: Arc<Stats>,
    next_cursor_id: AtomicU64,
    logger: Logger,
}

impl Table {
    pub fn open(options: TableOptions) -> Result<Arc<Table>> {
        let format: KeyFormat = options.key_format.parse()?;
        let cmp = KeyComparator::resolve(&format);
        let logger = options
            .logger()
            .new(o!("key_format" => options.key_format.clone()));
        let stats = Arc::new(Stats::default());
        let storage = Arc::new(MemStorage::new(
            cmp.clone(),
            &options,
            stats.clone(),
            logger.new(o!("component" => "storage")),
        ));
        let txns = TxnManager::new(logger.new(o!("component" => "txn")));
        info!(logger, "table opened";
            "comparator" => cmp.name(),
            "page_capacity" => options.page_capacity,
            "compression" => ?options.compression);
        Ok(Arc::new(Table {
            format,
            cmp,
            storage,
            txns,
            stats,
            next_cursor_id: AtomicU64::new(1),
            logger,
        }))
    }

    #[inline]
    pub fn key_format(&self) -> &KeyFormat {
        &self.format
    }

    #[inline]
    pub fn comparator(&self) -> &KeyComparator {
        &self.cmp
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[inline]
    pub(crate) fn stats_ref(&self) -> &Stats {
        &self.stats
    }

    #[inline]
    pub(crate) fn logger(&self) -> &Logger {
        &self.logger
    }

    #[inline]
    pub fn storage(&self) -> &Arc<MemStorage<KeyComparator>> {
        &self.storage
    }

    #[inline]
    pub fn txn_manager(&self) -> &TxnManager {
        &self.txns
    }

    pub fn begin_transaction(&self, options: TxnOptions) -> Arc<Transaction> {
        self.txns.begin(options)
    }

    pub fn prepare(&self, txn: &Transaction) -> Result<()> {
        self.txns.prepare(txn)
    }

    pub fn commit(&self, txn: &Transaction) -> Result<()> {
        self.txns.commit(txn)
    }

    pub fn rollback(&self, txn: &Transaction) -> Result<()> {
        self.txns.rollback(txn)
    }

    /// Writes `value` under `key` in `txn`, or in its own committed
    /// transaction when `txn` is `None`.
    pub fn insert(
        &self,
        txn: Option<&Transaction>,
        key: &Key,
        value: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.write(txn, key, Some(Bytes::copy_from_slice(value.as_ref())))
    }

    /// Writes a tombstone for `key`.
    pub fn remove(&self, txn: Option<&Transaction>, key: &Key) -> Result<()> {
        self.write(txn, key, None)
    }

    fn write(&self, txn: Option<&Transaction>, key: &Key, value: Option<Bytes>) -> Result<()> {
        let packed = self.format.pack(key)?;
        match txn {
            Some(txn) => {
                if txn.id() == 0 || txn.state() != TxnState::Active {
                    return Err(Error::InvalidArgument(format!(
                        "transaction {} is {:?} and cannot write",
                        txn.id(),
                        txn.state()
                    )));
                }
                self.storage.append(packed, Version { txn_id: txn.id(), value })
            }
            None => {
                let txn = self.txns.begin(TxnOptions::default());
                let res = self
                    .storage
                    .append(packed, Version { txn_id: txn.id(), value });
                match res {
                    Ok(()) => self.txns.commit(&txn),
                    Err(e) => {
                        self.txns.rollback(&txn)?;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Evicts every resident page.
    pub fn evict_all(&self) -> Result<usize> {
        self.storage.evict_all()
    }

    /// Starts a background thread evicting this table's pages on request.
    pub fn spawn_evictor(&self) -> Result<Evictor> {
        Evictor::spawn(
            self.storage.clone(),
            self.logger.new(o!("component" => "evictor")),
        )
    }

    pub fn open_cursor(self: &Arc<Self>, options: CursorOptions) -> Cursor {
        let id = self.next_cursor_id.fetch_add(1, Ordering::Relaxed);
        Cursor::new(self.clone(), id, options)
    }
}
