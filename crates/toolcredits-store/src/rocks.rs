//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait
//! on top of an optimistic transaction database. Keys read inside a
//! transaction are validated at commit; if another commit changed them the
//! whole transaction is rerun.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, MultiThreaded,
    OptimisticTransactionDB, Options, Transaction,
};

use crate::error::{Result, StoreError};
use crate::keys::prefix_upper_bound;
use crate::schema::all_column_families;
use crate::{RawTxn, ScanOrder, Store, Tx};

type Db = OptimisticTransactionDB<MultiThreaded>;

/// Default number of attempts before a conflicting transaction gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
    max_attempts: u32,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, path, cf_descriptors).map_err(db_error)?;

        Ok(Self {
            db: Arc::new(db),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Override how many times a conflicting transaction is attempted.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

fn db_error(err: rocksdb::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn is_conflict(err: &rocksdb::Error) -> bool {
    matches!(err.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
}

fn cf_handle<'db>(db: &'db Db, name: &str) -> Result<Arc<BoundColumnFamily<'db>>> {
    db.cf_handle(name)
        .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
}

struct RocksTxn<'t, 'db> {
    db: &'db Db,
    txn: &'t Transaction<'db, Db>,
}

impl RawTxn for RocksTxn<'_, '_> {
    fn get_for_update(&mut self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let handle = cf_handle(self.db, cf)?;
        self.txn
            .get_for_update_cf(&handle, key, true)
            .map_err(db_error)
    }

    fn put(&mut self, cf: &'static str, key: &[u8], value: &[u8]) -> Result<()> {
        let handle = cf_handle(self.db, cf)?;
        self.txn.put_cf(&handle, key, value).map_err(db_error)
    }
}

impl Store for RocksStore {
    fn transaction<T, E, F>(&self, mut f: F) -> std::result::Result<T, E>
    where
        F: FnMut(&mut Tx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let db = self.db.as_ref();

        for attempt in 1..=self.max_attempts {
            let txn = db.transaction();
            let outcome = {
                let mut raw = RocksTxn { db, txn: &txn };
                let mut tx = Tx::new(&mut raw);
                f(&mut tx)
            };

            let value = match outcome {
                Ok(value) => value,
                Err(err) => {
                    if let Err(e) = txn.rollback() {
                        tracing::warn!(error = %e, "Failed to roll back transaction");
                    }
                    return Err(err);
                }
            };

            match txn.commit() {
                Ok(()) => return Ok(value),
                Err(e) if is_conflict(&e) => {
                    tracing::debug!(attempt, error = %e, "Transaction conflict, retrying");
                }
                Err(e) => return Err(db_error(e).into()),
            }
        }

        tracing::warn!(attempts = self.max_attempts, "Transaction retry budget exhausted");
        Err(StoreError::Conflict {
            attempts: self.max_attempts,
        }
        .into())
    }

    fn get_raw(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let handle = cf_handle(&self.db, cf)?;
        self.db.get_cf(&handle, key).map_err(db_error)
    }

    fn scan_prefix(
        &self,
        cf: &'static str,
        prefix: &[u8],
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let handle = cf_handle(&self.db, cf)?;
        let upper = prefix_upper_bound(prefix);

        let mode = match (order, upper.as_deref()) {
            (ScanOrder::Ascending, _) if prefix.is_empty() => IteratorMode::Start,
            (ScanOrder::Ascending, _) => IteratorMode::From(prefix, Direction::Forward),
            (ScanOrder::Descending, Some(bound)) if !prefix.is_empty() => {
                IteratorMode::From(bound, Direction::Reverse)
            }
            (ScanOrder::Descending, _) => IteratorMode::End,
        };

        let limit = limit.unwrap_or(usize::MAX);
        let mut pairs = Vec::new();
        for item in self.db.iterator_cf(&handle, mode) {
            if pairs.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(db_error)?;

            // A reverse seek lands on the last key <= bound, which may be the
            // bound itself.
            if upper.as_deref().is_some_and(|bound| &*key >= bound) {
                continue;
            }
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.to_vec(), value.to_vec()));
        }
        Ok(pairs)
    }
}
