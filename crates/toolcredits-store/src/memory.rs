//! In-memory storage implementation.
//!
//! Transactions run one at a time under a single mutex, which makes them
//! trivially serializable. Writes are staged and applied only when the
//! closure succeeds.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Result, StoreError};
use crate::keys::prefix_upper_bound;
use crate::schema::all_column_families;
use crate::{RawTxn, ScanOrder, Store, Tx};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;
type Tables = HashMap<&'static str, Table>;

/// Memory-backed storage implementation.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with every column family present.
    #[must_use]
    pub fn new() -> Self {
        let tables = all_column_families()
            .into_iter()
            .map(|name| (name, Table::new()))
            .collect();
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn table<'t>(tables: &'t Tables, cf: &str) -> Result<&'t Table> {
    tables
        .get(cf)
        .ok_or_else(|| StoreError::Database(format!("column family not found: {cf}")))
}

struct MemoryTxn<'a> {
    committed: &'a Tables,
    staged: HashMap<(&'static str, Vec<u8>), Vec<u8>>,
}

impl RawTxn for MemoryTxn<'_> {
    fn get_for_update(&mut self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.staged.get(&(cf, key.to_vec())) {
            return Ok(Some(value.clone()));
        }
        Ok(table(self.committed, cf)?.get(key).cloned())
    }

    fn put(&mut self, cf: &'static str, key: &[u8], value: &[u8]) -> Result<()> {
        table(self.committed, cf)?;
        self.staged.insert((cf, key.to_vec()), value.to_vec());
        Ok(())
    }
}

impl Store for MemoryStore {
    fn transaction<T, E, F>(&self, mut f: F) -> std::result::Result<T, E>
    where
        F: FnMut(&mut Tx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut tables = self.lock();

        let (value, staged) = {
            let mut raw = MemoryTxn {
                committed: &tables,
                staged: HashMap::new(),
            };
            let value = f(&mut Tx::new(&mut raw))?;
            (value, raw.staged)
        };

        for ((cf, key), data) in staged {
            if let Some(table) = tables.get_mut(cf) {
                table.insert(key, data);
            }
        }
        Ok(value)
    }

    fn get_raw(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.lock();
        Ok(table(&tables, cf)?.get(key).cloned())
    }

    fn scan_prefix(
        &self,
        cf: &'static str,
        prefix: &[u8],
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self.lock();
        let table = table(&tables, cf)?;

        let upper = match prefix_upper_bound(prefix) {
            Some(bound) if !prefix.is_empty() => Bound::Excluded(bound),
            _ => Bound::Unbounded,
        };
        let range = table.range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), upper));
        let limit = limit.unwrap_or(usize::MAX);

        let clone = |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
        let pairs = match order {
            ScanOrder::Ascending => range.take(limit).map(clone).collect(),
            ScanOrder::Descending => range.rev().take(limit).map(clone).collect(),
        };
        Ok(pairs)
    }
}
