//! Transactional storage layer for toolcredits.
//!
//! This crate persists accounts, ledger entries, pricing, usage records,
//! idempotency records and purchases. Every balance-affecting operation runs
//! inside [`Store::transaction`], which gives the closure a serializable view
//! of the rows it touches and commits all of its writes atomically or none
//! of them.
//!
//! # Architecture
//!
//! Two backends implement [`Store`]:
//!
//! - [`RocksStore`]: `RocksDB` optimistic transactions over column families.
//!   Commits that conflict with a concurrent writer are retried.
//! - [`MemoryStore`]: a mutex-guarded in-memory map, used by tests.
//!
//! Values are CBOR-encoded. Keys are described in [`keys`] and column
//! families in [`schema`].
//!
//! # Example
//!
//! ```no_run
//! use toolcredits_core::{Account, UserId};
//! use toolcredits_store::{RocksStore, Store, StoreError};
//!
//! let store = RocksStore::open("/tmp/toolcredits-db").unwrap();
//! let user_id = UserId::new("user-1").unwrap();
//!
//! store
//!     .transaction(|tx| -> Result<(), StoreError> {
//!         if tx.account(&user_id)?.is_none() {
//!             tx.put_account(&Account::new(user_id.clone(), "", 100))?;
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let account = store.get_account(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod codec;
pub mod error;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use toolcredits_core::{
    Account, IdempotencyRecord, LedgerEntry, Purchase, ToolKey, ToolPricing, UsageId, UsageRecord,
    UserId,
};

use crate::schema::cf;

/// Iteration order for prefix scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    /// Lowest key first.
    Ascending,
    /// Highest key first. For ULID-suffixed keys this is newest first.
    Descending,
}

/// Raw key/value access inside a backend transaction.
///
/// Reads through `get_for_update` register the key with the transaction, so
/// a concurrent commit that changes it causes this transaction to conflict.
pub trait RawTxn {
    /// Read a key and lock it for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get_for_update(&mut self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stage a write, visible to later reads in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn put(&mut self, cf: &'static str, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Typed view of a running transaction.
pub struct Tx<'a> {
    raw: &'a mut dyn RawTxn,
}

impl<'a> Tx<'a> {
    /// Wrap a backend transaction.
    pub fn new(raw: &'a mut dyn RawTxn) -> Self {
        Self { raw }
    }

    fn read<T: serde::de::DeserializeOwned>(
        &mut self,
        cf: &'static str,
        key: &[u8],
    ) -> Result<Option<T>> {
        self.raw
            .get_for_update(cf, key)?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    fn write<T: serde::Serialize>(&mut self, cf: &'static str, key: &[u8], value: &T) -> Result<()> {
        let value = codec::encode(value)?;
        self.raw.put(cf, key, &value)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Read an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn account(&mut self, user_id: &UserId) -> Result<Option<Account>> {
        self.read(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    /// Insert or replace an account.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put_account(&mut self, account: &Account) -> Result<()> {
        self.write(cf::ACCOUNTS, &keys::account_key(&account.user_id), account)
    }

    /// Append a ledger entry under its account.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        let key = keys::ledger_entry_key(&entry.user_id, &entry.id);
        self.write(cf::LEDGER_ENTRIES, &key, entry)
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Read a tool's pricing.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn pricing(&mut self, tool_key: &ToolKey) -> Result<Option<ToolPricing>> {
        self.read(cf::TOOL_PRICING, &keys::pricing_key(tool_key))
    }

    /// Insert or replace a tool's pricing.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put_pricing(&mut self, pricing: &ToolPricing) -> Result<()> {
        self.write(cf::TOOL_PRICING, &keys::pricing_key(&pricing.tool_key), pricing)
    }

    // =========================================================================
    // Usage
    // =========================================================================

    /// Read a usage record.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn usage(&mut self, usage_id: &UsageId) -> Result<Option<UsageRecord>> {
        self.read(cf::USAGE_RECORDS, &keys::usage_key(usage_id))
    }

    /// Insert or replace a usage record and its per-user index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or a write fails.
    pub fn put_usage(&mut self, record: &UsageRecord) -> Result<()> {
        self.write(cf::USAGE_RECORDS, &keys::usage_key(&record.id), record)?;
        let index_key = keys::user_usage_key(&record.user_id, &record.id);
        self.raw.put(cf::USAGE_BY_USER, &index_key, &[])
    }

    // =========================================================================
    // Idempotency
    // =========================================================================

    /// Read the idempotency record for `(user_id, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn idempotency(&mut self, user_id: &UserId, key: &str) -> Result<Option<IdempotencyRecord>> {
        self.read(cf::IDEMPOTENCY, &keys::idempotency_key(user_id, key))
    }

    /// Insert or replace an idempotency record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put_idempotency(&mut self, record: &IdempotencyRecord) -> Result<()> {
        let key = keys::idempotency_key(&record.user_id, &record.key);
        self.write(cf::IDEMPOTENCY, &key, record)
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Read a purchase by processor session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn purchase(&mut self, session_id: &str) -> Result<Option<Purchase>> {
        self.read(cf::PURCHASES, &keys::purchase_key(session_id))
    }

    /// Return the session id a payment event was applied to, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the marker is not UTF-8.
    pub fn payment_event(&mut self, event_id: &str) -> Result<Option<String>> {
        self.raw
            .get_for_update(cf::PAYMENT_EVENTS, &keys::payment_event_key(event_id))?
            .map(|data| {
                String::from_utf8(data).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Record a purchase together with its per-user index and event marker.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or a write fails.
    pub fn put_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        let session = purchase.session_id.as_bytes();
        self.write(cf::PURCHASES, &keys::purchase_key(&purchase.session_id), purchase)?;
        self.raw.put(
            cf::PURCHASES_BY_USER,
            &keys::user_purchase_key(&purchase.user_id, &purchase.id),
            session,
        )?;
        self.raw.put(
            cf::PAYMENT_EVENTS,
            &keys::payment_event_key(&purchase.event_id),
            session,
        )
    }
}

/// The storage trait defining all database operations.
///
/// Writes only happen through [`Store::transaction`]. Reads outside a
/// transaction see the latest committed state.
pub trait Store: Send + Sync {
    /// Run `f` inside a serializable transaction and commit its writes.
    ///
    /// The closure may run more than once if the commit conflicts with a
    /// concurrent transaction, so it must not have side effects outside
    /// the [`Tx`] it is given. If it returns `Err`, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a [`StoreError`] converted into `E`
    /// if the backend fails or the conflict retry budget runs out.
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnMut(&mut Tx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>;

    /// Read a single committed value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get_raw(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Collect committed key/value pairs whose key starts with `prefix`.
    ///
    /// An empty prefix scans the whole column family. At most `limit`
    /// pairs are returned when a limit is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend iteration fails.
    fn scan_prefix(
        &self,
        cf: &'static str,
        prefix: &[u8],
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    // =========================================================================
    // Typed reads
    // =========================================================================

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.get_raw(cf::ACCOUNTS, &keys::account_key(user_id))?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    /// Get a usage record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_usage(&self, usage_id: &UsageId) -> Result<Option<UsageRecord>> {
        self.get_raw(cf::USAGE_RECORDS, &keys::usage_key(usage_id))?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    /// Get a tool's pricing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_pricing(&self, tool_key: &ToolKey) -> Result<Option<ToolPricing>> {
        self.get_raw(cf::TOOL_PRICING, &keys::pricing_key(tool_key))?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    /// Get a purchase by processor session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_purchase(&self, session_id: &str) -> Result<Option<Purchase>> {
        self.get_raw(cf::PURCHASES, &keys::purchase_key(session_id))?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    /// List every tool in the catalog, ordered by tool key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pricing(&self) -> Result<Vec<ToolPricing>> {
        self.scan_prefix(cf::TOOL_PRICING, &[], ScanOrder::Ascending, None)?
            .iter()
            .map(|(_, value)| codec::decode(value))
            .collect()
    }

    /// List a user's ledger entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_ledger_entries(
        &self,
        user_id: &UserId,
        order: ScanOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerEntry>> {
        let prefix = keys::user_prefix(user_id);
        self.scan_prefix(cf::LEDGER_ENTRIES, &prefix, order, limit)?
            .iter()
            .map(|(_, value)| codec::decode(value))
            .collect()
    }

    /// List a user's usage records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or an index entry
    /// points at a missing record.
    fn list_usage_by_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<UsageRecord>> {
        let prefix = keys::user_prefix(user_id);
        let index = self.scan_prefix(
            cf::USAGE_BY_USER,
            &prefix,
            ScanOrder::Descending,
            Some(limit),
        )?;

        let mut records = Vec::with_capacity(index.len());
        for (key, _) in index {
            let usage_id = UsageId::from_bytes(keys::trailing_id(&key, &prefix)?);
            let record = self.get_usage(&usage_id)?.ok_or_else(|| {
                StoreError::CorruptKey(format!("usage index points at missing record {usage_id}"))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// List a user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or an index entry
    /// points at a missing purchase.
    fn list_purchases_by_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Purchase>> {
        let prefix = keys::user_prefix(user_id);
        let index = self.scan_prefix(
            cf::PURCHASES_BY_USER,
            &prefix,
            ScanOrder::Descending,
            Some(limit),
        )?;

        let mut purchases = Vec::with_capacity(index.len());
        for (_, session) in index {
            let session_id =
                String::from_utf8(session).map_err(|e| StoreError::Serialization(e.to_string()))?;
            let purchase = self.get_purchase(&session_id)?.ok_or_else(|| {
                StoreError::CorruptKey(format!("purchase index points at missing session {session_id}"))
            })?;
            purchases.push(purchase);
        }
        Ok(purchases)
    }
}
