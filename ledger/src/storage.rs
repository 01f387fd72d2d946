//! Durable storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Current account rows (key: account id)
//! - `transactions` - Transaction records (key: transaction id)
//! - `entries` - Append-only ledger entries (key: transaction id)
//!
//! Optimistic concurrency lives here: `apply_atomic` re-checks the
//! stored account versions under a commit mutex and writes the whole
//! consistency unit through a single `WriteBatch`, so a conflicting
//! commit leaves no trace.

use crate::store::{ApplyOutcome, LedgerStore};
use crate::types::{Account, AccountId, LedgerEntry, Transaction};
use crate::{Config, Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_TRANSACTIONS: &str = "transactions";
const CF_ENTRIES: &str = "entries";

/// RocksDB-backed ledger store
pub struct RocksStore {
    db: Arc<DB>,

    /// Serializes the version-check-then-write critical section.
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create the database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_entries()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    // Column family options

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Accounts are read on every submit, favor speed.
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_entries() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn read_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(&cf, id.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn read_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        match self.db.get_cf(&cf, id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Check that every updated account is exactly one version ahead
    /// of its stored row. Must be called under `commit_lock`.
    fn versions_match(&self, updated: &[Account]) -> Result<bool> {
        for account in updated {
            match self.read_account(&account.id)? {
                Some(stored) if stored.version + 1 == account.version => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn put_accounts(&self, batch: &mut WriteBatch, accounts: &[Account]) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        for account in accounts {
            let value = bincode::serialize(account)?;
            batch.put_cf(&cf, account.id.as_str().as_bytes(), &value);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for RocksStore {
    async fn get_account(&self, id: &AccountId) -> Result<Account> {
        self.read_account(id)?
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        let _guard = self.commit_lock.lock();

        if self.read_account(&account.id)?.is_some() {
            return Err(Error::AccountExists(account.id.to_string()));
        }

        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;
        self.db.put_cf(&cf, account.id.as_str().as_bytes(), &value)?;

        tracing::info!(account_id = %account.id, balance = account.balance_minor, "Account opened");

        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<ApplyOutcome> {
        let _guard = self.commit_lock.lock();

        if self.read_account(&account.id)?.is_none() {
            return Err(Error::AccountNotFound(account.id.to_string()));
        }
        if !self.versions_match(std::slice::from_ref(account))? {
            return Ok(ApplyOutcome::Conflict);
        }

        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;
        self.db.put_cf(&cf, account.id.as_str().as_bytes(), &value)?;

        Ok(ApplyOutcome::Applied)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.read_transaction(id)
    }

    async fn record_transaction(&self, transaction: &Transaction) -> Result<()> {
        let _guard = self.commit_lock.lock();

        // First terminal record wins; concurrent duplicate submits
        // must not overwrite it.
        if self.read_transaction(transaction.id)?.is_some() {
            return Ok(());
        }

        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(transaction)?;
        self.db.put_cf(&cf, transaction.id.as_bytes(), &value)?;

        tracing::debug!(
            transaction_id = %transaction.id,
            status = ?transaction.status,
            "Transaction recorded"
        );

        Ok(())
    }

    async fn apply_atomic(
        &self,
        transaction: &Transaction,
        updated_accounts: &[Account],
        entry: &LedgerEntry,
    ) -> Result<ApplyOutcome> {
        let _guard = self.commit_lock.lock();

        if self.read_transaction(transaction.id)?.is_some() {
            return Ok(ApplyOutcome::Duplicate);
        }
        if !self.versions_match(updated_accounts)? {
            return Ok(ApplyOutcome::Conflict);
        }

        let mut batch = WriteBatch::default();

        self.put_accounts(&mut batch, updated_accounts)?;

        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let transaction_value = bincode::serialize(transaction)?;
        batch.put_cf(&cf_transactions, transaction.id.as_bytes(), &transaction_value);

        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let entry_value = bincode::serialize(entry)?;
        batch.put_cf(&cf_entries, entry.transaction_id.as_bytes(), &entry_value);

        // Atomic commit; completion is the durability guarantee.
        self.db.write(batch)?;

        tracing::debug!(
            transaction_id = %transaction.id,
            accounts = updated_accounts.len(),
            "Transaction applied"
        );

        Ok(ApplyOutcome::Applied)
    }

    async fn get_entry(&self, transaction_id: Uuid) -> Result<Option<LedgerEntry>> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        match self.db.get_cf(&cf, transaction_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }
}
