//! Persistence boundary for the ledger
//!
//! The engine speaks in `Account`/`Transaction`/`LedgerEntry` terms;
//! adapters map those onto their row representation. Two adapters
//! exist: [`crate::storage::RocksStore`] (durable, embedded) and
//! [`crate::memory::MemoryStore`] (in-process, used in tests).

use crate::types::{Account, AccountId, LedgerEntry, Transaction};
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Outcome of a version-checked write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Committed durably; visible to subsequent reads
    Applied,
    /// A stored account version no longer matches; reload and retry
    Conflict,
    /// A transaction with this id is already recorded
    Duplicate,
}

/// Durable key-value-like table of accounts plus an append-only log
/// of applied transactions
///
/// `apply_atomic` is the single consistency unit: account states, the
/// transaction record, and the ledger entry commit all-or-nothing, and
/// completion of the call is the durability guarantee.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load an account by id
    async fn get_account(&self, id: &AccountId) -> Result<Account>;

    /// Create a new account; fails if the id is taken
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Version-checked single-account update (status transitions)
    ///
    /// `account.version` must be exactly one above the stored version.
    async fn update_account(&self, account: &Account) -> Result<ApplyOutcome>;

    /// Look up a transaction record by id (idempotency check)
    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>>;

    /// Persist a Rejected/Failed transaction record for audit and
    /// idempotency; never touches account state
    async fn record_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Atomically commit updated accounts, the Applied transaction,
    /// and its ledger entry
    ///
    /// Each updated account's version must be exactly one above the
    /// stored version, otherwise `Conflict` is returned and nothing is
    /// written. `Duplicate` is returned when the transaction id is
    /// already recorded.
    async fn apply_atomic(
        &self,
        transaction: &Transaction,
        updated_accounts: &[Account],
        entry: &LedgerEntry,
    ) -> Result<ApplyOutcome>;

    /// Look up the ledger entry for an applied transaction
    async fn get_entry(&self, transaction_id: Uuid) -> Result<Option<LedgerEntry>>;
}
