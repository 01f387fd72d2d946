//! Core types for the account ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer minor units for money, never floats)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identifier (account number, IBAN, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountStatus {
    /// Open for debits and credits
    Active = 1,
    /// Temporarily blocked, no money movement
    Frozen = 2,
    /// Permanently closed (terminal)
    Closed = 3,
}

/// Account row: the only mutable shared state in the system
///
/// Mutated exclusively by the ledger engine. `version` is a monotonic
/// counter bumped exactly once per applied mutation and is the basis
/// for optimistic concurrency control: a commit is accepted only if
/// the stored version still matches the version the snapshot was read
/// at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier
    pub id: AccountId,

    /// Balance in minor units (cents)
    pub balance_minor: i64,

    /// Lifecycle status
    pub status: AccountStatus,

    /// Optimistic concurrency version
    pub version: u64,
}

impl Account {
    /// Create a new active account with an opening balance
    pub fn open(id: AccountId, balance_minor: i64) -> Self {
        Self {
            id,
            balance_minor,
            status: AccountStatus::Active,
            version: 1,
        }
    }
}

/// Specific validation rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Debit would take the balance below zero (overdraft forbidden)
    InsufficientFunds,
    /// An involved account is frozen
    AccountFrozen,
    /// An involved account is closed
    AccountClosed,
    /// Amount is zero or negative
    InvalidAmount,
    /// A referenced account does not exist
    UnknownAccount,
    /// Credited balance would exceed the representable range
    BalanceOverflow,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InsufficientFunds => "insufficient funds",
            RejectReason::AccountFrozen => "account frozen",
            RejectReason::AccountClosed => "account closed",
            RejectReason::InvalidAmount => "invalid amount",
            RejectReason::UnknownAccount => "unknown account",
            RejectReason::BalanceOverflow => "balance overflow",
        };
        write!(f, "{}", s)
    }
}

/// Why a transaction failed without being applied or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Optimistic retries exhausted under sustained contention
    Contention,
    /// The ledger store was unreachable
    StorageUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Contention => "contention",
            FailureKind::StorageUnavailable => "storage unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Transaction state machine
///
/// `Pending -> {Applied, Rejected, Failed}`; the three outcomes are
/// terminal and no transition ever leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Submitted, not yet decided
    Pending,
    /// Committed to the ledger (terminal)
    Applied,
    /// Refused by validation (terminal)
    Rejected(RejectReason),
    /// Could not be decided against the store (terminal)
    Failed(FailureKind),
}

impl TransactionStatus {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// A money-moving request, identified by its idempotency key
///
/// A deposit has no source (money enters from outside) and a
/// withdrawal has no destination. A transfer names both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Transaction identifier, used as the idempotency key
    pub id: Uuid,

    /// Account debited (None for deposits)
    pub source: Option<AccountId>,

    /// Account credited (None for withdrawals)
    pub destination: Option<AccountId>,

    /// Amount in minor units, must be positive
    pub amount_minor: i64,
}

impl TransactionRequest {
    /// Internal transfer between two accounts
    pub fn transfer(source: AccountId, destination: AccountId, amount_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: Some(source),
            destination: Some(destination),
            amount_minor,
        }
    }

    /// External deposit into an account
    pub fn deposit(destination: AccountId, amount_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: None,
            destination: Some(destination),
            amount_minor,
        }
    }

    /// External withdrawal from an account
    pub fn withdrawal(source: AccountId, amount_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: Some(source),
            destination: None,
            amount_minor,
        }
    }

    /// Use a client-supplied idempotency key
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A transaction record as persisted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier (idempotency key)
    pub id: Uuid,

    /// Account debited (None for deposits)
    pub source: Option<AccountId>,

    /// Account credited (None for withdrawals)
    pub destination: Option<AccountId>,

    /// Amount in minor units
    pub amount_minor: i64,

    /// Current status
    pub status: TransactionStatus,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,

    /// Account versions the decision was validated against
    pub read_versions: Vec<(AccountId, u64)>,
}

impl Transaction {
    /// Build a pending record from a request
    pub fn from_request(request: &TransactionRequest) -> Self {
        Self {
            id: request.id,
            source: request.source.clone(),
            destination: request.destination.clone(),
            amount_minor: request.amount_minor,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            read_versions: Vec::new(),
        }
    }

    /// Check if the transaction reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Direction of a posting leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Money leaves the account
    Debit,
    /// Money enters the account
    Credit,
}

impl Direction {
    /// Wire representation for the settlement API
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }
}

/// One leg of a ledger entry: a balance movement on a single account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Affected account
    pub account: AccountId,

    /// Debit or credit
    pub direction: Direction,

    /// Amount moved, in minor units
    pub amount_minor: i64,

    /// Balance before the movement
    pub balance_before: i64,

    /// Balance after the movement
    pub balance_after: i64,
}

/// Immutable audit record for one applied transaction
///
/// Exactly one entry exists per Applied transaction, none for
/// Rejected or Failed ones. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The transaction this entry records
    pub transaction_id: Uuid,

    /// Balance movements, one per affected account
    pub postings: Vec<Posting>,

    /// Commit timestamp
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Derive the settlement notices for this entry, one per leg
    pub fn notices(&self) -> Vec<SettlementNotice> {
        self.postings
            .iter()
            .map(|p| SettlementNotice {
                transaction_id: self.transaction_id,
                account: p.account.clone(),
                direction: p.direction,
                amount_minor: p.amount_minor,
            })
            .collect()
    }
}

/// Payload reported to the external settlement API for one posting leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementNotice {
    /// Committed transaction
    pub transaction_id: Uuid,

    /// Affected account
    pub account: AccountId,

    /// Debit or credit
    pub direction: Direction,

    /// Amount in minor units
    pub amount_minor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_open_defaults() {
        let account = Account::open(AccountId::new("ES-001"), 10_000);
        assert_eq!(account.balance_minor, 10_000);
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_request_constructors() {
        let transfer =
            TransactionRequest::transfer(AccountId::new("A"), AccountId::new("B"), 300);
        assert!(transfer.source.is_some());
        assert!(transfer.destination.is_some());

        let deposit = TransactionRequest::deposit(AccountId::new("A"), 100);
        assert!(deposit.source.is_none());
        assert_eq!(deposit.destination, Some(AccountId::new("A")));

        let withdrawal = TransactionRequest::withdrawal(AccountId::new("A"), 100);
        assert_eq!(withdrawal.source, Some(AccountId::new("A")));
        assert!(withdrawal.destination.is_none());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Applied.is_terminal());
        assert!(TransactionStatus::Rejected(RejectReason::InsufficientFunds).is_terminal());
        assert!(TransactionStatus::Failed(FailureKind::Contention).is_terminal());
    }

    #[test]
    fn test_entry_notices_one_per_leg() {
        let entry = LedgerEntry {
            transaction_id: Uuid::new_v4(),
            postings: vec![
                Posting {
                    account: AccountId::new("A"),
                    direction: Direction::Debit,
                    amount_minor: 300,
                    balance_before: 1000,
                    balance_after: 700,
                },
                Posting {
                    account: AccountId::new("B"),
                    direction: Direction::Credit,
                    amount_minor: 300,
                    balance_before: 500,
                    balance_after: 800,
                },
            ],
            recorded_at: Utc::now(),
        };

        let notices = entry.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].direction, Direction::Debit);
        assert_eq!(notices[1].direction, Direction::Credit);
        assert!(notices
            .iter()
            .all(|n| n.transaction_id == entry.transaction_id));
    }
}
