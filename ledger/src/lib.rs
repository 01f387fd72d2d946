//! Banco Ledger Core
//!
//! Reactive account-ledger transaction engine: applies money-moving
//! operations against persisted account balances with correctness
//! guarantees under concurrency.
//!
//! # Architecture
//!
//! - **Optimistic concurrency**: account rows carry a version stamp;
//!   commits are compare-and-swap with bounded retry, never locks
//! - **Append-only audit**: every applied transaction produces exactly
//!   one immutable ledger entry with before/after balances
//! - **Idempotency**: the transaction id is the idempotency key; a
//!   duplicate submit returns the recorded outcome without reapplying
//! - **Decoupled settlement**: committed transactions are reported on
//!   a channel off the caller's critical path
//!
//! # Invariants
//!
//! - Conservation: internal transfers never change the sum of balances
//! - No balance is ever negative (overdraft forbidden)
//! - Every submit terminates in a terminal transaction state

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod storage;
pub mod store;
pub mod types;
pub mod validator;

// Re-exports
pub use config::{Config, EngineConfig};
pub use engine::LedgerEngine;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use storage::RocksStore;
pub use store::{ApplyOutcome, LedgerStore};
pub use types::{
    Account, AccountId, AccountStatus, Direction, FailureKind, LedgerEntry, Posting,
    RejectReason, SettlementNotice, Transaction, TransactionRequest, TransactionStatus,
};
