//! Banco Settlement Notifier
//!
//! Reports committed ledger transactions to an external settlement API
//! without ever blocking the engine's critical path.
//!
//! # Architecture
//!
//! 1. **Handoff**: the ledger engine pushes one notice per posting leg
//!    onto a bounded channel, fire-and-forget
//! 2. **Delivery**: a worker drains the channel and POSTs each notice,
//!    retrying with bounded exponential backoff (default: base 200 ms,
//!    five attempts)
//! 3. **Reconciliation**: notices that exhaust their budget are parked
//!    as dead letters and retried by a periodic sweep
//!
//! Notification failure is an independently retryable concern: the
//! transaction stays Applied no matter what happens here.
//!
//! # Example
//!
//! ```no_run
//! use banco_settlement::{spawn_notifier, HttpSettlementApi, NotifierConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> banco_settlement::Result<()> {
//!     let config = NotifierConfig::default();
//!     let api = Arc::new(HttpSettlementApi::new(&config)?);
//!     let (sender, handle) = spawn_notifier(api, config)?;
//!
//!     // Plug `sender` into LedgerEngine::with_settlement(..).
//!
//!     drop(sender);
//!     handle.wait().await;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notifier;

// Re-exports
pub use client::{HttpSettlementApi, NoticeOutcome, SettlementApi};
pub use config::NotifierConfig;
pub use error::{Error, Result};
pub use notifier::{spawn_notifier, DeadLetter, NotifierHandle, SettlementNotifier};
