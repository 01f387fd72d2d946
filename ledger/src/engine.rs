//! Ledger engine orchestration
//!
//! `submit` drives the full transaction protocol: idempotency check,
//! snapshot load, validation, optimistic commit with bounded retry,
//! and fire-and-forget settlement scheduling. Account rows are never
//! locked; version checks at commit time plus bounded retry are the
//! sole concurrency-control mechanism.

use crate::config::EngineConfig;
use crate::metrics::Metrics;
use crate::store::{ApplyOutcome, LedgerStore};
use crate::types::{
    Account, AccountId, AccountStatus, Direction, FailureKind, LedgerEntry, Posting,
    RejectReason, SettlementNotice, Transaction, TransactionRequest, TransactionStatus,
};
use crate::validator::validate;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

/// The reactive account-ledger transaction engine
pub struct LedgerEngine {
    /// Persistence boundary
    store: Arc<dyn LedgerStore>,

    /// Bounds concurrently in-flight submits (backpressure)
    limiter: Arc<Semaphore>,

    /// Maximum optimistic-concurrency retries per submit
    max_apply_retries: u32,

    /// Committed transactions are reported here, off the caller's path
    settlement: Option<mpsc::Sender<SettlementNotice>>,

    /// Engine metrics
    metrics: Metrics,
}

impl LedgerEngine {
    /// Create an engine on top of a store
    pub fn new(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Result<Self> {
        let metrics = Metrics::new().map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            store,
            limiter: Arc::new(Semaphore::new(config.max_in_flight)),
            max_apply_retries: config.max_apply_retries,
            settlement: None,
            metrics,
        })
    }

    /// Report committed transactions on this channel
    pub fn with_settlement(mut self, sender: mpsc::Sender<SettlementNotice>) -> Self {
        self.settlement = Some(sender);
        self
    }

    /// Engine metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Open a new active account
    pub async fn open_account(&self, id: AccountId, balance_minor: i64) -> Result<Account> {
        if balance_minor < 0 {
            return Err(Error::InvalidTransaction(
                "opening balance must not be negative".to_string(),
            ));
        }
        let account = Account::open(id, balance_minor);
        self.store.create_account(&account).await?;
        Ok(account)
    }

    /// Load an account snapshot
    pub async fn account(&self, id: &AccountId) -> Result<Account> {
        self.store.get_account(id).await
    }

    /// Look up a transaction record
    pub async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.store.get_transaction(id).await
    }

    /// Look up the ledger entry for an applied transaction
    pub async fn entry(&self, transaction_id: Uuid) -> Result<Option<LedgerEntry>> {
        self.store.get_entry(transaction_id).await
    }

    /// Administrative account status transition (freeze, unfreeze,
    /// close). Version-checked like any other mutation; Closed is
    /// terminal for an account.
    pub async fn set_account_status(
        &self,
        id: &AccountId,
        status: AccountStatus,
    ) -> Result<Account> {
        for _ in 0..=self.max_apply_retries {
            let mut account = self.store.get_account(id).await?;
            if account.status == AccountStatus::Closed {
                return Err(Error::InvalidTransition(format!(
                    "account {} is closed",
                    id
                )));
            }
            if account.status == status {
                return Ok(account);
            }

            account.status = status;
            account.version += 1;

            match self.store.update_account(&account).await? {
                ApplyOutcome::Applied => return Ok(account),
                ApplyOutcome::Conflict => continue,
                ApplyOutcome::Duplicate => {
                    return Err(Error::Concurrency(
                        "unexpected duplicate on account update".to_string(),
                    ))
                }
            }
        }

        Err(Error::Concurrency(format!(
            "status update contention on account {}",
            id
        )))
    }

    /// Submit a transaction request
    ///
    /// Produces exactly one eventual terminal outcome per idempotency
    /// key. Validation rejections, contention exhaustion, and storage
    /// unavailability all come back as `Ok` with the corresponding
    /// terminal transaction; `Err` is reserved for malformed requests
    /// and engine-internal failures.
    pub async fn submit(&self, request: TransactionRequest) -> Result<Transaction> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| Error::Concurrency("engine is shut down".to_string()))?;
        let timer = self.metrics.submit_duration.start_timer();

        if request.source.is_none() && request.destination.is_none() {
            return Err(Error::InvalidTransaction(
                "transaction names no accounts".to_string(),
            ));
        }
        if request.source.is_some() && request.source == request.destination {
            return Err(Error::InvalidTransaction(
                "source and destination are the same account".to_string(),
            ));
        }

        // Idempotency: a terminal outcome for this id is returned
        // as-is, without reapplying.
        if let Some(existing) = self.store.get_transaction(request.id).await? {
            if existing.is_terminal() {
                tracing::debug!(transaction_id = %request.id, "Duplicate submit, returning recorded outcome");
                return Ok(existing);
            }
        }

        let result = self.apply_with_retries(&request).await;
        timer.observe_duration();
        result
    }

    async fn apply_with_retries(&self, request: &TransactionRequest) -> Result<Transaction> {
        for attempt in 0..=self.max_apply_retries {
            if attempt > 0 {
                self.metrics.conflict_retries_total.inc();
                tracing::debug!(
                    transaction_id = %request.id,
                    attempt,
                    "Retrying after version conflict"
                );
            }

            // Fresh snapshots on every attempt.
            let debit = match self.load_side(request.source.as_ref()).await {
                Ok(account) => account,
                Err(Error::AccountNotFound(_)) => {
                    return self
                        .reject(request, RejectReason::UnknownAccount, Vec::new())
                        .await
                }
                Err(e) => return self.fail(request, e).await,
            };
            let credit = match self.load_side(request.destination.as_ref()).await {
                Ok(account) => account,
                Err(Error::AccountNotFound(_)) => {
                    return self
                        .reject(request, RejectReason::UnknownAccount, Vec::new())
                        .await
                }
                Err(e) => return self.fail(request, e).await,
            };

            let read_versions: Vec<(AccountId, u64)> = [debit.as_ref(), credit.as_ref()]
                .into_iter()
                .flatten()
                .map(|a| (a.id.clone(), a.version))
                .collect();

            if let Err(reason) = validate(debit.as_ref(), credit.as_ref(), request.amount_minor)
            {
                return self.reject(request, reason, read_versions).await;
            }

            let (transaction, updated, entry) =
                build_commit(request, debit.as_ref(), credit.as_ref(), read_versions);

            match self.store.apply_atomic(&transaction, &updated, &entry).await {
                Ok(ApplyOutcome::Applied) => {
                    self.metrics.applied_total.inc();
                    tracing::info!(
                        transaction_id = %transaction.id,
                        amount = transaction.amount_minor,
                        "Transaction applied"
                    );
                    self.schedule_notices(&entry);
                    return Ok(transaction);
                }
                Ok(ApplyOutcome::Conflict) => continue,
                Ok(ApplyOutcome::Duplicate) => {
                    // A concurrent submit with the same id won the
                    // race; its outcome is the outcome.
                    if let Some(existing) = self.store.get_transaction(request.id).await? {
                        return Ok(existing);
                    }
                    return Err(Error::Concurrency(
                        "duplicate apply without recorded transaction".to_string(),
                    ));
                }
                Err(e) => return self.fail(request, e).await,
            }
        }

        self.metrics.failed_total.inc();
        tracing::warn!(
            transaction_id = %request.id,
            retries = self.max_apply_retries,
            "Contention retries exhausted"
        );

        let mut transaction = Transaction::from_request(request);
        transaction.status = TransactionStatus::Failed(FailureKind::Contention);
        self.record_best_effort(&transaction).await;
        Ok(transaction)
    }

    async fn load_side(&self, id: Option<&AccountId>) -> Result<Option<Account>> {
        match id {
            Some(id) => Ok(Some(self.store.get_account(id).await?)),
            None => Ok(None),
        }
    }

    async fn reject(
        &self,
        request: &TransactionRequest,
        reason: RejectReason,
        read_versions: Vec<(AccountId, u64)>,
    ) -> Result<Transaction> {
        self.metrics.rejected_total.inc();
        tracing::info!(transaction_id = %request.id, %reason, "Transaction rejected");

        let mut transaction = Transaction::from_request(request);
        transaction.status = TransactionStatus::Rejected(reason);
        transaction.read_versions = read_versions;
        self.record_best_effort(&transaction).await;
        Ok(transaction)
    }

    async fn fail(&self, request: &TransactionRequest, cause: Error) -> Result<Transaction> {
        self.metrics.failed_total.inc();
        tracing::error!(transaction_id = %request.id, error = %cause, "Store unavailable during submit");

        let mut transaction = Transaction::from_request(request);
        transaction.status = TransactionStatus::Failed(FailureKind::StorageUnavailable);
        self.record_best_effort(&transaction).await;
        Ok(transaction)
    }

    /// Persist a terminal record for audit and idempotency. If the
    /// store is down this cannot succeed; the caller still receives
    /// the terminal transaction.
    async fn record_best_effort(&self, transaction: &Transaction) {
        if let Err(e) = self.store.record_transaction(transaction).await {
            tracing::warn!(
                transaction_id = %transaction.id,
                error = %e,
                "Could not persist terminal transaction record"
            );
        }
    }

    /// Hand the committed entry's notices to the settlement channel.
    /// Fire-and-forget: the sends run on their own tasks and the
    /// caller's result never waits on them.
    fn schedule_notices(&self, entry: &LedgerEntry) {
        let Some(sender) = &self.settlement else {
            return;
        };
        for notice in entry.notices() {
            let sender = sender.clone();
            tokio::spawn(async move {
                if sender.send(notice).await.is_err() {
                    tracing::warn!("Settlement channel closed, notice dropped");
                }
            });
        }
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("max_apply_retries", &self.max_apply_retries)
            .field("settlement", &self.settlement.is_some())
            .finish()
    }
}

/// Build the consistency unit for one validated request: the Applied
/// transaction record, the post-state of each touched account, and the
/// ledger entry with before/after balances.
fn build_commit(
    request: &TransactionRequest,
    debit: Option<&Account>,
    credit: Option<&Account>,
    read_versions: Vec<(AccountId, u64)>,
) -> (Transaction, Vec<Account>, LedgerEntry) {
    let mut transaction = Transaction::from_request(request);
    transaction.status = TransactionStatus::Applied;
    transaction.read_versions = read_versions;

    let mut updated = Vec::with_capacity(2);
    let mut postings = Vec::with_capacity(2);

    if let Some(debit) = debit {
        let mut account = debit.clone();
        account.balance_minor -= request.amount_minor;
        account.version += 1;
        postings.push(Posting {
            account: debit.id.clone(),
            direction: Direction::Debit,
            amount_minor: request.amount_minor,
            balance_before: debit.balance_minor,
            balance_after: account.balance_minor,
        });
        updated.push(account);
    }

    if let Some(credit) = credit {
        let mut account = credit.clone();
        account.balance_minor += request.amount_minor;
        account.version += 1;
        postings.push(Posting {
            account: credit.id.clone(),
            direction: Direction::Credit,
            amount_minor: request.amount_minor,
            balance_before: credit.balance_minor,
            balance_after: account.balance_minor,
        });
        updated.push(account);
    }

    let entry = LedgerEntry {
        transaction_id: transaction.id,
        postings,
        recorded_at: Utc::now(),
    };

    (transaction, updated, entry)
}
