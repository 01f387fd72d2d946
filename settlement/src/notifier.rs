//! Retrying settlement notifier
//!
//! Consumes committed-transaction notices from the engine's channel
//! and reports them to the external settlement API with bounded
//! exponential backoff. Delivery is an at-least-once side effect,
//! fully decoupled from ledger correctness: exhausting the retry
//! budget records a dead letter for the reconciliation sweep and is
//! never surfaced to the transaction's caller.

use crate::client::{NoticeOutcome, SettlementApi};
use crate::config::NotifierConfig;
use crate::metrics::NotifierMetrics;
use banco_ledger::SettlementNotice;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// A notice that exhausted its retry budget, parked for reconciliation
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The undelivered notice
    pub notice: SettlementNotice,

    /// Attempts made before parking
    pub attempts: u32,

    /// When the last attempt failed
    pub last_attempt_at: DateTime<Utc>,
}

/// Settlement notifier worker state
pub struct SettlementNotifier {
    api: Arc<dyn SettlementApi>,
    config: NotifierConfig,
    dead_letters: Mutex<Vec<DeadLetter>>,
    metrics: NotifierMetrics,
}

impl SettlementNotifier {
    /// Create a notifier over a settlement API
    pub fn new(api: Arc<dyn SettlementApi>, config: NotifierConfig) -> crate::Result<Self> {
        let metrics =
            NotifierMetrics::new().map_err(|e| crate::Error::Other(e.to_string()))?;
        Ok(Self {
            api,
            config,
            dead_letters: Mutex::new(Vec::new()),
            metrics,
        })
    }

    /// Notifier metrics
    pub fn metrics(&self) -> &NotifierMetrics {
        &self.metrics
    }

    /// Snapshot of currently parked dead letters
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().clone()
    }

    /// Worker loop: drain the channel until all senders are dropped
    pub async fn run(self: Arc<Self>, mut notices: mpsc::Receiver<SettlementNotice>) {
        while let Some(notice) = notices.recv().await {
            if !self.deliver(&notice).await {
                self.park(notice);
            }
        }
        tracing::info!("Settlement notifier channel closed, worker exiting");
    }

    /// Reconciliation sweep: retry every parked dead letter once
    /// through the normal delivery path. Returns how many were
    /// redelivered.
    pub async fn sweep(&self) -> usize {
        let parked: Vec<DeadLetter> = std::mem::take(&mut *self.dead_letters.lock());
        if parked.is_empty() {
            return 0;
        }

        tracing::info!(count = parked.len(), "Reconciliation sweep started");

        let mut redelivered = 0;
        for letter in parked {
            if self.deliver(&letter.notice).await {
                redelivered += 1;
            } else {
                self.park(letter.notice);
            }
        }

        tracing::info!(redelivered, "Reconciliation sweep finished");
        redelivered
    }

    /// Deliver one notice with bounded exponential backoff
    async fn deliver(&self, notice: &SettlementNotice) -> bool {
        for attempt in 1..=self.config.max_attempts {
            match self.api.post_notice(notice).await {
                NoticeOutcome::Acknowledged => {
                    self.metrics.delivered_total.inc();
                    self.metrics.attempts.observe(attempt as f64);
                    tracing::debug!(
                        transaction_id = %notice.transaction_id,
                        attempt,
                        "Settlement notice acknowledged"
                    );
                    return true;
                }
                NoticeOutcome::Unreachable if attempt < self.config.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        transaction_id = %notice.transaction_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Settlement notice unacknowledged, backing off"
                    );
                    sleep(delay).await;
                }
                NoticeOutcome::Unreachable => {}
            }
        }

        self.metrics.failed_total.inc();
        self.metrics.attempts.observe(self.config.max_attempts as f64);
        false
    }

    /// Backoff for the given attempt: base doubled per attempt, capped,
    /// with up to 25% added jitter to spread synchronized retries.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << (attempt - 1).min(16));
        let capped = exp.min(self.config.backoff_cap_ms);
        let jitter = rand::thread_rng().gen_range(0..=capped / 4);
        Duration::from_millis(capped + jitter)
    }

    fn park(&self, notice: SettlementNotice) {
        tracing::error!(
            transaction_id = %notice.transaction_id,
            account = %notice.account,
            attempts = self.config.max_attempts,
            "Settlement notice undeliverable, parked for reconciliation"
        );
        self.dead_letters.lock().push(DeadLetter {
            notice,
            attempts: self.config.max_attempts,
            last_attempt_at: Utc::now(),
        });
    }
}

impl std::fmt::Debug for SettlementNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementNotifier")
            .field("max_attempts", &self.config.max_attempts)
            .field("dead_letters", &self.dead_letters.lock().len())
            .finish()
    }
}

/// Handle to a running notifier worker
#[derive(Debug)]
pub struct NotifierHandle {
    notifier: Arc<SettlementNotifier>,
    worker: JoinHandle<()>,
}

impl NotifierHandle {
    /// Shared notifier state (for sweeps and inspection)
    pub fn notifier(&self) -> Arc<SettlementNotifier> {
        self.notifier.clone()
    }

    /// Wait for the worker to drain and exit. Completes once every
    /// engine-side sender has been dropped.
    pub async fn wait(self) {
        let _ = self.worker.await;
    }
}

/// Spawn the notifier worker; the returned sender plugs into
/// [`banco_ledger::LedgerEngine::with_settlement`]
pub fn spawn_notifier(
    api: Arc<dyn SettlementApi>,
    config: NotifierConfig,
) -> crate::Result<(mpsc::Sender<SettlementNotice>, NotifierHandle)> {
    let (sender, receiver) = mpsc::channel(config.channel_capacity);
    let notifier = Arc::new(SettlementNotifier::new(api, config)?);

    let worker = tokio::spawn(notifier.clone().run(receiver));

    Ok((sender, NotifierHandle { notifier, worker }))
}
