//! External settlement API client
//!
//! Minimal contract: `POST transaction-id, account-id, amount,
//! direction`. A 2xx response acknowledges the notice; anything else
//! (non-2xx, timeout, transport error) means the API was unreachable
//! and the notifier will retry.

use crate::config::NotifierConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use banco_ledger::SettlementNotice;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOutcome {
    /// The external system acknowledged the notice (2xx)
    Acknowledged,
    /// Non-2xx, timeout, or transport failure; retryable
    Unreachable,
}

/// Delivery seam between the notifier and the external API
#[async_trait]
pub trait SettlementApi: Send + Sync {
    /// Deliver one notice; failures map to `Unreachable`, never panic
    async fn post_notice(&self, notice: &SettlementNotice) -> NoticeOutcome;
}

/// Wire payload for the settlement POST
#[derive(Debug, Serialize)]
struct NoticeBody<'a> {
    transaction_id: Uuid,
    account_id: &'a str,
    amount_minor: i64,
    direction: &'static str,
}

impl<'a> NoticeBody<'a> {
    fn from_notice(notice: &'a SettlementNotice) -> Self {
        Self {
            transaction_id: notice.transaction_id,
            account_id: notice.account.as_str(),
            amount_minor: notice.amount_minor,
            direction: notice.direction.as_str(),
        }
    }
}

/// HTTP implementation of the settlement API
pub struct HttpSettlementApi {
    endpoint_url: String,
    http_client: Client,
}

impl HttpSettlementApi {
    /// Build a client from the notifier configuration
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self {
            endpoint_url: config.endpoint_url.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl SettlementApi for HttpSettlementApi {
    async fn post_notice(&self, notice: &SettlementNotice) -> NoticeOutcome {
        let body = NoticeBody::from_notice(notice);

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => NoticeOutcome::Acknowledged,
            Ok(response) => {
                tracing::warn!(
                    transaction_id = %notice.transaction_id,
                    status = %response.status(),
                    "Settlement API refused notice"
                );
                NoticeOutcome::Unreachable
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %notice.transaction_id,
                    error = %e,
                    "Settlement API unreachable"
                );
                NoticeOutcome::Unreachable
            }
        }
    }
}
