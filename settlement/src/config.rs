//! Configuration for the settlement notifier

use serde::{Deserialize, Serialize};

/// Settlement notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// External settlement API endpoint
    pub endpoint_url: String,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// Maximum delivery attempts per notice
    pub max_attempts: u32,

    /// Exponential backoff base (milliseconds)
    pub backoff_base_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub backoff_cap_ms: u64,

    /// Capacity of the notice channel from the engine
    pub channel_capacity: usize,

    /// Reconciliation sweep interval (seconds)
    pub sweep_interval_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:8090/settlements".to_string(),
            request_timeout_ms: 5_000,
            max_attempts: 5,
            backoff_base_ms: 200,
            backoff_cap_ms: 3_200,
            channel_capacity: 1_024,
            sweep_interval_secs: 60,
        }
    }
}

impl NotifierConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NotifierConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = NotifierConfig::default();

        if let Ok(url) = std::env::var("BANCO_SETTLEMENT_URL") {
            config.endpoint_url = url;
        }

        if let Ok(attempts) = std::env::var("BANCO_SETTLEMENT_MAX_ATTEMPTS") {
            config.max_attempts = attempts
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid attempt count: {}", e)))?;
        }

        if let Ok(secs) = std::env::var("BANCO_SETTLEMENT_SWEEP_SECS") {
            config.sweep_interval_secs = secs
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid sweep interval: {}", e)))?;
        }

        Ok(config)
    }
}
