//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Engine configuration
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/banco"),
            service_name: "banco-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
        }
    }
}

/// Engine concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum optimistic-concurrency retries per submit
    pub max_apply_retries: u32,

    /// Maximum concurrently in-flight submits (backpressure)
    pub max_in_flight: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_apply_retries: 5,
            max_in_flight: 256,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("BANCO_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(retries) = std::env::var("BANCO_MAX_APPLY_RETRIES") {
            config.engine.max_apply_retries = retries
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid retry count: {}", e)))?;
        }

        if let Ok(in_flight) = std::env::var("BANCO_MAX_IN_FLIGHT") {
            config.engine.max_in_flight = in_flight
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid in-flight cap: {}", e)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "banco-ledger");
        assert_eq!(config.engine.max_apply_retries, 5);
        assert!(config.engine.max_in_flight > 0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.toml");
        let config = Config {
            data_dir: PathBuf::from("/tmp/banco-test"),
            ..Default::default()
        };
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.data_dir, PathBuf::from("/tmp/banco-test"));
        assert_eq!(loaded.engine.max_apply_retries, 5);
    }
}
