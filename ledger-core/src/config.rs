//! Configuration for the ledger

use crate::types::AccountId;
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

    /// Default page size for grouped reads (logical credit groups)
    pub read_page_size: usize,

    /// Platform fee-collector identity
    pub platform: PlatformConfig,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "ledger-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            read_page_size: 20,
            platform: PlatformConfig::default(),
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// Identity of the platform's own fee-collecting account and wallet
///
/// Platform fee legs are routed here when a request carries a platform
/// fee but no explicit collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform account id
    pub account_id: AccountId,

    /// Display name for the platform's multi-currency wallet
    pub wallet_name: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            account_id: AccountId::new("platform"),
            wallet_name: "platform, multi-currency".to_string(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
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

    /// Load defaults with environment overrides
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(page_size) = std::env::var("LEDGER_READ_PAGE_SIZE") {
            config.read_page_size = page_size
                .parse()
                .map_err(|e| crate::Error::Config(format!("bad LEDGER_READ_PAGE_SIZE: {}", e)))?;
        }

        if let Ok(account) = std::env::var("LEDGER_PLATFORM_ACCOUNT") {
            config.platform.account_id = AccountId::new(account);
        }

        Ok(config)
    }
}
