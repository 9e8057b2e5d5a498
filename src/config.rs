use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the storage core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sharding: ShardingConfig,
    pub threshold: ThresholdConfig,
    pub auto_heal: AutoHealConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardingConfig {
    /// Number of data shards (k).
    pub data_shards: usize,
    /// Number of parity shards (m).
    pub parity_shards: usize,
    /// On-disk root for the shard/share replica store (spec §6 layout).
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Reconstruction threshold `t`.
    pub threshold: u8,
    /// Whether to require Feldman VSS commitments on distribution.
    pub use_vss: bool,
    /// Per-participant send retry attempts during distribution.
    pub send_retries: usize,
    /// Delay between retry attempts in milliseconds.
    pub send_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoHealConfig {
    /// Critical floor: below this many reachable shards, the file is flagged
    /// as a data-loss risk and left untouched.
    pub min_shard_copies: usize,
    /// Desired reachable count; no action is taken once this is met.
    pub target_shard_copies: usize,
    /// Interval between ticks, in seconds.
    pub check_interval_secs: u64,
    /// Cap on the backoff multiplier applied to a file's next-check time.
    pub max_backoff_multiplier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub structured: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sharding: ShardingConfig {
                data_shards: 8,
                parity_shards: 4,
                store_dir: None,
            },
            threshold: ThresholdConfig {
                threshold: 3,
                use_vss: false,
                send_retries: 3,
                send_retry_delay_ms: 100,
            },
            auto_heal: AutoHealConfig {
                min_shard_copies: 3,
                target_shard_copies: 5,
                check_interval_secs: 300,
                max_backoff_multiplier: 8,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                structured: true,
                log_file: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults.
    pub fn load_or_default(config_path: Option<PathBuf>) -> crate::error::MeshResult<Self> {
        if let Some(path) = config_path {
            if path.exists() {
                let config_str = std::fs::read_to_string(&path)?;
                let config: Config = toml::from_str(&config_str)?;
                tracing::info!("loaded configuration from {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("using default configuration");
        Ok(Config::default())
    }

    /// Save configuration to file.
    pub fn save(&self, config_path: &PathBuf) -> crate::error::MeshResult<()> {
        let config_str = toml::to_string_pretty(self)?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(config_path, config_str)?;
        tracing::info!("configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.auto_heal.check_interval_secs)
    }

    pub fn default_store_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".mesh-core").join("store"))
            .unwrap_or_else(|| PathBuf::from("./mesh-store"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.sharding.data_shards, 8);
        assert_eq!(config.sharding.parity_shards, 4);
        assert_eq!(config.auto_heal.min_shard_copies, 3);
        assert_eq!(config.auto_heal.target_shard_copies, 5);
        assert_eq!(config.auto_heal.check_interval_secs, 300);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.sharding.data_shards,
            config.sharding.data_shards
        );
    }
}
