//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Cache sizing and expiry options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Default TTL for entries without explicit TTL; zero = never expires
    pub ttl: Duration,
    /// Eviction policy applied when the cache is full
    pub strategy: EvictionPolicy,
}

/// Listener address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub host: String,
    pub port: u16,
}

impl NetworkSettings {
    /// `host:port` string suitable for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Snapshot and write log locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    pub snapshot_path: PathBuf,
    pub write_log_path: PathBuf,
    /// Interval between snapshot attempts
    pub snapshot_interval: Duration,
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache: CacheOptions,
    pub network: NetworkSettings,
    pub persistence: PersistenceSettings,
    /// Interval between active expiry sweeps
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL` - Default TTL in seconds, 0 = never (default: 0)
    /// - `CACHE_STRATEGY` - LRU, FIFO or LFU (default: LRU)
    /// - `SERVER_HOST` - Listen host (default: 127.0.0.1)
    /// - `SERVER_PORT` - Listen port (default: 6379)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: cache_snap.bin)
    /// - `WRITE_LOG_PATH` - Append-only log (default: cache_aof.log)
    /// - `SNAPSHOT_INTERVAL` - Snapshot frequency in seconds (default: 60)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheOptions {
                capacity: env_or("CACHE_CAPACITY", defaults.cache.capacity),
                ttl: Duration::from_secs(env_or("CACHE_TTL", defaults.cache.ttl.as_secs())),
                strategy: env_or("CACHE_STRATEGY", defaults.cache.strategy),
            },
            network: NetworkSettings {
                host: env::var("SERVER_HOST").unwrap_or(defaults.network.host),
                port: env_or("SERVER_PORT", defaults.network.port),
            },
            persistence: PersistenceSettings {
                snapshot_path: env::var("SNAPSHOT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.persistence.snapshot_path),
                write_log_path: env::var("WRITE_LOG_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.persistence.write_log_path),
                snapshot_interval: Duration::from_secs(env_or(
                    "SNAPSHOT_INTERVAL",
                    defaults.persistence.snapshot_interval.as_secs(),
                )),
            },
            sweep_interval: Duration::from_secs(env_or(
                "SWEEP_INTERVAL",
                defaults.sweep_interval.as_secs(),
            )),
        }
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(CacheError::Config("capacity must be at least 1".into()));
        }
        if self.network.port == 0 {
            return Err(CacheError::Config(format!(
                "invalid network port: {}",
                self.network.port
            )));
        }
        if self.persistence.snapshot_interval.is_zero() || self.sweep_interval.is_zero() {
            return Err(CacheError::Config(
                "snapshot and sweep intervals must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheOptions {
                capacity: 1000,
                ttl: Duration::ZERO,
                strategy: EvictionPolicy::Lru,
            },
            network: NetworkSettings {
                host: "127.0.0.1".to_string(),
                port: 6379,
            },
            persistence: PersistenceSettings {
                snapshot_path: PathBuf::from("cache_snap.bin"),
                write_log_path: PathBuf::from("cache_aof.log"),
                snapshot_interval: Duration::from_secs(60),
            },
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.ttl, Duration::ZERO);
        assert_eq!(config.cache.strategy, EvictionPolicy::Lru);
        assert_eq!(config.network.addr(), "127.0.0.1:6379");
        assert_eq!(config.persistence.snapshot_interval, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        for name in [
            "CACHE_CAPACITY",
            "CACHE_TTL",
            "CACHE_STRATEGY",
            "SERVER_HOST",
            "SERVER_PORT",
            "SNAPSHOT_PATH",
            "WRITE_LOG_PATH",
            "SNAPSHOT_INTERVAL",
            "SWEEP_INTERVAL",
        ] {
            env::remove_var(name);
        }
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("CACHE_CAPACITY", "2");
        env::set_var("CACHE_TTL", "30");
        env::set_var("CACHE_STRATEGY", "fifo");
        env::set_var("SERVER_PORT", "not-a-port");

        let config = Config::from_env();
        assert_eq!(config.cache.capacity, 2);
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.cache.strategy, EvictionPolicy::Fifo);
        assert_eq!(config.network.port, 6379);

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_TTL");
        env::remove_var("CACHE_STRATEGY");
        env::remove_var("SERVER_PORT");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));

        let mut config = Config::default();
        config.network.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
