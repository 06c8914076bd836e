//! Configuration Module
//!
//! Handles cache timing parameters, loadable from environment variables.

use std::env;
use std::time::Duration;

/// Default interval between eviction sweeps, in milliseconds
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Default lifetime granted to an entry on insertion and renewal, in milliseconds
pub const DEFAULT_ITEM_TTL_MS: u64 = 300_000;

/// Cache timing configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How often the eviction task scans for expired entries
    pub sweep_interval: Duration,
    /// Lifetime granted on insertion and renewed on successful lookup
    pub item_ttl: Duration,
}

impl CacheConfig {
    /// Creates a config with explicit timings.
    pub fn new(sweep_interval: Duration, item_ttl: Duration) -> Self {
        Self {
            sweep_interval,
            item_ttl,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTLKIT_SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    /// - `TTLKIT_ITEM_TTL_MS` - Entry lifetime in milliseconds (default: 300000)
    pub fn from_env() -> Self {
        Self {
            sweep_interval: Duration::from_millis(
                env::var("TTLKIT_SWEEP_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
            ),
            item_ttl: Duration::from_millis(
                env::var("TTLKIT_ITEM_TTL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_ITEM_TTL_MS),
            ),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
            item_ttl: Duration::from_millis(DEFAULT_ITEM_TTL_MS),
        }
    }
}
