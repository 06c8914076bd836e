//! Cache Builder Module
//!
//! Collects timing, listener and runtime options and validates them.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cache::store::{EvictionListener, Store};
use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Builder for [`Cache`].
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    listener: Option<EvictionListener<K, V>>,
    runtime: Option<Handle>,
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("listener", &self.listener.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V> {
    /// Creates a builder with [`CacheConfig::default`] timings.
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            listener: None,
            runtime: None,
        }
    }

    /// How often the eviction task scans for expired entries.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Lifetime granted on insertion and on every successful lookup.
    pub fn item_ttl(mut self, ttl: Duration) -> Self {
        self.config.item_ttl = ttl;
        self
    }

    /// Called with the entries each sweep removed, after the store lock has
    /// been released.
    pub fn on_evicted<F>(mut self, listener: F) -> Self
    where
        F: Fn(Vec<(K, V)>) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Runtime that hosts the eviction task. Defaults to the runtime the
    /// builder is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Validates the options and creates the cache.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] if either duration is zero
    /// - [`Error::NoRuntime`] if no runtime was given and none is current
    pub fn build(self) -> Result<Cache<K, V>> {
        if self.config.sweep_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.config.item_ttl.is_zero() {
            return Err(Error::InvalidConfig(
                "item TTL must be greater than zero".to_string(),
            ));
        }

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| Error::NoRuntime)?,
        };

        Ok(Cache::from_store(Store::new(
            self.config.item_ttl,
            self.config.sweep_interval,
            self.listener,
            runtime,
        )))
    }
}
