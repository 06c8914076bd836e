//! Cache Handle Module
//!
//! The public, cloneable cache handle. Every operation is synchronous and
//! takes the store lock briefly; eviction runs on a Tokio task the cache
//! starts and stops by itself.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::store::Store;
use crate::cache::{CacheBuilder, CacheStats, LockedStore};
use crate::error::{Error, Result};

/// Owns the store on behalf of all handles; dropping it closes the cache.
struct Shared<K, V> {
    store: Arc<Store<K, V>>,
}

impl<K, V> Drop for Shared<K, V> {
    fn drop(&mut self) {
        self.store.close();
    }
}

// == Cache ==
/// A generic key/value cache whose entries expire after a sliding TTL.
///
/// Entries get `item_ttl` of life on insertion, and every successful lookup
/// pushes the deadline to `now + item_ttl` (never backwards). A background
/// task sweeps expired entries every `sweep_interval`; it starts on the first
/// insert into an empty cache and exits when the cache drains, so an idle
/// cache costs nothing. Expired entries may remain visible for up to one
/// sweep interval.
///
/// Clones share the same store. The eviction task is shut down when
/// [`Cache::close`] is called or the last clone is dropped; after that every
/// operation returns [`Error::Closed`].
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use ttlkit::Cache;
///
/// #[tokio::main]
/// async fn main() -> ttlkit::Result<()> {
///     let cache = Cache::builder()
///         .sweep_interval(Duration::from_secs(1))
///         .item_ttl(Duration::from_secs(2))
///         .build()?;
///
///     cache.set("a", 1)?;
///     assert_eq!(cache.get("a")?, Some(1));
///     Ok(())
/// }
/// ```
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("item_ttl", &self.store().ttl())
            .field("sweep_interval", &self.store().sweep_interval())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<K, V> Cache<K, V> {
    /// Starts building a cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    pub(crate) fn from_store(store: Store<K, V>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Arc::new(store),
            }),
        }
    }

    fn store(&self) -> &Arc<Store<K, V>> {
        &self.shared.store
    }

    fn ensure_open(&self) -> Result<()> {
        if self.store().is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    // == Close ==
    /// Shuts down the eviction task. Safe to call any number of times.
    ///
    /// Cached values are not dropped until the last handle goes away.
    pub fn close(&self) {
        self.store().close();
    }

    /// Whether [`Cache::close`] was called or the last clone was dropped.
    pub fn is_closed(&self) -> bool {
        self.store().is_closed()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and granting a
    /// full TTL. Starts the eviction task if it is not running.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    pub fn set(&self, key: K, value: V) -> Result<()> {
        let store = self.store();
        let mut state = store.state.write();
        self.ensure_open()?;
        store.insert_locked(&mut state, key, value);
        Ok(())
    }

    // == Get ==
    /// Retrieves the value under `key`, renewing its deadline on a hit.
    ///
    /// # Arguments
    /// * `key` - The key to retrieve
    ///
    /// # Returns
    /// `Ok(None)` when the key is absent.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_if(key, |_| true)
    }

    /// Like [`Cache::get`], but an entry rejected by `check` is treated as a
    /// miss and its deadline is left untouched.
    ///
    /// # Arguments
    /// * `key` - The key to retrieve
    /// * `check` - Accepts or rejects the stored value
    pub fn get_if<Q, F>(&self, key: &Q, check: F) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        self.ensure_open()?;
        let store = self.store();
        let state = store.state.read();
        Ok(store.probe(&state.entries, key, check))
    }

    // == Search ==
    /// Returns the value of the first entry accepted by `predicate`, renewing
    /// its deadline.
    ///
    /// Entries are visited in no particular order. When several entries match,
    /// which one is returned is unspecified.
    ///
    /// # Arguments
    /// * `predicate` - Called with each key and value until it returns true
    pub fn search<F>(&self, predicate: F) -> Result<Option<V>>
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.ensure_open()?;
        let store = self.store();
        let state = store.state.read();
        Ok(store.search(&state.entries, predicate))
    }

    // == Get Or Create ==
    /// Returns the value under `key`, creating it with `create` if absent.
    ///
    /// See [`Cache::get_or_create_if`].
    pub fn get_or_create<F>(&self, key: K, create: F) -> Result<Option<V>>
    where
        F: FnOnce(&mut LockedStore<'_, K, V>) -> Option<V>,
    {
        self.get_or_create_if(key, |_| true, create)
    }

    /// Returns the value under `key` if present and accepted by `check`;
    /// otherwise runs `create` and caches what it returns.
    ///
    /// The lookup is double-checked: a miss under the shared lock is retried
    /// under the write lock, and `create` only runs if the key is still
    /// missing. Concurrent callers racing on one key therefore run `create`
    /// exactly once and all observe its value.
    ///
    /// `create` runs while the store's write lock is held, blocking every
    /// other operation on this cache. Keep it short, avoid I/O, and use the
    /// [`LockedStore`] it receives instead of this handle: calling back into
    /// the cache from inside `create` deadlocks.
    ///
    /// Returning `None` from `create` stores nothing and yields `Ok(None)`;
    /// the next call will try to create again.
    ///
    /// # Arguments
    /// * `key` - The key to look up or create
    /// * `check` - Accepts or rejects an existing value; a rejected value is
    ///   replaced by a fresh one
    /// * `create` - Builds the value under the write lock
    ///
    /// # Returns
    /// The existing or created value, or `None` when `create` declined.
    pub fn get_or_create_if<C, F>(&self, key: K, check: C, create: F) -> Result<Option<V>>
    where
        C: Fn(&V) -> bool,
        F: FnOnce(&mut LockedStore<'_, K, V>) -> Option<V>,
    {
        if let Some(value) = self.get_if(&key, &check)? {
            return Ok(Some(value));
        }

        let store = self.store();
        let mut state = store.state.write();
        self.ensure_open()?;

        // Another writer may have filled the key since the shared probe
        if let Some(value) = store.probe(&state.entries, &key, &check) {
            return Ok(Some(value));
        }

        let created = create(&mut LockedStore::new(store, &mut state));
        if let Some(value) = &created {
            store.insert_locked(&mut state, key, value.clone());
            store.stats.record_creation();
        }
        Ok(created)
    }

    // == Delete ==
    /// Removes the entry under `key`.
    ///
    /// # Arguments
    /// * `key` - The key to delete
    ///
    /// # Returns
    /// Whether an entry was present.
    pub fn delete<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.store();
        let mut state = store.state.write();
        self.ensure_open()?;
        Ok(state.entries.remove(key).is_some())
    }

    // == Length ==
    /// Returns the number of entries at call time, including expired entries
    /// not swept yet.
    pub fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.store().state.read().entries.len())
    }

    /// Whether [`Cache::len`] is zero.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // == Keys ==
    /// Returns a snapshot of the keys, in no particular order.
    pub fn keys(&self) -> Result<Vec<K>> {
        self.ensure_open()?;
        Ok(self.store().state.read().entries.keys().cloned().collect())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let store = self.store();
        let total_entries = store.state.read().entries.len();
        store.stats.snapshot(total_entries)
    }

    /// Whether an eviction task is currently alive for this cache.
    pub fn is_sweeping(&self) -> bool {
        self.store().state.read().sweeping
    }
}
