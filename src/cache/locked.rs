//! Locked Store Module
//!
//! The capability set handed to a get-or-create callback. It operates on the
//! write lock the cache already holds, so the callback can touch other keys
//! without re-locking (which would deadlock).

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::store::{State, Store};

/// Bounded access to a cache whose write lock is held by the current call.
pub struct LockedStore<'a, K, V> {
    store: &'a Arc<Store<K, V>>,
    state: &'a mut State<K, V>,
}

impl<'a, K, V> LockedStore<'a, K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(store: &'a Arc<Store<K, V>>, state: &'a mut State<K, V>) -> Self {
        Self { store, state }
    }

    /// Returns the value under `key`, renewing its deadline like `Cache::get`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.probe(&self.state.entries, key, |_| true)
    }

    /// Stores `value` under `key` with a fresh deadline.
    pub fn set(&mut self, key: K, value: V) {
        self.store.insert_locked(self.state, key, value);
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.entries.remove(key).is_some()
    }

    /// Whether `key` is present, without renewing it.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.entries.contains_key(key)
    }

    /// Number of entries, including expired ones not swept yet.
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}
