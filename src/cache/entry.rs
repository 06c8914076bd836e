//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with a sliding deadline.

use std::sync::atomic::{AtomicU64, Ordering};

// == Cache Entry ==
/// A stored value together with its expiry deadline.
///
/// The deadline is kept as nanoseconds since the owning store's epoch in an
/// atomic, so readers holding only the shared store lock can push it forward.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: V,
    expire_at: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring at `expire_at` (store-relative nanoseconds).
    pub fn new(value: V, expire_at: u64) -> Self {
        Self {
            value,
            expire_at: AtomicU64::new(expire_at),
        }
    }

    /// Returns the stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, yielding its value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the current deadline.
    pub fn expire_at(&self) -> u64 {
        self.expire_at.load(Ordering::Acquire)
    }

    // == Renew ==
    /// Moves the deadline forward to `deadline` unless it is already later.
    ///
    /// Returns the effective deadline after the call. Concurrent renewals with
    /// stale clock readings can never shorten an entry's life.
    pub fn renew(&self, deadline: u64) -> u64 {
        self.expire_at
            .fetch_max(deadline, Ordering::AcqRel)
            .max(deadline)
    }

    // == Is Expired ==
    /// Checks whether the deadline lies strictly before `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expire_at()
    }
}
