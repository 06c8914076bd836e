//! Cache Store Module
//!
//! The shared state behind every cache handle: the entry map, its lock, the
//! eviction flag and the shutdown signal watched by the eviction task.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::stats::Stats;
use crate::cache::CacheEntry;
use crate::tasks::spawn_eviction_task;

/// Callback receiving the entries removed by one sweep.
pub type EvictionListener<K, V> = Box<dyn Fn(Vec<(K, V)>) + Send + Sync>;

// == Store State ==
/// Everything guarded by the store lock.
pub(crate) struct State<K, V> {
    pub(crate) entries: HashMap<K, CacheEntry<V>>,
    /// True while an eviction task is alive for this store
    pub(crate) sweeping: bool,
}

/// Result of one eviction sweep.
pub(crate) struct SweepOutcome<K, V> {
    /// Removed entries, collected only when a listener is installed
    pub(crate) removed: Vec<(K, V)>,
    pub(crate) evicted: usize,
    pub(crate) remaining: usize,
    /// The store drained and the task must exit
    pub(crate) stopped: bool,
}

// == Store ==
pub(crate) struct Store<K, V> {
    pub(crate) state: RwLock<State<K, V>>,
    ttl: Duration,
    sweep_interval: Duration,
    epoch: Instant,
    listener: Option<EvictionListener<K, V>>,
    runtime: Handle,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    pub(crate) stats: Stats,
}

impl<K, V> Store<K, V> {
    pub(crate) fn new(
        ttl: Duration,
        sweep_interval: Duration,
        listener: Option<EvictionListener<K, V>>,
        runtime: Handle,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: RwLock::new(State {
                entries: HashMap::new(),
                sweeping: false,
            }),
            ttl,
            sweep_interval,
            epoch: Instant::now(),
            listener,
            runtime,
            shutdown,
            closed: AtomicBool::new(false),
            stats: Stats::default(),
        }
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    // == Clock ==
    /// Nanoseconds elapsed since the store was created.
    pub(crate) fn now(&self) -> u64 {
        duration_nanos(self.epoch.elapsed())
    }

    /// Deadline for an entry inserted or renewed right now.
    pub(crate) fn deadline(&self) -> u64 {
        self.now().saturating_add(duration_nanos(self.ttl))
    }

    // == Lifecycle ==
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Signals the eviction task to stop. Only the first call has any effect.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);
        debug!("cache closed, eviction shutdown signalled");
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Clears the eviction flag after a forced shutdown.
    pub(crate) fn mark_stopped(&self) {
        self.state.write().sweeping = false;
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    // == Probe ==
    /// Looks up `key` in an already-locked map, renewing the deadline on a hit.
    ///
    /// An entry rejected by `check` counts as a miss and keeps its deadline.
    pub(crate) fn probe<Q, F>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
        key: &Q,
        check: F,
    ) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        match entries.get(key) {
            Some(entry) if check(entry.value()) => {
                entry.renew(self.deadline());
                self.stats.record_hit();
                Some(entry.value().clone())
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Scans for the first entry accepted by `predicate`, renewing it.
    pub(crate) fn search<F>(
        &self,
        entries: &HashMap<K, CacheEntry<V>>,
        mut predicate: F,
    ) -> Option<V>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let found = entries
            .iter()
            .find(|(key, entry)| predicate(key, entry.value()))
            .map(|(_, entry)| {
                entry.renew(self.deadline());
                entry.value().clone()
            });

        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Insert ==
    /// Inserts into an already write-locked state, starting the eviction task
    /// if none is alive.
    ///
    /// The flag flip and the spawn happen under the caller's lock, so two
    /// racing inserts can never both start a task.
    pub(crate) fn insert_locked(self: &Arc<Self>, state: &mut State<K, V>, key: K, value: V) {
        state
            .entries
            .insert(key, CacheEntry::new(value, self.deadline()));

        if !state.sweeping {
            state.sweeping = true;
            spawn_eviction_task(Arc::clone(self), &self.runtime);
        }
    }

    // == Sweep ==
    /// Removes every expired entry under the write lock.
    ///
    /// When the store ends up empty the eviction flag is cleared before the
    /// lock is released and the outcome tells the task to exit.
    pub(crate) fn sweep(&self) -> SweepOutcome<K, V> {
        let mut state = self.state.write();
        let now = self.now();

        let expired: Vec<K> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let evicted = expired.len();
        let mut removed = Vec::new();
        for key in expired {
            if let Some(entry) = state.entries.remove(&key) {
                if self.listener.is_some() {
                    removed.push((key, entry.into_value()));
                }
            }
        }

        let remaining = state.entries.len();
        let stopped = remaining == 0;
        if stopped {
            state.sweeping = false;
        }
        self.stats.record_sweep(evicted);

        SweepOutcome {
            removed,
            evicted,
            remaining,
            stopped,
        }
    }

    /// Hands removed entries to the listener. Must be called without the lock.
    ///
    /// A panicking listener is logged and swallowed so the eviction task
    /// keeps running and the `sweeping` flag stays accurate.
    pub(crate) fn notify_evicted(&self, removed: Vec<(K, V)>) {
        if removed.is_empty() {
            return;
        }
        if let Some(listener) = &self.listener {
            let count = removed.len();
            if panic::catch_unwind(AssertUnwindSafe(|| listener(removed))).is_err() {
                warn!(evicted = count, "Eviction listener panicked");
            }
        }
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
