//! Eviction Task
//!
//! Background task that periodically removes expired cache entries. It is
//! started by the first insert into an empty store and exits on its own once
//! a sweep leaves the store empty, or as soon as the cache is closed.

use std::hash::Hash;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::store::Store;

/// Spawns the eviction loop for `store` on `runtime`.
///
/// Callers must hold the store's write lock and have just set its
/// `sweeping` flag; the task clears the flag itself when it exits.
pub(crate) fn spawn_eviction_task<K, V>(
    store: Arc<Store<K, V>>,
    runtime: &Handle,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let mut shutdown = store.subscribe_shutdown();
    let interval = store.sweep_interval();

    runtime.spawn(async move {
        info!(
            "Starting eviction task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            // A close that landed before we subscribed is only visible here
            if *shutdown.borrow_and_update() {
                store.mark_stopped();
                info!("Eviction task stopped: cache closed");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        store.mark_stopped();
                        info!("Eviction task stopped: cache closed");
                        return;
                    }
                    continue;
                }
            }

            let outcome = store.sweep();
            if outcome.evicted > 0 {
                debug!(
                    "Eviction sweep: removed {} expired entries, {} remaining",
                    outcome.evicted, outcome.remaining
                );
            }

            // Listener runs outside the store lock
            store.notify_evicted(outcome.removed);

            if outcome.stopped {
                info!("Eviction task stopped: store is empty");
                return;
            }
        }
    })
}
