//! Integration Tests for the TTL Cache
//!
//! Exercises expiry, sliding renewal, eviction-task lifecycle and
//! exactly-once creation through the public API. Timing tests run on a
//! paused Tokio clock so they are deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ttlkit::{Cache, CacheBuilder, CacheConfig, Error};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttlkit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn create_cache(sweep_ms: u64, ttl_ms: u64) -> Cache<String, u32> {
    init_tracing();
    Cache::builder()
        .sweep_interval(Duration::from_millis(sweep_ms))
        .item_ttl(Duration::from_millis(ttl_ms))
        .build()
        .unwrap()
}

// == Expiry Scenarios ==

#[tokio::test(start_paused = true)]
async fn test_set_then_get_immediately() {
    let cache = create_cache(1_000, 2_000);

    cache.set("a".to_string(), 1).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_untouched_entry_expires() {
    let cache = create_cache(1_000, 2_000);
    cache.set("a".to_string(), 1).unwrap();

    sleep(Duration::from_millis(3_100)).await;

    assert_eq!(cache.get("a").unwrap(), None);
    assert_eq!(cache.len().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sliding_expiry_keeps_touched_entry() {
    let cache = create_cache(1_000, 2_000);
    cache.set("a".to_string(), 1).unwrap();

    for _ in 0..10 {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.get("a").unwrap(), Some(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_eviction_window() {
    let cache = create_cache(50, 100);
    cache.set("a".to_string(), 1).unwrap();

    sleep(Duration::from_millis(90)).await;
    assert!(cache.keys().unwrap().contains(&"a".to_string()));

    sleep(Duration::from_millis(70)).await;
    assert_eq!(cache.get("a").unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_search_renews_matched_entry() {
    let cache = create_cache(1_000, 2_000);
    cache.set("a".to_string(), 1).unwrap();
    cache.set("b".to_string(), 2).unwrap();

    for _ in 0..7 {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.search(|_, v| *v == 2).unwrap(), Some(2));
    }

    assert_eq!(cache.get("a").unwrap(), None);
    assert_eq!(cache.get("b").unwrap(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_search_without_match() {
    let cache = create_cache(1_000, 2_000);
    for i in 0..10 {
        cache.set(format!("key{}", i), i).unwrap();
    }

    assert_eq!(cache.search(|_, _| false).unwrap(), None);
}

// == Eviction Task Lifecycle ==

#[tokio::test(start_paused = true)]
async fn test_eviction_task_quiesces_and_restarts() {
    let cache = create_cache(50, 100);
    assert!(!cache.is_sweeping());

    cache.set("a".to_string(), 1).unwrap();
    assert!(cache.is_sweeping());

    sleep(Duration::from_millis(200)).await;
    assert!(!cache.is_sweeping(), "Task should stop once the cache drains");

    let sweeps = cache.stats().sweeps;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.stats().sweeps, sweeps, "No sweeps while idle");

    // A new insert runs on its own fresh schedule
    cache.set("b".to_string(), 2).unwrap();
    assert!(cache.is_sweeping());

    sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.len().unwrap(), 1);

    sleep(Duration::from_millis(70)).await;
    assert_eq!(cache.get("b").unwrap(), None);
    assert_eq!(cache.stats().evictions, 2);
}

#[tokio::test(start_paused = true)]
async fn test_listener_receives_evicted_entries() {
    init_tracing();
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);

    let cache: Cache<String, u32> = Cache::builder()
        .sweep_interval(Duration::from_millis(50))
        .item_ttl(Duration::from_millis(100))
        .on_evicted(move |removed| sink.lock().unwrap().extend(removed))
        .build()
        .unwrap();

    cache.set("a".to_string(), 1).unwrap();
    cache.set("b".to_string(), 2).unwrap();
    sleep(Duration::from_millis(200)).await;

    let mut seen = evicted.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_keeps_eviction_alive() {
    init_tracing();
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);

    let cache: Cache<String, u32> = Cache::builder()
        .sweep_interval(Duration::from_millis(50))
        .item_ttl(Duration::from_millis(100))
        .on_evicted(move |removed: Vec<(String, u32)>| {
            if removed.iter().any(|(key, _)| key == "boom") {
                panic!("listener rejected boom");
            }
            sink.lock().unwrap().extend(removed);
        })
        .build()
        .unwrap();

    cache.set("boom".to_string(), 1).unwrap();
    sleep(Duration::from_millis(60)).await;
    cache.set("keep".to_string(), 2).unwrap();

    // The sweep at 150ms drops "boom" and the listener panics; "keep" lives
    // until 160ms
    sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.keys().unwrap(), vec!["keep".to_string()]);
    assert!(cache.is_sweeping());

    sleep(Duration::from_millis(100)).await;
    assert!(cache.is_empty().unwrap());
    assert!(!cache.is_sweeping(), "Task should still stop once drained");
    assert_eq!(*evicted.lock().unwrap(), vec![("keep".to_string(), 2)]);

    // A later insert gets a fresh task and is evicted as usual
    cache.set("b".to_string(), 3).unwrap();
    assert!(cache.is_sweeping());
    sleep(Duration::from_millis(200)).await;
    assert_eq!(cache.get("b").unwrap(), None);
    assert!(!cache.is_sweeping());
}

#[tokio::test(start_paused = true)]
async fn test_listener_can_use_cache_during_notification() {
    init_tracing();
    let reentered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reentered);
    let slot: Arc<Mutex<Option<Cache<String, u32>>>> = Arc::new(Mutex::new(None));
    let listener_slot = Arc::clone(&slot);

    let cache: Cache<String, u32> = Cache::builder()
        .sweep_interval(Duration::from_millis(50))
        .item_ttl(Duration::from_millis(100))
        .on_evicted(move |removed: Vec<(String, u32)>| {
            let Some(cache) = listener_slot.lock().unwrap().clone() else {
                return;
            };
            // Query from another thread so a held store lock shows up as a
            // timeout instead of hanging the test
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(cache.len().is_ok());
            });
            let completed = rx.recv_timeout(Duration::from_secs(2)).unwrap_or(false);
            sink.lock().unwrap().push((removed.len(), completed));
        })
        .build()
        .unwrap();
    *slot.lock().unwrap() = Some(cache.clone());

    cache.set("a".to_string(), 1).unwrap();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(*reentered.lock().unwrap(), vec![(1, true)]);
    assert!(cache.is_empty().unwrap());

    // Break the listener's reference cycle
    slot.lock().unwrap().take();
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_eviction_task() {
    let cache = create_cache(60_000, 3_600_000);
    cache.set("a".to_string(), 1).unwrap();
    assert!(cache.is_sweeping());

    cache.close();
    sleep(Duration::from_millis(1)).await;

    assert!(!cache.is_sweeping());
    assert!(matches!(cache.get("a"), Err(Error::Closed)));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_releases_store() {
    init_tracing();
    let marker = Arc::new(());
    let held = Arc::clone(&marker);

    let cache: Cache<String, u32> = Cache::builder()
        .sweep_interval(Duration::from_secs(60))
        .item_ttl(Duration::from_secs(3_600))
        .on_evicted(move |_| {
            let _held = &held;
        })
        .build()
        .unwrap();
    cache.set("a".to_string(), 1).unwrap();
    let clone = cache.clone();

    drop(cache);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(Arc::strong_count(&marker), 2, "A live clone keeps the cache open");
    assert!(!clone.is_closed());

    drop(clone);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(
        Arc::strong_count(&marker),
        1,
        "Eviction task must exit and release the store"
    );
}

#[tokio::test(start_paused = true)]
async fn test_config_driven_cache() {
    init_tracing();
    let config = CacheConfig::new(Duration::from_millis(50), Duration::from_millis(100));
    let cache: Cache<&'static str, &'static str> =
        CacheBuilder::from_config(config).build().unwrap();

    cache.set("k", "v").unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(cache.get("k").unwrap(), None);
}

// == Exactly-Once Creation ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_create_runs_once() {
    let cache = create_cache(1_000, 60_000);
    let counter = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let cache = cache.clone();
        let counter = Arc::clone(&counter);
        handles.push(tokio::task::spawn_blocking(move || {
            cache
                .get_or_create("x".to_string(), |_| {
                    // Widen the race window
                    std::thread::sleep(Duration::from_millis(20));
                    Some(counter.fetch_add(1, Ordering::SeqCst) as u32 + 1)
                })
                .unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| *r == Some(1)));
    assert_eq!(cache.stats().creations, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_uncached_creation_repeats() {
    let cache = create_cache(1_000, 60_000);
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_create("x".to_string(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            })
            .unwrap();
        assert_eq!(value, None);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!cache.is_sweeping(), "Nothing stored, so no task started");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_operations() {
    let cache = create_cache(10, 60_000);

    let mut handles = Vec::new();
    for worker in 0..8u32 {
        let cache = cache.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            for i in 0..200u32 {
                let key = format!("k{}", i % 16);
                match (worker + i) % 4 {
                    0 => cache.set(key, i).unwrap(),
                    1 => {
                        cache.get(&key).unwrap();
                    }
                    2 => {
                        cache.delete(&key).unwrap();
                    }
                    _ => {
                        cache.get_or_create(key, |_| Some(i)).unwrap();
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(cache.len().unwrap() <= 16);
    // A non-empty cache always has a live eviction task
    if !cache.is_empty().unwrap() {
        assert!(cache.is_sweeping());
    }
}
