//! Cache Module
//!
//! Provides an in-process generic cache with sliding TTL expiration and a
//! self-managing background eviction task.

mod builder;
mod entry;
mod handle;
mod locked;
mod stats;
pub(crate) mod store;


// Re-export public types
pub use builder::CacheBuilder;
pub(crate) use entry::CacheEntry;
pub use handle::Cache;
pub use locked::LockedStore;
pub use stats::CacheStats;
pub use store::EvictionListener;
