//! ttlkit - In-process expiring containers
//!
//! Provides a generic TTL cache with sliding expiration, exactly-once
//! get-or-create and a background eviction task that starts and stops on its
//! own, plus the small containers built around it: a LIFO stack, a streaming
//! JSON decoder and lazily reloaded file-backed lists and maps.

pub mod cache;
pub mod config;
pub mod error;
pub mod file;
pub mod json;
pub mod stack;
mod tasks;

pub use cache::{Cache, CacheBuilder, CacheStats, LockedStore};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use file::{FileList, FileMap, LazyFile};
pub use json::{Field, JsonDecoder, JsonObject, Scope, Token};
pub use stack::Stack;
