//! Background Tasks Module
//!
//! Contains the background tasks a cache runs on its own.
//!
//! # Tasks
//! - Eviction: removes expired cache entries at the configured sweep interval

mod eviction;

pub(crate) use eviction::spawn_eviction_task;
