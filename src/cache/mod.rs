//! Cache module - per-transaction composite entity cache

pub mod entity_cache;

pub use entity_cache::{CacheStats, LoadedCompositeEntity, LoadedEntityCache};
