//! Cache Module
//!
//! Provides byte-bounded in-memory image caching with LRU eviction and
//! record-scoped invalidation.

mod entry;
mod image_cache;
mod key;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{Image, ImageSlot};
pub use image_cache::ImageCache;
pub use key::CacheKey;
pub use lru::{LruList, NodeId};
pub use stats::CacheStats;
pub use store::ImageStore;
