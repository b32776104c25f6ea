//! Ymir Image Cache - entity image caching for offline-capable data layers
//!
//! Provides a byte-bounded LRU image cache whose entries are invalidated by
//! record change notifications from the data source it is attached to.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod metadata;
pub mod models;
pub mod source;
pub mod tasks;

pub use api::AppState;
pub use cache::ImageCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use source::{DataSource, MemoryDataSource, RecordEvent, RecordListener};
pub use tasks::spawn_attach;
