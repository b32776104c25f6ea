//! Background Tasks Module
//!
//! Contains tasks that run alongside the cache.
//!
//! # Tasks
//! - Deferred attach: registers the cache once its data source has started

mod attach;

pub use attach::spawn_attach;
