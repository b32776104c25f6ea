//! Deferred Attach Task
//!
//! Background task that binds the image cache to a data source once the
//! source has started.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::ImageCache;
use crate::error::Result;
use crate::source::DataSource;

/// Spawns a task that attaches `cache` to `source`.
///
/// The task builds the image attribute index immediately and then waits for
/// the data source to signal readiness before registering for record events,
/// so composers can wire the cache before the source is started.
///
/// # Returns
/// A JoinHandle resolving to the attach result. Aborting the handle before
/// the source is ready leaves the cache unregistered and without an index.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ImageCache::new(8 * 1024 * 1024));
/// let handle = spawn_attach(cache.clone(), source.clone());
/// source.start();
/// handle.await??;
/// ```
pub fn spawn_attach(
    cache: Arc<ImageCache>,
    source: Arc<dyn DataSource>,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let result = cache.attach(&*source).await;
        match &result {
            Ok(()) => info!("Image cache attach task finished"),
            Err(e) => error!("Image cache attach failed: {}", e),
        }
        result
    })
}
