//! Image Cache Module
//!
//! Thread-safe entity image cache: public read/write contract, record-scoped
//! invalidation, and attachment to a data source's change notifications.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tracing::{debug, info};

use crate::cache::entry::{ARRAY_KIND, SINGLE_KIND};
use crate::cache::{CacheKey, CacheStats, Image, ImageSlot, ImageStore};
use crate::error::{CacheError, Result};
use crate::invalidation::ImageAttributeIndex;
use crate::source::{wait_until_ready, DataSource, RecordEvent, RecordListener, SubscriptionId};

#[derive(Debug, Default)]
struct Binding {
    /// Bumped by every detach so a pending attach can tell it was cancelled
    generation: u64,
    subscription: Option<SubscriptionId>,
    /// Attach calls waiting for the data source to become ready
    pending: usize,
}

fn type_mismatch(key: &CacheKey, expected: &'static str, found: &ImageSlot) -> CacheError {
    CacheError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

// == Image Cache ==
/// Shared image cache for entity records.
///
/// Construct one per data layer and hand out `Arc<ImageCache>` to readers.
/// All store mutations are serialized under a single lock.
#[derive(Debug)]
pub struct ImageCache {
    store: Mutex<ImageStore>,
    index: RwLock<Option<ImageAttributeIndex>>,
    binding: Mutex<Binding>,
}

impl ImageCache {
    // == Constructor ==
    /// Creates a detached cache holding at most `max_bytes` of images.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            store: Mutex::new(ImageStore::new(max_bytes)),
            index: RwLock::new(None),
            binding: Mutex::new(Binding::default()),
        }
    }

    // == Add Image ==
    /// Caches the image of a single-image attribute.
    pub fn add_image(
        &self,
        entity: &str,
        record_id: &str,
        attribute: &str,
        image: impl Into<Image>,
    ) {
        let key = CacheKey::new(entity, record_id, attribute);
        self.store().put(key, ImageSlot::Single(image.into()));
    }

    // == Add Image Array ==
    /// Caches the images of an image-array attribute; absent positions are kept.
    pub fn add_image_array(
        &self,
        entity: &str,
        record_id: &str,
        attribute: &str,
        images: Vec<Option<Image>>,
    ) {
        let key = CacheKey::new(entity, record_id, attribute);
        self.store().put(key, ImageSlot::Array(images));
    }

    // == Get Image ==
    /// Returns the cached image, or `TypeMismatch` if the slot holds an array.
    pub fn get_image(
        &self,
        entity: &str,
        record_id: &str,
        attribute: &str,
    ) -> Result<Option<Image>> {
        let key = CacheKey::new(entity, record_id, attribute);
        match self.store().get(&key) {
            None => Ok(None),
            Some(ImageSlot::Single(image)) => Ok(Some(image)),
            Some(slot) => Err(type_mismatch(&key, SINGLE_KIND, &slot)),
        }
    }

    // == Get Image Array ==
    /// Returns the cached images, or `TypeMismatch` if the slot holds one image.
    pub fn get_image_array(
        &self,
        entity: &str,
        record_id: &str,
        attribute: &str,
    ) -> Result<Option<Vec<Option<Image>>>> {
        let key = CacheKey::new(entity, record_id, attribute);
        match self.store().get(&key) {
            None => Ok(None),
            Some(ImageSlot::Array(images)) => Ok(Some(images)),
            Some(slot) => Err(type_mismatch(&key, ARRAY_KIND, &slot)),
        }
    }

    /// Removes one slot, returning it if present.
    pub fn remove_image(
        &self,
        entity: &str,
        record_id: &str,
        attribute: &str,
    ) -> Option<ImageSlot> {
        self.store()
            .remove(&CacheKey::new(entity, record_id, attribute))
    }

    pub fn contains(&self, entity: &str, record_id: &str, attribute: &str) -> bool {
        self.store()
            .contains(&CacheKey::new(entity, record_id, attribute))
    }

    pub fn clear(&self) {
        self.store().clear();
    }

    // == Invalidate Record ==
    /// Drops every cached image attribute of one record.
    ///
    /// Cost is proportional to the entity's image attributes, not the cache
    /// size. Does nothing while detached or for entities without images.
    /// Returns the number of entries dropped.
    pub fn invalidate_record(&self, entity: &str, record_id: &str) -> usize {
        let keys = match self.index_guard().as_ref() {
            Some(index) => index.record_keys(entity, record_id),
            None => return 0,
        };
        if keys.is_empty() {
            return 0;
        }

        let mut store = self.store();
        let removed = keys.iter().filter(|key| store.invalidate(key)).count();
        debug!(
            "Invalidated {} image(s) of {} record {}",
            removed, entity, record_id
        );
        removed
    }

    // == Invalidate All ==
    /// Drops the whole cache.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.store().invalidate_all();
        debug!("Invalidated all {} cached image(s)", removed);
        removed
    }

    // == Record Events ==
    /// Applies a record change notification.
    pub fn handle_event(&self, event: &RecordEvent) {
        match event {
            RecordEvent::Created { .. } => {}
            RecordEvent::Updated { entity, id } | RecordEvent::Deleted { entity, id } => {
                self.invalidate_record(entity, id);
            }
            // Entity-wide deletions clear every entity's images
            RecordEvent::AllDeleted { .. } => {
                self.invalidate_all();
            }
        }
    }

    // == Attach ==
    /// Binds the cache to `source`.
    ///
    /// Builds the image attribute index from the source's metadata, then
    /// waits for the source to become ready before subscribing to its record
    /// events. Subscribes at most once no matter how often it is called; a
    /// [`detach`](Self::detach) while waiting cancels the pending subscription.
    /// If the wait fails or the future is dropped, the index is discarded
    /// again unless another attach is still pending or has subscribed.
    pub async fn attach(self: &Arc<Self>, source: &dyn DataSource) -> Result<()> {
        let index = ImageAttributeIndex::build(&source.metadata()?);

        let generation = {
            let mut binding = self.binding();
            if binding.subscription.is_some() {
                debug!("Image cache already attached");
                return Ok(());
            }
            info!("Image cache indexed {} entities with images", index.len());
            *self.index_mut() = Some(index);
            binding.pending += 1;
            binding.generation
        };
        let _pending = PendingAttach { cache: self };

        if !*source.readiness().borrow() {
            info!("Data source not started; deferring listener registration");
        }
        wait_until_ready(source).await?;

        let mut binding = self.binding();
        if binding.generation != generation {
            debug!("Image cache detached before the data source became ready");
            return Ok(());
        }
        if binding.subscription.is_none() {
            let listener = Arc::new(CacheListener {
                cache: Arc::downgrade(self),
            });
            binding.subscription = Some(source.subscribe(listener));
            info!("Image cache listening for record changes");
        }
        Ok(())
    }

    // == Detach ==
    /// Unbinds the cache from `source` and discards the attribute index.
    pub fn detach(&self, source: &dyn DataSource) {
        let mut binding = self.binding();
        binding.generation += 1;
        if let Some(subscription) = binding.subscription.take() {
            source.unsubscribe(subscription);
        }
        *self.index_mut() = None;
        info!("Image cache detached");
    }

    pub fn is_attached(&self) -> bool {
        self.binding().subscription.is_some()
    }

    /// Image attributes indexed for `entity` while attached.
    pub fn image_attributes(&self, entity: &str) -> Option<Vec<String>> {
        self.index_guard()
            .as_ref()
            .and_then(|index| index.attributes(entity))
            .map(<[String]>::to_vec)
    }

    /// A copy of the current attribute index, None while detached.
    pub fn index_snapshot(&self) -> Option<ImageAttributeIndex> {
        self.index_guard().clone()
    }

    // == Inspection ==
    pub fn stats(&self) -> CacheStats {
        self.store().stats()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.store().size_bytes()
    }

    pub fn max_bytes(&self) -> usize {
        self.store().max_bytes()
    }

    fn store(&self) -> MutexGuard<'_, ImageStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn binding(&self) -> MutexGuard<'_, Binding> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_guard(&self) -> std::sync::RwLockReadGuard<'_, Option<ImageAttributeIndex>> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_mut(&self) -> std::sync::RwLockWriteGuard<'_, Option<ImageAttributeIndex>> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Pending Attach ==
/// Released when an attach call finishes, fails or is dropped mid-wait.
///
/// The last pending attach to leave without a subscription in place drops
/// the index it installed.
struct PendingAttach<'a> {
    cache: &'a ImageCache,
}

impl Drop for PendingAttach<'_> {
    fn drop(&mut self) {
        let mut binding = self.cache.binding();
        binding.pending -= 1;
        if binding.pending == 0 && binding.subscription.is_none() {
            *self.cache.index_mut() = None;
        }
    }
}

// == Listener ==
/// Forwards record events to a cache without keeping it alive.
struct CacheListener {
    cache: Weak<ImageCache>,
}

impl RecordListener for CacheListener {
    fn on_record_event(&self, event: &RecordEvent) {
        if let Some(cache) = self.cache.upgrade() {
            cache.handle_event(event);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityMetadata;
    use crate::source::MemoryDataSource;
    use std::time::Duration;

    fn image(len: usize) -> Image {
        Arc::from(vec![3u8; len])
    }

    fn source() -> MemoryDataSource {
        MemoryDataSource::new(
            EntityMetadata::from_json(
                r#"{"entities": [
                    {"name": "Product", "attributes": [
                        {"name": "photo", "type": "image"},
                        {"name": "gallery", "type": "image_array"},
                        {"name": "title", "type": "text"}
                    ]},
                    {"name": "Order", "attributes": [
                        {"name": "total", "type": "decimal"}
                    ]}
                ]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_add_and_get_image() {
        let cache = ImageCache::new(1024);
        cache.add_image("Product", "1", "photo", vec![1u8, 2, 3]);

        let cached = cache.get_image("Product", "1", "photo").unwrap().unwrap();
        assert_eq!(&*cached, &[1u8, 2, 3]);
        assert!(cache.get_image("Product", "2", "photo").unwrap().is_none());
    }

    #[test]
    fn test_add_and_get_image_array() {
        let cache = ImageCache::new(1024);
        cache.add_image_array("Product", "1", "gallery", vec![Some(image(4)), None]);

        let images = cache
            .get_image_array("Product", "1", "gallery")
            .unwrap()
            .unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[1].is_none());
        assert_eq!(cache.size_bytes(), 4);
    }

    #[test]
    fn test_single_read_of_array_slot_is_type_mismatch() {
        let cache = ImageCache::new(1024);
        cache.add_image_array("Product", "1", "gallery", vec![Some(image(4))]);

        let result = cache.get_image("Product", "1", "gallery");
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[test]
    fn test_array_read_of_single_slot_is_type_mismatch() {
        let cache = ImageCache::new(1024);
        cache.add_image("Product", "1", "photo", image(4));

        let result = cache.get_image_array("Product", "1", "photo");
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[test]
    fn test_invalidate_record_is_noop_while_detached() {
        let cache = ImageCache::new(1024);
        cache.add_image("Product", "1", "photo", image(4));

        assert_eq!(cache.invalidate_record("Product", "1"), 0);
        assert!(cache.contains("Product", "1", "photo"));
    }

    #[tokio::test]
    async fn test_invalidate_record_scoped_to_record() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));
        cache.attach(&source).await.unwrap();

        cache.add_image("Product", "1", "photo", image(4));
        cache.add_image_array("Product", "1", "gallery", vec![Some(image(4))]);
        cache.add_image("Product", "2", "photo", image(4));

        assert_eq!(cache.invalidate_record("Product", "1"), 2);
        assert!(!cache.contains("Product", "1", "photo"));
        assert!(!cache.contains("Product", "1", "gallery"));
        assert!(cache.contains("Product", "2", "photo"));
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[tokio::test]
    async fn test_invalidate_record_ignores_non_image_attributes() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));
        cache.attach(&source).await.unwrap();

        // Cached under an attribute the metadata does not type as an image
        cache.add_image("Product", "1", "title", image(4));

        assert_eq!(cache.invalidate_record("Product", "1"), 0);
        assert!(cache.contains("Product", "1", "title"));
    }

    #[tokio::test]
    async fn test_events_drive_invalidation() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));
        cache.attach(&source).await.unwrap();

        cache.add_image("Product", "1", "photo", image(4));
        cache.add_image("Product", "2", "photo", image(4));

        source.publish(&RecordEvent::Created {
            entity: "Product".to_string(),
            id: "1".to_string(),
        });
        assert_eq!(cache.len(), 2);

        source.publish(&RecordEvent::Updated {
            entity: "Product".to_string(),
            id: "1".to_string(),
        });
        assert!(!cache.contains("Product", "1", "photo"));
        assert!(cache.contains("Product", "2", "photo"));

        source.publish(&RecordEvent::AllDeleted {
            entity: "Order".to_string(),
        });
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));

        cache.attach(&source).await.unwrap();
        cache.attach(&source).await.unwrap();

        assert!(cache.is_attached());
        assert_eq!(source.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_attach_waits_for_readiness() {
        let source = Arc::new(source());
        let cache = Arc::new(ImageCache::new(1024));

        let pending = {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            tokio::spawn(async move { cache.attach(&*source).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!cache.is_attached());
        assert_eq!(source.listener_count(), 0);

        source.start();
        pending.await.unwrap().unwrap();

        assert!(cache.is_attached());
        assert_eq!(source.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_detach_cancels_pending_attach() {
        let source = Arc::new(source());
        let cache = Arc::new(ImageCache::new(1024));

        let pending = {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            tokio::spawn(async move { cache.attach(&*source).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.detach(&*source);
        source.start();
        pending.await.unwrap().unwrap();

        assert!(!cache.is_attached());
        assert_eq!(source.listener_count(), 0);
        assert!(cache.index_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_detach_unsubscribes_and_drops_index() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));
        cache.attach(&source).await.unwrap();
        assert_eq!(
            cache.image_attributes("Product"),
            Some(vec!["photo".to_string(), "gallery".to_string()])
        );

        cache.detach(&source);

        assert!(!cache.is_attached());
        assert_eq!(source.listener_count(), 0);
        assert!(cache.image_attributes("Product").is_none());

        // Events after detach no longer reach the cache
        cache.add_image("Product", "1", "photo", image(4));
        source.publish(&RecordEvent::Deleted {
            entity: "Product".to_string(),
            id: "1".to_string(),
        });
        assert!(cache.contains("Product", "1", "photo"));
    }

    #[tokio::test]
    async fn test_reattach_rebuilds_identical_index() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));

        cache.attach(&source).await.unwrap();
        let first = cache.index_snapshot().unwrap();
        cache.detach(&source);
        cache.attach(&source).await.unwrap();
        let second = cache.index_snapshot().unwrap();

        assert_eq!(first, second);
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn test_listener_does_not_keep_cache_alive() {
        let source = source();
        source.start();
        let cache = Arc::new(ImageCache::new(1024));
        tokio_test::block_on(cache.attach(&source)).unwrap();

        drop(cache);
        // Publishing to a dropped cache is harmless
        source.publish(&RecordEvent::Updated {
            entity: "Product".to_string(),
            id: "1".to_string(),
        });
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn test_concurrent_puts_keep_size_consistent() {
        let cache = Arc::new(ImageCache::new(10_000));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let id = format!("{}", (worker * 7 + i) % 50);
                        cache.add_image("Product", &id, "photo", image(100 + i % 13));
                        let _ = cache.get_image("Product", &id, "photo");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.total_bytes <= 10_000);
        assert!(stats.total_entries <= 50);

        let mut store = cache.store();
        let keys = store.keys_by_recency();
        let distinct: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), store.len());
        assert_eq!(distinct.len(), keys.len());

        let stored_bytes: usize = keys
            .iter()
            .map(|key| store.get(key).map(|slot| slot.size_bytes()).unwrap_or(0))
            .sum();
        assert_eq!(stored_bytes, store.size_bytes());
    }

    #[test]
    fn test_control_characters_do_not_merge_records() {
        let cache = ImageCache::new(1024);
        cache.add_image("A\u{1f}B", "C", "photo", vec![1u8]);
        cache.add_image("A", "B\u{1f}C", "photo", vec![2u8, 2]);

        assert_eq!(cache.len(), 2);
        let first = cache.get_image("A\u{1f}B", "C", "photo").unwrap().unwrap();
        assert_eq!(&*first, &[1u8]);
    }

    #[test]
    fn test_type_mismatch_names_both_shapes() {
        let cache = ImageCache::new(1024);
        cache.add_image("Product", "1", "photo", image(2));

        match cache.get_image_array("Product", "1", "photo") {
            Err(CacheError::TypeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, "image array");
                assert_eq!(found, "image");
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    /// A source that shuts down before it ever becomes ready.
    struct ClosedSource {
        inner: MemoryDataSource,
    }

    impl DataSource for ClosedSource {
        fn metadata(&self) -> Result<EntityMetadata> {
            self.inner.metadata()
        }

        fn readiness(&self) -> tokio::sync::watch::Receiver<bool> {
            let (_, receiver) = tokio::sync::watch::channel(false);
            receiver
        }

        fn subscribe(&self, listener: Arc<dyn RecordListener>) -> SubscriptionId {
            self.inner.subscribe(listener)
        }

        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            self.inner.unsubscribe(id)
        }
    }

    #[tokio::test]
    async fn test_failed_attach_discards_index() {
        let source = ClosedSource { inner: source() };
        let cache = Arc::new(ImageCache::new(1024));
        cache.add_image("Product", "1", "photo", image(4));

        let result = cache.attach(&source).await;

        assert!(matches!(result, Err(CacheError::Internal(_))));
        assert!(!cache.is_attached());
        assert!(cache.index_snapshot().is_none());
        assert_eq!(cache.invalidate_record("Product", "1"), 0);
        assert!(cache.contains("Product", "1", "photo"));
    }

    #[tokio::test]
    async fn test_failed_attach_keeps_index_of_pending_attach() {
        let live = Arc::new(source());
        let cache = Arc::new(ImageCache::new(1024));

        let pending = {
            let cache = Arc::clone(&cache);
            let live = Arc::clone(&live);
            tokio::spawn(async move { cache.attach(&*live).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let closed = ClosedSource { inner: source() };
        assert!(cache.attach(&closed).await.is_err());
        assert!(cache.index_snapshot().is_some());

        live.start();
        pending.await.unwrap().unwrap();
        assert!(cache.is_attached());
        assert!(cache.index_snapshot().is_some());
    }

    #[tokio::test]
    async fn test_dropped_attach_discards_index() {
        let source = source();
        let cache = Arc::new(ImageCache::new(1024));

        let attach = cache.attach(&source);
        let timed_out = tokio::time::timeout(Duration::from_millis(20), attach).await;

        assert!(timed_out.is_err());
        assert!(!cache.is_attached());
        assert!(cache.index_snapshot().is_none());
    }
}
