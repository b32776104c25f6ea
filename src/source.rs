//! Data Source Module
//!
//! Record change notifications and the data source contract the cache listens to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::metadata::EntityMetadata;

// == Record Event ==
/// A change to the records of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordEvent {
    Created { entity: String, id: String },
    Updated { entity: String, id: String },
    Deleted { entity: String, id: String },
    AllDeleted { entity: String },
}

impl RecordEvent {
    pub fn entity(&self) -> &str {
        match self {
            RecordEvent::Created { entity, .. }
            | RecordEvent::Updated { entity, .. }
            | RecordEvent::Deleted { entity, .. }
            | RecordEvent::AllDeleted { entity } => entity.as_str(),
        }
    }

    /// The affected record, absent for entity-wide deletions.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            RecordEvent::Created { id, .. }
            | RecordEvent::Updated { id, .. }
            | RecordEvent::Deleted { id, .. } => Some(id.as_str()),
            RecordEvent::AllDeleted { .. } => None,
        }
    }
}

// == Listener ==
/// Receives record change notifications from a [`DataSource`].
pub trait RecordListener: Send + Sync {
    fn on_record_event(&self, event: &RecordEvent);
}

/// Handle returned by [`DataSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// == Data Source ==
/// A source of entity metadata and record change notifications.
pub trait DataSource: Send + Sync {
    /// Entity metadata, read once when a consumer attaches.
    fn metadata(&self) -> Result<EntityMetadata>;

    /// Flips to `true` once the source has started.
    fn readiness(&self) -> watch::Receiver<bool>;

    fn subscribe(&self, listener: Arc<dyn RecordListener>) -> SubscriptionId;

    /// Returns false if the subscription was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Resolves once `source` has signalled readiness.
pub async fn wait_until_ready(source: &dyn DataSource) -> Result<()> {
    let mut readiness = source.readiness();
    readiness
        .wait_for(|ready| *ready)
        .await
        .map(|_| ())
        .map_err(|_| {
            CacheError::Internal("Data source closed before becoming ready".to_string())
        })
}

// == Memory Data Source ==
/// In-process data source that fans published events out to its listeners.
pub struct MemoryDataSource {
    metadata: EntityMetadata,
    ready: watch::Sender<bool>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn RecordListener>)>>,
    next_id: AtomicU64,
}

impl MemoryDataSource {
    pub fn new(metadata: EntityMetadata) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            metadata,
            ready,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // == Start ==
    /// Marks the source as started, releasing anyone awaiting readiness.
    pub fn start(&self) {
        if !self.ready.send_replace(true) {
            info!("Data source started");
        }
    }

    pub fn is_started(&self) -> bool {
        *self.ready.borrow()
    }

    // == Publish ==
    /// Delivers an event to every current listener.
    ///
    /// Listeners are called without holding the registry lock, so they may
    /// subscribe or unsubscribe from within the callback.
    pub fn publish(&self, event: &RecordEvent) {
        let listeners: Vec<Arc<dyn RecordListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!("Publishing {:?} to {} listener(s)", event, listeners.len());
        for listener in listeners {
            listener.on_record_event(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl DataSource for MemoryDataSource {
    fn metadata(&self) -> Result<EntityMetadata> {
        Ok(self.metadata.clone())
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    fn subscribe(&self, listener: Arc<dyn RecordListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
