//! Response DTOs for the image cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Image};

/// Response body for reading an image array (GET /arrays/:entity/:id/:attribute)
#[derive(Debug, Clone, Serialize)]
pub struct ImageArrayResponse {
    /// The requested slot
    pub key: String,
    /// Positional images, `null` where absent
    pub images: Vec<Option<Vec<u8>>>,
}

impl ImageArrayResponse {
    pub fn new(key: impl Into<String>, images: &[Option<Image>]) -> Self {
        Self {
            key: key.into(),
            images: images
                .iter()
                .map(|image| image.as_ref().map(|bytes| bytes.to_vec()))
                .collect(),
        }
    }
}

/// Response body for storing a slot
#[derive(Debug, Clone, Serialize)]
pub struct StoredResponse {
    pub message: String,
    pub key: String,
    /// Payload bytes stored under the key
    pub bytes: usize,
}

impl StoredResponse {
    pub fn new(key: impl Into<String>, bytes: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored", key),
            key,
            bytes,
        }
    }
}

/// Response body for removing a slot (DELETE /images/:entity/:id/:attribute)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for cache-wide invalidation and published events
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Number of cache entries remaining afterwards
    pub remaining_entries: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub total_entries: usize,
    pub total_bytes: usize,
    pub max_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Whether the cache is listening to its data source
    pub attached: bool,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, max_bytes: usize, attached: bool) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            total_bytes: stats.total_bytes,
            max_bytes,
            hit_rate: stats.hit_rate(),
            attached,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    /// Reported while the data source has not started yet
    pub fn starting() -> Self {
        Self::with_status("starting")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
