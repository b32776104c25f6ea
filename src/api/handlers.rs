//! API Handlers
//!
//! HTTP request handlers for each image cache endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::ImageCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, HealthResponse, ImageArrayRequest, ImageArrayResponse, InvalidateResponse,
    SlotPath, StatsResponse, StoredResponse,
};
use crate::source::{MemoryDataSource, RecordEvent};

/// Application state shared across all handlers.
///
/// Owns the data source and the image cache composed on top of it.
#[derive(Clone)]
pub struct AppState {
    /// Shared image cache
    pub cache: Arc<ImageCache>,
    /// Data source whose record events invalidate the cache
    pub source: Arc<MemoryDataSource>,
}

impl AppState {
    /// Creates a new AppState from an already composed cache and source.
    pub fn new(cache: Arc<ImageCache>, source: Arc<MemoryDataSource>) -> Self {
        Self { cache, source }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The cache is sized from the Config and left detached; attach it with
    /// [`crate::tasks::spawn_attach`].
    pub fn from_config(config: &Config, source: Arc<MemoryDataSource>) -> Self {
        Self::new(Arc::new(ImageCache::new(config.max_cache_bytes)), source)
    }
}

fn checked(path: &SlotPath) -> Result<()> {
    match path.validate() {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /images/:entity/:id/:attribute
///
/// Stores the raw request body as the slot's single image.
pub async fn put_image_handler(
    State(state): State<AppState>,
    Path(path): Path<SlotPath>,
    body: Bytes,
) -> Result<Json<StoredResponse>> {
    checked(&path)?;

    let bytes = body.len();
    state
        .cache
        .add_image(&path.entity, &path.id, &path.attribute, body.to_vec());

    Ok(Json(StoredResponse::new(path.display_key(), bytes)))
}

/// Handler for GET /images/:entity/:id/:attribute
///
/// Returns the cached image bytes.
pub async fn get_image_handler(
    State(state): State<AppState>,
    Path(path): Path<SlotPath>,
) -> Result<Response> {
    checked(&path)?;

    let image = state
        .cache
        .get_image(&path.entity, &path.id, &path.attribute)?
        .ok_or_else(|| CacheError::NotFound(path.display_key()))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        image.to_vec(),
    )
        .into_response())
}

/// Handler for DELETE /images/:entity/:id/:attribute
///
/// Removes a slot of either shape.
pub async fn delete_image_handler(
    State(state): State<AppState>,
    Path(path): Path<SlotPath>,
) -> Result<Json<DeleteResponse>> {
    checked(&path)?;

    state
        .cache
        .remove_image(&path.entity, &path.id, &path.attribute)
        .ok_or_else(|| CacheError::NotFound(path.display_key()))?;

    Ok(Json(DeleteResponse::new(path.display_key())))
}

/// Handler for PUT /arrays/:entity/:id/:attribute
pub async fn put_array_handler(
    State(state): State<AppState>,
    Path(path): Path<SlotPath>,
    Json(req): Json<ImageArrayRequest>,
) -> Result<Json<StoredResponse>> {
    checked(&path)?;

    let images = req.into_images();
    let bytes = images.iter().flatten().map(|image| image.len()).sum();
    state
        .cache
        .add_image_array(&path.entity, &path.id, &path.attribute, images);

    Ok(Json(StoredResponse::new(path.display_key(), bytes)))
}

/// Handler for GET /arrays/:entity/:id/:attribute
pub async fn get_array_handler(
    State(state): State<AppState>,
    Path(path): Path<SlotPath>,
) -> Result<Json<ImageArrayResponse>> {
    checked(&path)?;

    let images = state
        .cache
        .get_image_array(&path.entity, &path.id, &path.attribute)?
        .ok_or_else(|| CacheError::NotFound(path.display_key()))?;

    Ok(Json(ImageArrayResponse::new(path.display_key(), &images)))
}

/// Handler for POST /events
///
/// Publishes a record change on the data source, as the sync engine would.
pub async fn publish_event_handler(
    State(state): State<AppState>,
    Json(event): Json<RecordEvent>,
) -> Result<Json<InvalidateResponse>> {
    if event.entity().is_empty() {
        return Err(CacheError::InvalidRequest(
            "entity cannot be empty".to_string(),
        ));
    }
    if event.record_id() == Some("") {
        return Err(CacheError::InvalidRequest("id cannot be empty".to_string()));
    }

    state.source.publish(&event);

    Ok(Json(InvalidateResponse {
        remaining_entries: state.cache.len(),
    }))
}

/// Handler for POST /invalidate
///
/// Drops every cached image.
pub async fn invalidate_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    state.cache.invalidate_all();

    Json(InvalidateResponse {
        remaining_entries: state.cache.len(),
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();

    Json(StatsResponse::new(
        &stats,
        state.cache.max_bytes(),
        state.cache.is_attached(),
    ))
}

/// Handler for GET /health
///
/// Reports "starting" until the data source has signalled readiness.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    if state.source.is_started() {
        Json(HealthResponse::healthy())
    } else {
        Json(HealthResponse::starting())
    }
}
