//! API Routes
//!
//! Configures the Axum router with all image cache endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_image_handler, get_array_handler, get_image_handler, health_handler,
    invalidate_handler, publish_event_handler, put_array_handler, put_image_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT|GET|DELETE /images/:entity/:id/:attribute` - Single images (raw bytes)
/// - `PUT|GET /arrays/:entity/:id/:attribute` - Image arrays (JSON)
/// - `POST /events` - Publish a record change on the data source
/// - `POST /invalidate` - Drop every cached image
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/images/:entity/:id/:attribute",
            put(put_image_handler)
                .get(get_image_handler)
                .delete(delete_image_handler),
        )
        .route(
            "/arrays/:entity/:id/:attribute",
            put(put_array_handler).get(get_array_handler),
        )
        .route("/events", post(publish_event_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
