//! API Module
//!
//! HTTP handlers and routing for the sample application's image cache API.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /images/:entity/:id/:attribute` - Single images
//! - `PUT|GET /arrays/:entity/:id/:attribute` - Image arrays
//! - `POST /events` - Publish a record change
//! - `POST /invalidate` - Drop every cached image
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
