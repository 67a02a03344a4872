//! HTTP API handlers for scp-proxy
//!
//! The proxy contract: `/api/search` and `/api/stream`, plus `/health`.

pub mod health;
pub mod search;
pub mod stream;

pub use health::health_routes;

use crate::AppState;
use axum::{routing::get, Router};

/// Build catalog routes (`/api/search`, `/api/stream`)
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search::search))
        .route("/api/stream", get(stream::stream))
}
