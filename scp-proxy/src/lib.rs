//! scp-proxy library interface
//!
//! Catalog proxy: forwards searches to the external music catalog and resolves
//! tracks to playable stream URLs, keeping the catalog client id server-side.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::{CatalogClient, StreamResolver};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog API client
    pub catalog: Arc<CatalogClient>,
    /// Stream resolver sharing the same catalog client
    pub resolver: Arc<StreamResolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(catalog: CatalogClient) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            resolver: Arc::new(StreamResolver::new(Arc::clone(&catalog))),
            catalog,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::catalog_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Front end is served from a different origin
        .layer(CorsLayer::permissive())
}
