//! GET /api/search

use axum::{
    extract::{Query, State},
    Json,
};
use scp_common::catalog::SearchPage;
use serde::Deserialize;

use crate::{error::ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query; absent is treated as blank
    #[serde(default)]
    pub q: String,
}

/// GET /api/search?q=<query>
///
/// Returns the catalog's search envelope unchanged (`{ collection: [...], ... }`).
/// A blank query yields an empty collection without an upstream call.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchPage>> {
    let page = state.catalog.search(&params.q).await.map_err(|e| {
        tracing::error!(query = %params.q, error = %e, "Search failed");
        e
    })?;

    Ok(Json(page))
}
