//! GET /api/stream

use axum::{
    extract::{Query, State},
    Json,
};
use scp_common::catalog::StreamResponse;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Raw id; parsed by the handler so a bad value gets the JSON error body
    #[serde(rename = "trackId")]
    pub track_id: Option<String>,
}

/// GET /api/stream?trackId=<id>
///
/// Resolves the track to a playable URL. 404 when the track has no media or no
/// progressive MP3 rendition, 500 on catalog faults.
pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> ApiResult<Json<StreamResponse>> {
    let track_id = parse_track_id(params.track_id.as_deref())?;

    let handle = state.resolver.resolve(track_id).await.map_err(|e| {
        match e {
            scp_common::Error::CatalogUnavailable(_) => {
                tracing::error!(track_id, error = %e, "Stream error")
            }
            _ => tracing::warn!(track_id, error = %e, "Stream unavailable"),
        }
        e
    })?;

    Ok(Json(StreamResponse {
        stream_url: handle.url,
    }))
}

fn parse_track_id(raw: Option<&str>) -> Result<u64, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("trackId is required".to_string()))?;

    raw.parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("trackId must be an integer, got '{}'", raw)))
}
