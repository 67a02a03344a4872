//! Track sources
//!
//! [`TrackSource`] is the seam between the playback controller and the catalog.
//! [`ProxyClient`] implements it over the scp-proxy HTTP contract and rebuilds the
//! shared failure taxonomy from status codes and error bodies.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scp_common::catalog::{ErrorBody, SearchPage, StreamResponse};
use scp_common::error::{NO_MEDIA_MESSAGE, STREAM_NOT_FOUND_MESSAGE, TRACK_NOT_FOUND_MESSAGE};
use scp_common::{Error, Result, StreamHandle, Track};
use std::time::Duration;
use tracing::{debug, warn};

/// Search and stream resolution, as seen by the controller
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Tracks matching `query`, in catalog relevance order
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    /// Fresh playable URL for `track_id`
    async fn resolve(&self, track_id: u64) -> Result<StreamHandle>;
}

/// HTTP client for the scp proxy
pub struct ProxyClient {
    http_client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scp-player/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TrackSource for ProxyClient {
    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/search", self.base_url);
        debug!(query = %query, "Searching via proxy");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("Proxy request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            warn!(query = %query, status = %status, error = %message, "Search rejected by proxy");
            return Err(Error::CatalogUnavailable(message));
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("Invalid search response: {}", e)))?;

        debug!(query = %query, count = page.collection.len(), "Search results received");
        Ok(page.collection)
    }

    async fn resolve(&self, track_id: u64) -> Result<StreamHandle> {
        let url = format!("{}/api/stream", self.base_url);
        debug!(track_id, "Resolving stream via proxy");

        let response = self
            .http_client
            .get(&url)
            .query(&[("trackId", track_id)])
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("Proxy request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(classify_failure(track_id, status, &message));
        }

        let body: StreamResponse = response
            .json()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("Invalid stream response: {}", e)))?;

        Ok(StreamHandle {
            track_id,
            url: body.stream_url,
        })
    }
}

/// `error` field of a failing response, or the status line when the body is not JSON
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    }
}

/// Map a failing `/api/stream` response back onto the failure taxonomy
fn classify_failure(track_id: u64, status: StatusCode, message: &str) -> Error {
    if status != StatusCode::NOT_FOUND {
        return Error::CatalogUnavailable(message.to_string());
    }
    match message {
        STREAM_NOT_FOUND_MESSAGE => Error::StreamNotFound(track_id),
        NO_MEDIA_MESSAGE => Error::NoMediaAvailable(track_id),
        TRACK_NOT_FOUND_MESSAGE => Error::TrackNotFound(track_id),
        _ => Error::TrackNotFound(track_id),
    }
}
