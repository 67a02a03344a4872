//! Catalog API client
//!
//! Three outbound calls against the external music catalog:
//! - `GET {base}/search/tracks` for search
//! - `GET {base}/tracks/{id}` for track metadata including transcodings
//! - `GET {transcoding.url}` to turn a transcoding into a playable URL
//!
//! Every call carries the service client id as a query parameter. Transport errors
//! are logged without their URL so the client id never reaches the log.

use scp_common::catalog::{SearchPage, Track, Transcoding, TranscodingLocation};
use scp_common::{Error, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("scp-proxy/", env!("CARGO_PKG_VERSION"));

/// Catalog API client
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    client_id: String,
    search_limit: u32,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            search_limit: crate::config::DEFAULT_SEARCH_LIMIT,
        })
    }

    /// Number of tracks requested per search page
    pub fn with_search_limit(mut self, search_limit: u32) -> Self {
        self.search_limit = search_limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search tracks by free text
    ///
    /// A blank query returns an empty page without touching the network. Any
    /// transport, status or decoding failure is `CatalogUnavailable`.
    pub async fn search(&self, query: &str) -> Result<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("Blank search query, skipping catalog call");
            return Ok(SearchPage::default());
        }

        let url = format!("{}/search/tracks", self.base_url);
        let limit = self.search_limit.to_string();

        tracing::debug!(query = %query, limit = self.search_limit, "Searching catalog");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("client_id", self.client_id.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogUnavailable(format!(
                "search returned HTTP {}",
                status.as_u16()
            )));
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("search decode failed: {}", e.without_url())))?;

        tracing::info!(query = %query, results = page.collection.len(), "Catalog search complete");

        Ok(page)
    }

    /// Fetch full metadata (with transcodings) for one track
    ///
    /// Non-2xx or empty body is `TrackNotFound`; transport and decoding faults are
    /// `CatalogUnavailable`.
    pub async fn fetch_track(&self, track_id: u64) -> Result<Track> {
        let url = format!("{}/tracks/{}", self.base_url, track_id);

        tracing::debug!(track_id, "Fetching track metadata");

        let response = self
            .http_client
            .get(&url)
            .query(&[("client_id", self.client_id.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(track_id, status = status.as_u16(), "Track metadata not available");
            return Err(Error::TrackNotFound(track_id));
        }

        let body = response.text().await.map_err(transport_error)?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Err(Error::TrackNotFound(track_id));
        }

        let track: Track = serde_json::from_str(body).map_err(|e| {
            Error::CatalogUnavailable(format!("track {} decode failed: {}", track_id, e))
        })?;

        tracing::debug!(
            track_id,
            title = %track.title,
            transcodings = track.transcodings().len(),
            "Retrieved track metadata"
        );

        Ok(track)
    }

    /// Follow a transcoding's resolve URL to the final stream URL
    pub async fn resolve_transcoding(&self, transcoding: &Transcoding) -> Result<String> {
        let response = self
            .http_client
            .get(&transcoding.url)
            .query(&[("client_id", self.client_id.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogUnavailable(format!(
                "transcoding resolve returned HTTP {}",
                status.as_u16()
            )));
        }

        let location: TranscodingLocation = response.json().await.map_err(|e| {
            Error::CatalogUnavailable(format!("transcoding decode failed: {}", e.without_url()))
        })?;

        Ok(location.url)
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    Error::CatalogUnavailable(err.without_url().to_string())
}
