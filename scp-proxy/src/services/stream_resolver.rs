//! Stream resolution
//!
//! Turns a track id into a time-limited playable URL:
//! 1. Fetch track metadata from the catalog
//! 2. Pick the first progressive `audio/mpeg` transcoding, in catalog order
//! 3. Follow its resolve URL to the final stream URL
//!
//! Results are never cached. Stream URLs expire, so each play request resolves
//! afresh.

use crate::services::CatalogClient;
use scp_common::catalog::{StreamHandle, Transcoding};
use scp_common::{Error, Result};
use std::sync::Arc;

/// First progressive MP3 transcoding, if any
///
/// Deterministic: for the same list the same descriptor is always chosen. Adaptive
/// (hls) renditions are never selected.
pub fn select_transcoding(transcodings: &[Transcoding]) -> Option<&Transcoding> {
    transcodings.iter().find(|t| t.is_progressive_mpeg())
}

/// Resolves track ids to playable stream handles
pub struct StreamResolver {
    catalog: Arc<CatalogClient>,
}

impl StreamResolver {
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Resolve a track to a playable URL
    ///
    /// Errors: `TrackNotFound` / `CatalogUnavailable` from the metadata fetch,
    /// `NoMediaAvailable` when the track has no transcodings, `StreamNotFound` when
    /// none of them is progressive MP3.
    pub async fn resolve(&self, track_id: u64) -> Result<StreamHandle> {
        let track = self.catalog.fetch_track(track_id).await?;

        let transcodings = track.transcodings();
        if transcodings.is_empty() {
            tracing::warn!(track_id, "Track has no transcodings");
            return Err(Error::NoMediaAvailable(track_id));
        }

        let chosen = select_transcoding(transcodings).ok_or_else(|| {
            tracing::warn!(
                track_id,
                available = transcodings.len(),
                "No progressive audio/mpeg transcoding"
            );
            Error::StreamNotFound(track_id)
        })?;

        let url = self.catalog.resolve_transcoding(chosen).await?;

        tracing::info!(track_id, title = %track.title, "Stream resolved");

        Ok(StreamHandle { track_id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_first_progressive_mpeg() {
        let transcodings = vec![
            Transcoding::new("hls", "audio/mpeg", "https://api/hls"),
            Transcoding::new("progressive", "audio/ogg", "https://api/ogg"),
            Transcoding::new("progressive", "audio/mpeg", "https://api/first"),
            Transcoding::new("progressive", "audio/mpeg", "https://api/second"),
        ];

        let chosen = select_transcoding(&transcodings).unwrap();
        assert_eq!(chosen.url, "https://api/first");

        // Same snapshot, same answer
        let again = select_transcoding(&transcodings).unwrap();
        assert_eq!(again, chosen);
    }

    #[test]
    fn test_hls_only_has_no_selection() {
        let transcodings = vec![
            Transcoding::new("hls", "audio/mpeg", "https://api/hls"),
            Transcoding::new("hls", "audio/ogg; codecs=\"opus\"", "https://api/opus"),
        ];
        assert!(select_transcoding(&transcodings).is_none());
    }

    #[test]
    fn test_mime_type_must_match_exactly() {
        let transcodings = vec![Transcoding::new("progressive", "audio/mpeg3", "https://api/x")];
        assert!(select_transcoding(&transcodings).is_none());
        assert!(select_transcoding(&[]).is_none());
    }
}
