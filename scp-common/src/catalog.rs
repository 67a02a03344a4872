//! Catalog entities and proxy wire types
//!
//! Tracks are decoded from the external catalog's JSON. Fields the engine does not
//! rely upon are kept in `extra` so the proxy can hand the catalog envelope back to
//! the front end unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MIME type of the only rendition the stream resolver accepts
pub const MPEG_MIME_TYPE: &str = "audio/mpeg";

/// Catalog track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog-unique track id
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Cover art, frequently null in catalog responses
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Full duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Uploading account
    pub user: TrackOwner,
    /// Available renditions (absent in some search payloads)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    /// Remaining catalog fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Account that uploaded a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackOwner {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Media block of a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub transcodings: Vec<Transcoding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One encoded rendition of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcoding {
    /// Resolve URL; needs the service client id appended before it yields a stream
    pub url: String,
    pub format: TranscodingFormat,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodingFormat {
    pub protocol: StreamProtocol,
    pub mime_type: String,
}

/// Delivery protocol of a transcoding
///
/// Unknown protocols are kept verbatim so they survive pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StreamProtocol {
    /// Single directly fetchable file
    Progressive,
    /// Segmented adaptive stream (not supported for playback)
    Hls,
    Other(String),
}

impl From<String> for StreamProtocol {
    fn from(value: String) -> Self {
        match value.as_str() {
            "progressive" => StreamProtocol::Progressive,
            "hls" => StreamProtocol::Hls,
            _ => StreamProtocol::Other(value),
        }
    }
}

impl From<StreamProtocol> for String {
    fn from(value: StreamProtocol) -> Self {
        match value {
            StreamProtocol::Progressive => "progressive".to_string(),
            StreamProtocol::Hls => "hls".to_string(),
            StreamProtocol::Other(other) => other,
        }
    }
}

impl Transcoding {
    pub fn new(protocol: &str, mime_type: &str, url: &str) -> Self {
        Self {
            url: url.to_string(),
            format: TranscodingFormat {
                protocol: StreamProtocol::from(protocol.to_string()),
                mime_type: mime_type.to_string(),
            },
            extra: Map::new(),
        }
    }

    /// True for a progressive MP3 rendition
    pub fn is_progressive_mpeg(&self) -> bool {
        self.format.protocol == StreamProtocol::Progressive
            && self.format.mime_type == MPEG_MIME_TYPE
    }
}

impl Track {
    /// Minimal track, mostly useful for tests and fixtures
    pub fn new(id: u64, title: &str, username: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            artwork_url: None,
            duration: None,
            user: TrackOwner {
                username: username.to_string(),
                avatar_url: None,
                extra: Map::new(),
            },
            media: None,
            extra: Map::new(),
        }
    }

    pub fn with_transcodings(mut self, transcodings: Vec<Transcoding>) -> Self {
        self.media = Some(Media {
            transcodings,
            extra: Map::new(),
        });
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    /// Transcodings in catalog order; empty when the track carries no media block
    pub fn transcodings(&self) -> &[Transcoding] {
        self.media
            .as_ref()
            .map(|m| m.transcodings.as_slice())
            .unwrap_or(&[])
    }

    /// Artwork to display: track art, falling back to the owner's avatar
    ///
    /// `None` when both are missing, which is a data-quality issue rather than an error.
    pub fn display_artwork(&self) -> Option<&str> {
        non_empty(self.artwork_url.as_deref()).or_else(|| non_empty(self.user.avatar_url.as_deref()))
    }

    /// Catalog duration in seconds, if known
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration
            .filter(|ms| *ms > 0)
            .map(|ms| ms as f64 / 1000.0)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Search results envelope as returned by the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub collection: Vec<Track>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body returned by the catalog when a transcoding resolve URL is followed
#[derive(Debug, Clone, Deserialize)]
pub struct TranscodingLocation {
    pub url: String,
}

/// Successful `/api/stream` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponse {
    #[serde(rename = "streamUrl")]
    pub stream_url: String,
}

/// Error body used by every failing proxy response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Directly playable, time-limited URL for one track
///
/// Never cached: every play request resolves a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub track_id: u64,
    pub url: String,
}
