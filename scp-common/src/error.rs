//! Common error types for scp
//!
//! The first five variants form the failure taxonomy shared by the proxy and the
//! player. They travel across the HTTP boundary as status code + message and are
//! rebuilt on the player side, so both ends agree on what went wrong.

use thiserror::Error;

/// Common result type for scp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message the proxy sends for a track without progressive MP3 rendition
pub const STREAM_NOT_FOUND_MESSAGE: &str = "Stream not found";
/// Message the proxy sends for a track without any transcodings
pub const NO_MEDIA_MESSAGE: &str = "No media available";
/// Message the proxy sends when the catalog has no such track
pub const TRACK_NOT_FOUND_MESSAGE: &str = "Track not found";

/// Common error types across scp crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Network or transport fault talking to the catalog (or to the proxy)
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Valid id, but the catalog returned no metadata for it
    #[error("Track not found: {0}")]
    TrackNotFound(u64),

    /// Track exposes zero transcodings
    #[error("No media available for track {0}")]
    NoMediaAvailable(u64),

    /// Transcodings present, none of them progressive MP3
    #[error("Stream not found for track {0}")]
    StreamNotFound(u64),

    /// Local playback failure (decode, device)
    #[error("Audio output fault: {0}")]
    AudioOutputFault(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Short message suitable for showing to a listener
    pub fn user_message(&self) -> String {
        match self {
            Error::CatalogUnavailable(_) => "Search failed. Check your connection.".to_string(),
            Error::TrackNotFound(_) => "This track is no longer available.".to_string(),
            Error::NoMediaAvailable(_) => "This track has no playable media.".to_string(),
            Error::StreamNotFound(_) => "No compatible stream for this track.".to_string(),
            Error::AudioOutputFault(_) => "Playback error for this track.".to_string(),
            Error::Config(msg) | Error::InvalidInput(msg) => msg.clone(),
        }
    }

    /// Message for a fault hit while loading a track to play
    ///
    /// Same as [`Error::user_message`] except that an unreachable catalog is
    /// reported against the track rather than as a failed search.
    pub fn playback_message(&self) -> String {
        match self {
            Error::CatalogUnavailable(_) => {
                "Could not load this track. Check your connection.".to_string()
            }
            other => other.user_message(),
        }
    }
}
