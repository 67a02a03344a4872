//! Playback session state
//!
//! [`PlaybackSession`] is the state owned by the playback controller: the queue,
//! the now-playing selection, transport state, position, volume and mute. All
//! methods are synchronous and side-effect free; the controller pairs them with
//! output calls and event emission.

use scp_common::time::{format_time, format_time_opt};
use scp_common::{Track, TransportState};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Skip direction for next/previous navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipDirection {
    Next,
    Prev,
}

/// Queue index reached by one skip, wrapping at both ends
///
/// `len` must be non-zero.
pub fn wrap_index(current: usize, len: usize, direction: SkipDirection) -> usize {
    match direction {
        SkipDirection::Next => (current + 1) % len,
        SkipDirection::Prev => (current + len - 1) % len,
    }
}

/// Clamp a seek target into `[0, duration]`
///
/// Unknown duration clamps to 0. NaN maps to 0, +inf to the duration.
pub fn clamp_position(target: f64, duration: Option<f64>) -> f64 {
    let upper = duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0);
    if target.is_nan() {
        return 0.0;
    }
    target.clamp(0.0, upper)
}

/// Selected track and its place in the current queue
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    /// `None` once a newer search dropped the track from the queue
    pub queue_index: Option<usize>,
}

/// Mutable state of one listening session
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    queue: Vec<Track>,
    now_playing: Option<NowPlaying>,
    transport: TransportState,
    position_seconds: f64,
    duration_seconds: Option<f64>,
    volume: f32,
    muted: bool,
    last_error: Option<String>,
    has_source: bool,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            now_playing: None,
            transport: TransportState::Idle,
            position_seconds: 0.0,
            duration_seconds: None,
            volume: 1.0,
            muted: false,
            last_error: None,
            has_source: false,
        }
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.now_playing.as_ref().and_then(|np| np.queue_index)
    }

    pub fn current_track_id(&self) -> Option<u64> {
        self.now_playing.as_ref().map(|np| np.track.id)
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn position(&self) -> f64 {
        self.position_seconds
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration_seconds
    }

    /// Stored volume, kept while muted
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Volume actually applied to the output
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Whether a display should render the muted indicator
    pub fn displays_muted(&self) -> bool {
        self.muted || self.volume == 0.0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the output has been handed a source during this session
    pub fn has_source(&self) -> bool {
        self.has_source
    }

    pub fn index_of(&self, track_id: u64) -> Option<usize> {
        self.queue.iter().position(|t| t.id == track_id)
    }

    /// Replace the queue with a new result set
    ///
    /// While a track is playing, paused or resolving its selection survives and
    /// the index is re-derived by track id (cleared when the track is absent).
    /// Otherwise the session returns to `Idle`. Returns true when it was reset.
    pub fn replace_queue(&mut self, tracks: Vec<Track>) -> bool {
        self.queue = tracks;
        let keeps_selection =
            self.transport.is_active() || self.transport == TransportState::Resolving;
        if !keeps_selection {
            let was_idle = self.transport == TransportState::Idle;
            self.reset();
            return !was_idle;
        }
        if let Some(np) = self.now_playing.as_mut() {
            np.queue_index = self.queue.iter().position(|t| t.id == np.track.id);
        }
        false
    }

    /// Select the track at `index` and enter `Resolving`
    ///
    /// Returns `None` (and changes nothing) when the index is out of range.
    /// Position and duration keep describing the previous source until the new
    /// one starts.
    pub fn select(&mut self, index: usize) -> Option<Track> {
        let track = self.queue.get(index)?.clone();
        self.now_playing = Some(NowPlaying {
            track: track.clone(),
            queue_index: Some(index),
        });
        self.transport = TransportState::Resolving;
        self.last_error = None;
        Some(track)
    }

    /// New source loaded and playing from the start
    pub fn mark_playing(&mut self, duration_hint: Option<f64>) {
        self.transport = TransportState::Playing;
        self.position_seconds = 0.0;
        self.duration_seconds = duration_hint.filter(|d| d.is_finite() && *d > 0.0);
        self.has_source = true;
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: String) {
        self.transport = TransportState::Error;
        self.last_error = Some(message);
    }

    pub fn mark_ended(&mut self) {
        self.transport = TransportState::Ended;
        if let Some(duration) = self.duration_seconds {
            self.position_seconds = duration;
        }
    }

    /// Flip between `Playing` and `Paused`
    pub fn toggle_play_pause(&mut self) -> Result<TransportState> {
        let next = match self.transport {
            TransportState::Playing => TransportState::Paused,
            TransportState::Paused => TransportState::Playing,
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot toggle playback while {}",
                    other
                )))
            }
        };
        self.transport = next;
        Ok(next)
    }

    /// Move the position, returning the clamped value
    pub fn seek(&mut self, target_seconds: f64) -> Result<f64> {
        if !self.transport.is_active() {
            return Err(Error::InvalidState(format!(
                "cannot seek while {}",
                self.transport
            )));
        }
        self.position_seconds = clamp_position(target_seconds, self.duration_seconds);
        Ok(self.position_seconds)
    }

    /// Position report from the output; ignored unless a source is active
    pub fn update_position(&mut self, seconds: f64) {
        if !self.transport.is_active() || !seconds.is_finite() {
            return;
        }
        self.position_seconds = match self.duration_seconds {
            Some(duration) => seconds.clamp(0.0, duration),
            None => seconds.max(0.0),
        };
    }

    /// Duration report from the output
    pub fn update_duration(&mut self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        self.duration_seconds = Some(seconds);
        self.position_seconds = self.position_seconds.min(seconds);
    }

    /// Store a new volume, returning the clamped value
    ///
    /// Mute state is left alone.
    pub fn set_volume(&mut self, volume: f32) -> Result<f32> {
        if volume.is_nan() {
            return Err(Error::InvalidInput("volume must be a number".to_string()));
        }
        self.volume = volume.clamp(0.0, 1.0);
        Ok(self.volume)
    }

    /// Flip mute without touching the stored volume
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Queue index a skip would play, if any
    pub fn skip_target(&self, direction: SkipDirection) -> Option<usize> {
        if self.queue.is_empty() {
            return None;
        }
        let current = self.current_index()?;
        Some(wrap_index(current, self.queue.len(), direction))
    }

    /// Drop the selection and return to `Idle`
    ///
    /// Queue, volume and mute survive.
    pub fn reset(&mut self) {
        self.now_playing = None;
        self.transport = TransportState::Idle;
        self.position_seconds = 0.0;
        self.duration_seconds = None;
        self.last_error = None;
        self.has_source = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            queue: self
                .queue
                .iter()
                .map(|t| QueueEntry {
                    track_id: t.id,
                    title: t.title.clone(),
                    username: t.user.username.clone(),
                    artwork_url: t.display_artwork().map(str::to_string),
                })
                .collect(),
            current_index: self.current_index(),
            track_id: self.current_track_id(),
            title: self.now_playing.as_ref().map(|np| np.track.title.clone()),
            transport: self.transport,
            position_seconds: self.position_seconds,
            duration_seconds: self.duration_seconds,
            position_display: format_time(self.position_seconds),
            duration_display: format_time_opt(self.duration_seconds),
            volume: self.volume,
            muted: self.muted,
            displays_muted: self.displays_muted(),
            last_error: self.last_error.clone(),
        }
    }
}

/// One queue row for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub track_id: u64,
    pub title: String,
    pub username: String,
    pub artwork_url: Option<String>,
}

/// Read-only view of the session for display layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub queue: Vec<QueueEntry>,
    pub current_index: Option<usize>,
    pub track_id: Option<u64>,
    pub title: Option<String>,
    pub transport: TransportState,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    /// `M:SS`
    pub position_display: String,
    /// `M:SS`
    pub duration_display: String,
    pub volume: f32,
    pub muted: bool,
    pub displays_muted: bool,
    pub last_error: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        PlaybackSession::new().snapshot()
    }
}
