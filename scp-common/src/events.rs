//! Event types for the scp event system
//!
//! Provides the transport state enum, the player event enum, and the EventBus used
//! to fan player events out to host integrations (display, notifications, logging).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport state of the playback controller
///
/// Transitions: `Idle → Resolving → Playing ⇄ Paused`, `Playing/Paused → Ended`,
/// any state `→ Error` on fault, `Error/Ended → Resolving` on the next load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Nothing selected
    #[default]
    Idle,
    /// Stream URL being resolved for the selected track
    Resolving,
    Playing,
    Paused,
    /// Output reached the end of the current track
    Ended,
    /// Resolution or output fault; waits for the next play request
    Error,
}

impl TransportState {
    /// States in which the output holds a loaded, controllable source
    pub fn is_active(&self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Paused)
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Idle => write!(f, "idle"),
            TransportState::Resolving => write!(f, "resolving"),
            TransportState::Playing => write!(f, "playing"),
            TransportState::Paused => write!(f, "paused"),
            TransportState::Ended => write!(f, "ended"),
            TransportState::Error => write!(f, "error"),
        }
    }
}

/// Player events
///
/// Emitted by the playback controller after each state change. Host integrations
/// (haptics, alerts, progress indicators) subscribe; none of them is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Search request issued to the catalog
    SearchStarted {
        query: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Search completed and replaced the queue
    SearchSucceeded {
        query: String,
        /// Number of tracks in the new queue
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Search failed; the previous queue is kept
    SearchFailed {
        query: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was picked and its stream is being resolved
    TrackSelected {
        track_id: u64,
        queue_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stream resolved and output started
    PlaybackStarted {
        track_id: u64,
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Resolution or output fault
    PlaybackFault {
        track_id: Option<u64>,
        /// Listener-facing message
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport state changed
    StateChanged {
        old_state: TransportState,
        new_state: TransportState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stored volume changed (0.0-1.0)
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Mute toggled
    MuteChanged {
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Position moved by a seek
    Seeked {
        position_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::SearchStarted { .. } => "SearchStarted",
            PlayerEvent::SearchSucceeded { .. } => "SearchSucceeded",
            PlayerEvent::SearchFailed { .. } => "SearchFailed",
            PlayerEvent::TrackSelected { .. } => "TrackSelected",
            PlayerEvent::PlaybackStarted { .. } => "PlaybackStarted",
            PlayerEvent::PlaybackFault { .. } => "PlaybackFault",
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::VolumeChanged { .. } => "VolumeChanged",
            PlayerEvent::MuteChanged { .. } => "MuteChanged",
            PlayerEvent::Seeked { .. } => "Seeked",
        }
    }
}

/// One-to-many broadcaster for player events
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lose the oldest
/// events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use scp_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
