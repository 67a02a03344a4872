//! Host integration sink for player events

use scp_common::{EventBus, PlayerEvent};

/// Receives every event the playback controller emits
///
/// Hosts hang haptics, alerts or progress indicators off this; the controller
/// never depends on what a sink does with an event.
pub trait PlayerEventSink: Send + Sync {
    fn publish(&self, event: PlayerEvent);
}

impl PlayerEventSink for EventBus {
    fn publish(&self, event: PlayerEvent) {
        self.emit_lossy(event);
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PlayerEventSink for NoopSink {
    fn publish(&self, _event: PlayerEvent) {}
}
