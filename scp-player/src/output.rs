//! Audio output seam
//!
//! The controller owns exactly one [`AudioOutput`]. Outputs report progress back
//! through an unbounded channel of [`OutputEvent`]s, each tagged with the load id
//! the controller passed to [`AudioOutput::load`], so reports from a replaced
//! source can be told apart from the current one.
//!
//! [`ClockOutput`] is the headless output used by the `scp-player` binary: it
//! advances a position clock in real time and ends at the catalog duration
//! without fetching or decoding audio.

use scp_common::{Error, Result, StreamHandle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Progress report from an output
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEvent {
    /// Load the report belongs to
    pub load_id: u64,
    pub kind: OutputEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputEventKind {
    /// Current position in seconds
    TimeUpdate(f64),
    /// Source duration became known, in seconds
    DurationChanged(f64),
    /// Source played to the end
    Ended,
    /// Decode or device failure
    Fault(String),
}

/// Playback sink controlled by the playback controller
pub trait AudioOutput: Send {
    /// Replace the current source; playback starts on [`AudioOutput::play`]
    fn load(&mut self, stream: &StreamHandle, load_id: u64, duration_hint: Option<f64>)
        -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Position in seconds, already clamped by the caller
    fn seek(&mut self, position_seconds: f64);

    /// Effective volume (0.0 when muted)
    fn set_volume(&mut self, volume: f32);

    /// Drop the current source
    fn stop(&mut self);
}

#[derive(Debug, Default)]
struct ClockState {
    load_id: u64,
    loaded: bool,
    playing: bool,
    position: f64,
    duration: Option<f64>,
    volume: f32,
}

/// Headless output that only keeps time
pub struct ClockOutput {
    state: Arc<Mutex<ClockState>>,
    events: mpsc::UnboundedSender<OutputEvent>,
    tick: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl ClockOutput {
    /// New output and the receiver for its events
    pub fn new(tick: Duration) -> (Self, mpsc::UnboundedReceiver<OutputEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let output = Self {
            state: Arc::new(Mutex::new(ClockState {
                volume: 1.0,
                ..ClockState::default()
            })),
            events,
            tick,
            ticker: None,
        };
        (output, rx)
    }

    /// Current clock position in seconds
    pub fn position(&self) -> f64 {
        lock(&self.state).position
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn abort_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn spawn_ticker(&mut self) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let tick = self.tick;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;

                let (load_id, kinds) = {
                    let mut state = lock(&state);
                    if !state.playing {
                        continue;
                    }
                    state.position += tick.as_secs_f64();
                    let mut kinds = Vec::with_capacity(2);
                    match state.duration {
                        Some(duration) if state.position >= duration => {
                            state.position = duration;
                            state.playing = false;
                            kinds.push(OutputEventKind::TimeUpdate(duration));
                            kinds.push(OutputEventKind::Ended);
                        }
                        _ => kinds.push(OutputEventKind::TimeUpdate(state.position)),
                    }
                    (state.load_id, kinds)
                };

                let ended = kinds.contains(&OutputEventKind::Ended);
                for kind in kinds {
                    if events.send(OutputEvent { load_id, kind }).is_err() {
                        return;
                    }
                }
                if ended {
                    return;
                }
            }
        }));
    }
}

impl AudioOutput for ClockOutput {
    fn load(
        &mut self,
        stream: &StreamHandle,
        load_id: u64,
        duration_hint: Option<f64>,
    ) -> Result<()> {
        self.abort_ticker();
        {
            let mut state = lock(&self.state);
            state.load_id = load_id;
            state.loaded = true;
            state.playing = false;
            state.position = 0.0;
            state.duration = duration_hint;
        }
        info!(track_id = stream.track_id, load_id, "Clock output loaded stream");

        if let Some(duration) = duration_hint {
            let _ = self.events.send(OutputEvent {
                load_id,
                kind: OutputEventKind::DurationChanged(duration),
            });
        }
        self.spawn_ticker();
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.loaded {
            return Err(Error::AudioOutputFault("no source loaded".to_string()));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        lock(&self.state).playing = false;
    }

    fn seek(&mut self, position_seconds: f64) {
        let mut state = lock(&self.state);
        state.position = position_seconds.max(0.0);
        debug!(position = state.position, "Clock output seeked");
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.state).volume = volume;
    }

    fn stop(&mut self) {
        self.abort_ticker();
        let mut state = lock(&self.state);
        state.loaded = false;
        state.playing = false;
        state.position = 0.0;
        state.duration = None;
    }
}

impl Drop for ClockOutput {
    fn drop(&mut self) {
        self.abort_ticker();
    }
}

/// Lock the shared clock state; a poisoned lock still holds usable data
fn lock(state: &Mutex<ClockState>) -> MutexGuard<'_, ClockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
