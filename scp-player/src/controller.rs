//! Playback controller
//!
//! One task owns the [`PlaybackSession`] and the [`AudioOutput`]. Searches and
//! stream resolutions run as spawned tasks and report back over a completion
//! channel; each completion carries the request id it was issued under and is
//! applied only if it is still the newest request of its kind. Late results are
//! dropped, so a slow resolve for track A can never start audio after the
//! listener moved on to track B.
//!
//! [`PlaybackController::run`] drives the loop from a command channel; tests call
//! the synchronous operations directly and use [`PlaybackController::settle`] to
//! apply completions one at a time.

use chrono::Utc;
use scp_common::{PlayerEvent, StreamHandle, Track, TransportState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::output::{AudioOutput, OutputEvent, OutputEventKind};
use crate::session::{PlaybackSession, SessionSnapshot, SkipDirection};
use crate::sink::PlayerEventSink;
use crate::source::TrackSource;

/// Capacity of the command channel behind [`PlayerHandle`]
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Commands accepted by a running controller
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Search(String),
    /// Play the queue entry at this index
    Play(usize),
    TogglePlayPause,
    Seek(f64),
    SetVolume(f32),
    ToggleMute,
    Skip(SkipDirection),
    /// Drop the current selection and go idle
    Stop,
    Shutdown,
}

/// Identity of an in-flight resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTicket {
    pub request_id: u64,
    pub track_id: u64,
    pub queue_index: usize,
}

/// Result of a spawned network call
#[derive(Debug)]
pub enum Completion {
    Search {
        request_id: u64,
        query: String,
        result: scp_common::Result<Vec<Track>>,
    },
    Resolve {
        ticket: ResolveTicket,
        result: scp_common::Result<StreamHandle>,
    },
}

pub struct PlaybackController {
    session: PlaybackSession,
    source: Arc<dyn TrackSource>,
    output: Box<dyn AudioOutput>,
    sink: Arc<dyn PlayerEventSink>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    next_request_id: u64,
    latest_search: Option<u64>,
    pending_resolve: Option<ResolveTicket>,
    load_id: u64,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl PlaybackController {
    pub fn new(
        source: Arc<dyn TrackSource>,
        output: Box<dyn AudioOutput>,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Self {
        let session = PlaybackSession::new();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(session.snapshot());

        Self {
            session,
            source,
            output,
            sink,
            completion_tx,
            completion_rx,
            next_request_id: 0,
            latest_search: None,
            pending_resolve: None,
            load_id: 0,
            snapshot_tx,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Snapshot stream, updated after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn pending_resolve(&self) -> Option<ResolveTicket> {
        self.pending_resolve
    }

    /// Issue a search; the newest search wins the queue
    ///
    /// Returns false for a blank query, which issues nothing.
    pub fn search(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            debug!("Ignoring blank search");
            return false;
        }

        let request_id = self.next_request_id();
        self.latest_search = Some(request_id);
        self.emit(PlayerEvent::SearchStarted {
            query: query.to_string(),
            timestamp: Utc::now(),
        });
        info!(query = %query, request_id, "Search issued");

        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            let result = source.search(&query).await;
            let _ = tx.send(Completion::Search {
                request_id,
                query,
                result,
            });
        });
        true
    }

    /// Select the queue entry at `index` and start resolving its stream
    ///
    /// An index outside the queue is a no-op. Audio already playing keeps playing
    /// until the new stream is ready.
    pub fn play_at(&mut self, index: usize) {
        let old_state = self.session.transport();
        let Some(track) = self.session.select(index) else {
            debug!(index, queue_len = self.session.queue().len(), "Play ignored: no such queue entry");
            return;
        };

        let ticket = ResolveTicket {
            request_id: self.next_request_id(),
            track_id: track.id,
            queue_index: index,
        };
        self.pending_resolve = Some(ticket);
        info!(track_id = track.id, index, request_id = ticket.request_id, "Resolving track");

        self.emit(PlayerEvent::TrackSelected {
            track_id: track.id,
            queue_index: index,
            timestamp: Utc::now(),
        });
        self.emit_state_change(old_state);
        self.publish_snapshot();

        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = source.resolve(ticket.track_id).await;
            let _ = tx.send(Completion::Resolve { ticket, result });
        });
    }

    /// Play a track from the current queue
    pub fn play(&mut self, track: &Track) -> Result<()> {
        let index = self.session.index_of(track.id).ok_or_else(|| {
            Error::InvalidInput(format!("track {} is not in the queue", track.id))
        })?;
        self.play_at(index);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        let old_state = self.session.transport();
        let new_state = self.session.toggle_play_pause()?;

        match new_state {
            TransportState::Playing => {
                if let Err(e) = self.output.play() {
                    self.fail_playback(e);
                    return Ok(());
                }
            }
            _ => self.output.pause(),
        }

        self.emit_state_change(old_state);
        self.publish_snapshot();
        Ok(())
    }

    /// Seek within the current source; the transport state is kept
    pub fn seek(&mut self, position_seconds: f64) -> Result<()> {
        let position = self.session.seek(position_seconds)?;
        if self.session.duration().is_none() && position_seconds > 0.0 {
            debug!(
                requested = position_seconds,
                "Seek clamped to start: track duration unknown"
            );
        }
        self.output.seek(position);
        self.emit(PlayerEvent::Seeked {
            position_seconds: position,
            timestamp: Utc::now(),
        });
        self.publish_snapshot();
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        let volume = self.session.set_volume(volume)?;
        self.output.set_volume(self.session.effective_volume());
        self.emit(PlayerEvent::VolumeChanged {
            volume,
            timestamp: Utc::now(),
        });
        self.publish_snapshot();
        Ok(())
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.session.toggle_mute();
        self.output.set_volume(self.session.effective_volume());
        self.emit(PlayerEvent::MuteChanged {
            muted,
            timestamp: Utc::now(),
        });
        self.publish_snapshot();
    }

    /// Move to the neighbouring queue entry, wrapping at both ends
    ///
    /// No-op when the queue is empty or the current track is not in it.
    pub fn skip(&mut self, direction: SkipDirection) {
        match self.session.skip_target(direction) {
            Some(index) => self.play_at(index),
            None => debug!(?direction, "Skip ignored: no current queue position"),
        }
    }

    /// Stop output and return to idle; the queue is kept
    pub fn stop(&mut self) {
        let old_state = self.session.transport();
        self.output.stop();
        self.pending_resolve = None;
        self.session.reset();
        self.emit_state_change(old_state);
        self.publish_snapshot();
    }

    /// Apply a finished search or resolve, discarding stale ones
    pub fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Search {
                request_id,
                query,
                result,
            } => self.apply_search(request_id, query, result),
            Completion::Resolve { ticket, result } => self.apply_resolve(ticket, result),
        }
    }

    fn apply_search(
        &mut self,
        request_id: u64,
        query: String,
        result: scp_common::Result<Vec<Track>>,
    ) {
        if self.latest_search != Some(request_id) {
            debug!(query = %query, request_id, "Discarding stale search result");
            return;
        }
        self.latest_search = None;

        match result {
            Ok(tracks) => {
                let count = tracks.len();
                let old_state = self.session.transport();
                let had_source = self.session.has_source();
                if self.session.replace_queue(tracks) {
                    if had_source {
                        self.output.stop();
                        self.load_id += 1;
                    }
                    self.emit_state_change(old_state);
                }
                info!(query = %query, count, "Queue replaced");
                self.emit(PlayerEvent::SearchSucceeded {
                    query,
                    count,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed; keeping previous queue");
                self.emit(PlayerEvent::SearchFailed {
                    query,
                    message: e.user_message(),
                    timestamp: Utc::now(),
                });
            }
        }
        self.publish_snapshot();
    }

    fn apply_resolve(&mut self, ticket: ResolveTicket, result: scp_common::Result<StreamHandle>) {
        let current = self.pending_resolve == Some(ticket)
            && self.session.current_track_id() == Some(ticket.track_id);
        if !current {
            debug!(
                track_id = ticket.track_id,
                request_id = ticket.request_id,
                "Discarding stale stream resolution"
            );
            return;
        }
        self.pending_resolve = None;

        match result {
            Ok(handle) => self.start_playback(handle),
            Err(e) => {
                warn!(track_id = ticket.track_id, error = %e, "Stream resolution failed");
                self.fail_playback(e);
            }
        }
    }

    fn start_playback(&mut self, handle: StreamHandle) {
        let old_state = self.session.transport();
        let (title, duration_hint) = match self.session.now_playing() {
            Some(np) => (np.track.title.clone(), np.track.duration_seconds()),
            None => return,
        };

        self.load_id += 1;
        if let Err(e) = self.start_output(&handle, duration_hint) {
            self.fail_playback(e);
            return;
        }

        self.session.mark_playing(duration_hint);
        info!(track_id = handle.track_id, title = %title, "Playback started");
        self.emit(PlayerEvent::PlaybackStarted {
            track_id: handle.track_id,
            title,
            timestamp: Utc::now(),
        });
        self.emit_state_change(old_state);
        self.publish_snapshot();
    }

    fn start_output(
        &mut self,
        handle: &StreamHandle,
        duration_hint: Option<f64>,
    ) -> scp_common::Result<()> {
        self.output.load(handle, self.load_id, duration_hint)?;
        self.output.set_volume(self.session.effective_volume());
        self.output.play()
    }

    /// Enter `Error` with a listener-facing message; no retry
    fn fail_playback(&mut self, error: scp_common::Error) {
        let old_state = self.session.transport();
        let message = error.playback_message();
        self.session.mark_error(message.clone());
        self.emit(PlayerEvent::PlaybackFault {
            track_id: self.session.current_track_id(),
            message,
            timestamp: Utc::now(),
        });
        self.emit_state_change(old_state);
        self.publish_snapshot();
    }

    /// Apply a progress report from the output
    pub fn handle_output_event(&mut self, event: OutputEvent) {
        if event.load_id != self.load_id {
            debug!(load_id = event.load_id, current = self.load_id, "Ignoring output event from replaced source");
            return;
        }

        match event.kind {
            OutputEventKind::TimeUpdate(seconds) => {
                self.session.update_position(seconds);
                self.publish_snapshot();
            }
            OutputEventKind::DurationChanged(seconds) => {
                self.session.update_duration(seconds);
                self.publish_snapshot();
            }
            OutputEventKind::Ended => {
                if !self.session.transport().is_active() {
                    return;
                }
                let old_state = self.session.transport();
                self.session.mark_ended();
                self.emit_state_change(old_state);
                self.publish_snapshot();
                self.skip(SkipDirection::Next);
            }
            OutputEventKind::Fault(message) => {
                warn!(track_id = ?self.session.current_track_id(), error = %message, "Audio output fault");
                self.fail_playback(scp_common::Error::AudioOutputFault(message));
            }
        }
    }

    /// Execute one command; `Ok(false)` means shut down
    pub fn handle_command(&mut self, command: PlayerCommand) -> Result<bool> {
        match command {
            PlayerCommand::Search(query) => {
                self.search(&query);
            }
            PlayerCommand::Play(index) => self.play_at(index),
            PlayerCommand::TogglePlayPause => self.toggle_play_pause()?,
            PlayerCommand::Seek(position) => self.seek(position)?,
            PlayerCommand::SetVolume(volume) => self.set_volume(volume)?,
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::Skip(direction) => self.skip(direction),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    /// Wait for the next search or resolve to finish and apply it
    pub async fn settle(&mut self) {
        if let Some(completion) = self.completion_rx.recv().await {
            self.apply_completion(completion);
        }
    }

    /// Controller loop: commands, network completions and output events
    ///
    /// Returns when a `Shutdown` command arrives or every [`PlayerHandle`] is gone.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<PlayerCommand>,
        mut output_events: mpsc::UnboundedReceiver<OutputEvent>,
    ) {
        info!("Playback controller started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle_command(command) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => warn!(error = %e, "Command rejected"),
                    }
                }
                Some(completion) = self.completion_rx.recv() => {
                    self.apply_completion(completion);
                }
                Some(event) = output_events.recv() => {
                    self.handle_output_event(event);
                }
            }
        }
        self.output.stop();
        info!("Playback controller stopped");
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    fn emit(&self, event: PlayerEvent) {
        self.sink.publish(event);
    }

    fn emit_state_change(&self, old_state: TransportState) {
        let new_state = self.session.transport();
        if old_state != new_state {
            debug!(%old_state, %new_state, "Transport state changed");
            self.emit(PlayerEvent::StateChanged {
                old_state,
                new_state,
                timestamp: Utc::now(),
            });
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.session.snapshot());
    }
}

/// Cloneable handle to a running controller
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl PlayerHandle {
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::Stopped)
    }

    /// Latest published session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawn the controller loop on the current runtime
pub fn spawn(
    controller: PlaybackController,
    output_events: mpsc::UnboundedReceiver<OutputEvent>,
) -> (PlayerHandle, JoinHandle<()>) {
    let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let handle = PlayerHandle {
        commands,
        snapshots: controller.subscribe(),
    };
    let task = tokio::spawn(controller.run(command_rx, output_events));
    (handle, task)
}
