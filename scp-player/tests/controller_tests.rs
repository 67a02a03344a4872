//! Playback controller behaviour tests
//!
//! The controller is driven directly with a scripted track source, an output that
//! records every call, and a sink that records every event. Resolves and searches
//! can be held back behind a gate to reproduce out-of-order completions.

use async_trait::async_trait;
use scp_common::{Error as CatalogError, PlayerEvent, StreamHandle, Track, Transcoding, TransportState};
use scp_player::controller::{self, PlaybackController, PlayerCommand};
use scp_player::output::{AudioOutput, OutputEvent, OutputEventKind};
use scp_player::session::SkipDirection;
use scp_player::sink::PlayerEventSink;
use scp_player::source::TrackSource;
use scp_player::Error;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

// ------------------------------------------------------------------
// Test doubles
// ------------------------------------------------------------------

#[derive(Default)]
struct FakeSource {
    searches: Mutex<HashMap<String, scp_common::Result<Vec<Track>>>>,
    streams: Mutex<HashMap<u64, scp_common::Result<StreamHandle>>>,
    search_gates: Mutex<HashMap<String, Arc<Notify>>>,
    resolve_gates: Mutex<HashMap<u64, Arc<Notify>>>,
    resolve_calls: AtomicUsize,
}

impl FakeSource {
    fn with_search(self, query: &str, result: scp_common::Result<Vec<Track>>) -> Self {
        self.searches.lock().unwrap().insert(query.to_string(), result);
        self
    }

    fn with_stream(self, track_id: u64, result: scp_common::Result<StreamHandle>) -> Self {
        self.streams.lock().unwrap().insert(track_id, result);
        self
    }

    fn gate_resolve(&self, track_id: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.resolve_gates
            .lock()
            .unwrap()
            .insert(track_id, Arc::clone(&gate));
        gate
    }

    fn gate_search(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.search_gates
            .lock()
            .unwrap()
            .insert(query.to_string(), Arc::clone(&gate));
        gate
    }

    fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackSource for FakeSource {
    async fn search(&self, query: &str) -> scp_common::Result<Vec<Track>> {
        let gate = self.search_gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn resolve(&self, track_id: u64) -> scp_common::Result<StreamHandle> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.resolve_gates.lock().unwrap().get(&track_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.streams
            .lock()
            .unwrap()
            .get(&track_id)
            .cloned()
            .unwrap_or(Err(CatalogError::TrackNotFound(track_id)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OutputCall {
    Load { track_id: u64, load_id: u64 },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    Stop,
}

#[derive(Clone, Default)]
struct RecordingOutput {
    calls: Arc<Mutex<Vec<OutputCall>>>,
}

impl RecordingOutput {
    fn calls(&self) -> Vec<OutputCall> {
        self.calls.lock().unwrap().clone()
    }

    fn loaded_tracks(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutputCall::Load { track_id, .. } => Some(track_id),
                _ => None,
            })
            .collect()
    }

    fn last_volume(&self) -> Option<f32> {
        self.calls().into_iter().rev().find_map(|c| match c {
            OutputCall::SetVolume(v) => Some(v),
            _ => None,
        })
    }
}

impl AudioOutput for RecordingOutput {
    fn load(
        &mut self,
        stream: &StreamHandle,
        load_id: u64,
        _duration_hint: Option<f64>,
    ) -> scp_common::Result<()> {
        self.calls.lock().unwrap().push(OutputCall::Load {
            track_id: stream.track_id,
            load_id,
        });
        Ok(())
    }

    fn play(&mut self) -> scp_common::Result<()> {
        self.calls.lock().unwrap().push(OutputCall::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.lock().unwrap().push(OutputCall::Pause);
    }

    fn seek(&mut self, position_seconds: f64) {
        self.calls.lock().unwrap().push(OutputCall::Seek(position_seconds));
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.lock().unwrap().push(OutputCall::SetVolume(volume));
    }

    fn stop(&mut self) {
        self.calls.lock().unwrap().push(OutputCall::Stop);
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<PlayerEvent>>,
}

impl RecordingSink {
    fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PlayerEventSink for RecordingSink {
    fn publish(&self, event: PlayerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ------------------------------------------------------------------
// Fixtures
// ------------------------------------------------------------------

fn track(id: u64) -> Track {
    Track::new(id, &format!("Track {}", id), "artist")
        .with_duration_ms(180_000)
        .with_transcodings(vec![Transcoding::new(
            "progressive",
            "audio/mpeg",
            &format!("https://catalog.test/transcodings/{}", id),
        )])
}

fn stream(id: u64) -> scp_common::Result<StreamHandle> {
    Ok(StreamHandle {
        track_id: id,
        url: format!("https://cdn.test/{}.mp3", id),
    })
}

/// Source with a "three" search returning tracks 1-3, all playable
fn three_track_source() -> FakeSource {
    FakeSource::default()
        .with_search("three", Ok(vec![track(1), track(2), track(3)]))
        .with_stream(1, stream(1))
        .with_stream(2, stream(2))
        .with_stream(3, stream(3))
}

struct Harness {
    controller: PlaybackController,
    source: Arc<FakeSource>,
    output: RecordingOutput,
    sink: Arc<RecordingSink>,
}

fn harness(source: FakeSource) -> Harness {
    let source = Arc::new(source);
    let output = RecordingOutput::default();
    let sink = Arc::new(RecordingSink::default());
    let controller = PlaybackController::new(
        Arc::clone(&source) as Arc<dyn TrackSource>,
        Box::new(output.clone()),
        Arc::clone(&sink) as Arc<dyn PlayerEventSink>,
    );
    Harness {
        controller,
        source,
        output,
        sink,
    }
}

impl Harness {
    async fn search(&mut self, query: &str) {
        assert!(self.controller.search(query));
        self.controller.settle().await;
    }

    async fn play(&mut self, index: usize) {
        self.controller.play_at(index);
        self.controller.settle().await;
    }

    async fn skip(&mut self, direction: SkipDirection) {
        self.controller.skip(direction);
        self.controller.settle().await;
    }

    fn state(&self) -> TransportState {
        self.controller.session().transport()
    }

    fn index(&self) -> Option<usize> {
        self.controller.session().current_index()
    }
}

// ------------------------------------------------------------------
// Search
// ------------------------------------------------------------------

#[tokio::test]
async fn test_empty_search_page_makes_play_a_noop() {
    let mut h = harness(FakeSource::default().with_search("nothing", Ok(Vec::new())));

    h.search("nothing").await;
    assert!(h.controller.session().queue().is_empty());

    for index in [0, 1, 5] {
        h.controller.play_at(index);
    }
    assert_eq!(h.state(), TransportState::Idle);
    assert!(h.controller.session().now_playing().is_none());
    assert!(h.controller.pending_resolve().is_none());
    assert_eq!(h.source.resolve_calls(), 0);
    assert!(h.output.calls().is_empty());
}

#[tokio::test]
async fn test_blank_search_issues_nothing() {
    let mut h = harness(three_track_source());
    assert!(!h.controller.search("   "));
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn test_search_success_replaces_queue_and_reports_count() {
    let mut h = harness(three_track_source());
    h.search("three").await;

    assert_eq!(h.controller.session().queue().len(), 3);
    assert_eq!(h.sink.event_types(), vec!["SearchStarted", "SearchSucceeded"]);
    assert!(matches!(
        h.sink.events().last(),
        Some(PlayerEvent::SearchSucceeded { count: 3, .. })
    ));
}

#[tokio::test]
async fn test_failed_search_keeps_previous_queue() {
    let mut h = harness(three_track_source().with_search(
        "offline",
        Err(CatalogError::CatalogUnavailable("connection refused".to_string())),
    ));
    h.search("three").await;
    h.search("offline").await;

    assert_eq!(h.controller.session().queue().len(), 3);
    match h.sink.events().last() {
        Some(PlayerEvent::SearchFailed { query, message, .. }) => {
            assert_eq!(query, "offline");
            assert_eq!(message, "Search failed. Check your connection.");
        }
        other => panic!("expected SearchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_only_latest_search_replaces_queue() {
    let source = three_track_source().with_search("slow", Ok(vec![track(9)]));
    let slow_gate = source.gate_search("slow");
    let mut h = harness(source);

    assert!(h.controller.search("slow"));
    h.search("three").await;
    assert_eq!(h.controller.session().queue().len(), 3);

    slow_gate.notify_one();
    h.controller.settle().await;

    let ids: Vec<u64> = h.controller.session().queue().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_new_search_keeps_current_track_playing() {
    let mut h = harness(
        three_track_source()
            .with_search("reordered", Ok(vec![track(3), track(2), track(1)]))
            .with_search("elsewhere", Ok(vec![track(7), track(8)])),
    );
    h.search("three").await;
    h.play(0).await;
    assert_eq!(h.state(), TransportState::Playing);

    h.search("reordered").await;
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.index(), Some(2));

    h.search("elsewhere").await;
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.controller.session().current_track_id(), Some(1));
    assert_eq!(h.index(), None);

    // Current track is gone from the queue, so there is nothing to skip from
    let calls_before = h.source.resolve_calls();
    h.controller.skip(SkipDirection::Next);
    assert_eq!(h.source.resolve_calls(), calls_before);
    assert_eq!(h.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_new_search_after_failed_play_returns_to_idle() {
    let source = FakeSource::default()
        .with_search("hls", Ok(vec![track(5), track(6)]))
        .with_search("retry", Ok(vec![track(5), track(7)]))
        .with_stream(5, Err(CatalogError::StreamNotFound(5)));
    let mut h = harness(source);
    h.search("hls").await;
    h.play(0).await;
    assert_eq!(h.state(), TransportState::Error);

    h.search("retry").await;

    assert_eq!(h.state(), TransportState::Idle);
    assert!(h.controller.session().now_playing().is_none());
    assert_eq!(h.index(), None);
    assert!(h.controller.session().last_error().is_none());
    assert_eq!(h.controller.session().queue().len(), 2);
    // Nothing was ever loaded, so there is nothing to stop
    assert!(h.output.calls().is_empty());
    assert!(h.sink.events().iter().any(|e| matches!(
        e,
        PlayerEvent::StateChanged {
            old_state: TransportState::Error,
            new_state: TransportState::Idle,
            ..
        }
    )));
}

#[tokio::test]
async fn test_new_search_after_track_ended_returns_to_idle() {
    let mut h = harness(
        three_track_source()
            .with_search("elsewhere", Ok(vec![track(7), track(8)]))
            .with_search("again", Ok(vec![track(1), track(2)])),
    );
    h.search("three").await;
    h.play(0).await;

    // Track left the queue, so the end of it has nowhere to advance to
    h.search("elsewhere").await;
    h.controller
        .handle_output_event(OutputEvent {
            load_id: 1,
            kind: OutputEventKind::Ended,
        });
    assert_eq!(h.state(), TransportState::Ended);

    h.search("again").await;

    assert_eq!(h.state(), TransportState::Idle);
    assert!(h.controller.session().now_playing().is_none());
    assert_eq!(h.index(), None);
    assert_eq!(h.output.calls().last(), Some(&OutputCall::Stop));

    // Events from the finished source no longer apply
    h.controller
        .handle_output_event(OutputEvent {
            load_id: 1,
            kind: OutputEventKind::DurationChanged(99.0),
        });
    assert_eq!(h.controller.session().duration(), None);
}

// ------------------------------------------------------------------
// Play and resolution
// ------------------------------------------------------------------

#[tokio::test]
async fn test_play_resolves_and_starts_output() {
    let mut h = harness(three_track_source());
    h.search("three").await;

    h.controller.play_at(1);
    assert_eq!(h.state(), TransportState::Resolving);
    assert_eq!(h.index(), Some(1));

    h.controller.settle().await;
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.controller.session().position(), 0.0);
    assert_eq!(h.controller.session().duration(), Some(180.0));
    assert_eq!(
        h.output.calls(),
        vec![
            OutputCall::Load {
                track_id: 2,
                load_id: 1
            },
            OutputCall::SetVolume(1.0),
            OutputCall::Play,
        ]
    );
    assert_eq!(
        h.sink.event_types()[2..],
        ["TrackSelected", "StateChanged", "PlaybackStarted", "StateChanged"]
    );
}

#[tokio::test]
async fn test_play_by_track_looks_up_queue_position() {
    let mut h = harness(three_track_source());
    h.search("three").await;

    h.controller.play(&track(3)).unwrap();
    assert_eq!(h.index(), Some(2));

    let err = h.controller.play(&track(42)).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_hls_only_track_fails_without_touching_output() {
    let source = FakeSource::default()
        .with_search("hls", Ok(vec![track(5), track(6)]))
        .with_stream(5, Err(CatalogError::StreamNotFound(5)));
    let mut h = harness(source);
    h.search("hls").await;

    h.play(0).await;

    assert_eq!(h.state(), TransportState::Error);
    assert_eq!(
        h.controller.session().last_error(),
        Some("No compatible stream for this track.")
    );
    assert_eq!(h.controller.session().queue().len(), 2);
    assert!(!h.controller.session().has_source());
    assert!(h.output.calls().is_empty());
    assert!(h.sink.events().iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackFault {
            track_id: Some(5),
            ..
        }
    )));
}

#[tokio::test]
async fn test_unreachable_proxy_on_play_reports_track_load_failure() {
    let source = three_track_source().with_stream(
        2,
        Err(CatalogError::CatalogUnavailable("connection refused".to_string())),
    );
    let mut h = harness(source);
    h.search("three").await;

    h.play(1).await;

    assert_eq!(h.state(), TransportState::Error);
    match h.sink.events().iter().find(|e| e.event_type() == "PlaybackFault") {
        Some(PlayerEvent::PlaybackFault {
            track_id, message, ..
        }) => {
            assert_eq!(*track_id, Some(2));
            assert_eq!(message, "Could not load this track. Check your connection.");
        }
        other => panic!("expected PlaybackFault, got {:?}", other),
    }
    assert_eq!(
        h.controller.session().last_error(),
        Some("Could not load this track. Check your connection.")
    );
}

#[tokio::test]
async fn test_failed_resolve_does_not_stop_current_audio() {
    let source = three_track_source().with_stream(2, Err(CatalogError::NoMediaAvailable(2)));
    let mut h = harness(source);
    h.search("three").await;
    h.play(0).await;

    h.play(1).await;

    assert_eq!(h.state(), TransportState::Error);
    assert!(!h.output.calls().contains(&OutputCall::Stop));
    assert!(!h.output.calls().contains(&OutputCall::Pause));
    assert_eq!(h.output.loaded_tracks(), vec![1]);
    assert_eq!(h.controller.session().queue().len(), 3);

    // Error is left by the next play
    h.play(2).await;
    assert_eq!(h.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_late_resolve_for_skipped_track_is_discarded() {
    let source = three_track_source();
    let gate_a = source.gate_resolve(1);
    let mut h = harness(source);
    h.search("three").await;

    // play(A), then skip to B before A resolves
    h.controller.play_at(0);
    h.skip(SkipDirection::Next).await;
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.controller.session().current_track_id(), Some(2));

    gate_a.notify_one();
    h.controller.settle().await;

    assert_eq!(h.output.loaded_tracks(), vec![2]);
    assert_eq!(h.controller.session().current_track_id(), Some(2));
    assert_eq!(h.index(), Some(1));
    assert_eq!(h.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_late_failure_for_skipped_track_is_discarded() {
    let source = three_track_source().with_stream(1, Err(CatalogError::StreamNotFound(1)));
    let gate_a = source.gate_resolve(1);
    let mut h = harness(source);
    h.search("three").await;

    h.controller.play_at(0);
    h.skip(SkipDirection::Next).await;

    gate_a.notify_one();
    h.controller.settle().await;

    assert_eq!(h.state(), TransportState::Playing);
    assert!(h.controller.session().last_error().is_none());
}

#[tokio::test]
async fn test_every_play_resolves_again() {
    let mut h = harness(three_track_source());
    h.search("three").await;

    h.play(0).await;
    h.play(0).await;
    h.play(0).await;

    assert_eq!(h.source.resolve_calls(), 3);
    assert_eq!(h.output.loaded_tracks(), vec![1, 1, 1]);
}

// ------------------------------------------------------------------
// Transport controls
// ------------------------------------------------------------------

#[tokio::test]
async fn test_toggle_rejected_outside_playing_or_paused() {
    let mut h = harness(three_track_source());

    let err = h.controller.toggle_play_pause().unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(h.state(), TransportState::Idle);

    h.search("three").await;
    h.controller.play_at(0);
    assert!(h.controller.toggle_play_pause().is_err());
    assert_eq!(h.state(), TransportState::Resolving);
}

#[tokio::test]
async fn test_toggle_pauses_and_resumes_output() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;

    h.controller.toggle_play_pause().unwrap();
    assert_eq!(h.state(), TransportState::Paused);
    assert_eq!(h.output.calls().last(), Some(&OutputCall::Pause));

    h.controller.toggle_play_pause().unwrap();
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.output.calls().last(), Some(&OutputCall::Play));
}

#[tokio::test]
async fn test_seek_clamps_and_preserves_state() {
    let mut h = harness(three_track_source());
    assert!(h.controller.seek(10.0).is_err());

    h.search("three").await;
    h.play(0).await;
    h.controller.toggle_play_pause().unwrap();

    for target in [-30.0, 0.0, 90.5, 180.0, 10_000.0, f64::NAN] {
        h.controller.seek(target).unwrap();
        let position = h.controller.session().position();
        assert!((0.0..=180.0).contains(&position), "seek({target}) -> {position}");
        assert_eq!(h.state(), TransportState::Paused);
    }

    h.controller.seek(10_000.0).unwrap();
    assert_eq!(h.output.calls().last(), Some(&OutputCall::Seek(180.0)));
    assert!(matches!(
        h.sink.events().last(),
        Some(PlayerEvent::Seeked { position_seconds, .. }) if *position_seconds == 180.0
    ));
}

#[tokio::test]
async fn test_volume_and_mute_are_independent() {
    let mut h = harness(three_track_source());

    h.controller.set_volume(0.6).unwrap();
    assert_eq!(h.output.last_volume(), Some(0.6));

    h.controller.toggle_mute();
    assert_eq!(h.output.last_volume(), Some(0.0));
    assert_eq!(h.controller.session().volume(), 0.6);

    h.controller.toggle_mute();
    assert_eq!(h.output.last_volume(), Some(0.6));
    assert_eq!(h.controller.session().volume(), 0.6);

    h.controller.set_volume(3.0).unwrap();
    assert_eq!(h.controller.session().volume(), 1.0);

    h.controller.set_volume(0.0).unwrap();
    assert!(!h.controller.session().muted());
    assert!(h.controller.session().snapshot().displays_muted);

    assert!(matches!(
        h.controller.set_volume(f32::NAN),
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_muted_volume_applies_to_next_track() {
    let mut h = harness(three_track_source());
    h.controller.set_volume(0.4).unwrap();
    h.controller.toggle_mute();

    h.search("three").await;
    h.play(0).await;
    assert_eq!(h.output.last_volume(), Some(0.0));
}

#[tokio::test]
async fn test_skip_wraps_around_queue() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;

    for expected in [1, 2, 0] {
        h.skip(SkipDirection::Next).await;
        assert_eq!(h.index(), Some(expected));
    }

    h.skip(SkipDirection::Prev).await;
    assert_eq!(h.index(), Some(2));
    h.skip(SkipDirection::Next).await;
    assert_eq!(h.index(), Some(0));
    assert_eq!(h.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_skip_without_selection_is_noop() {
    let mut h = harness(three_track_source());
    h.controller.skip(SkipDirection::Next);
    h.search("three").await;
    h.controller.skip(SkipDirection::Prev);

    assert_eq!(h.state(), TransportState::Idle);
    assert_eq!(h.source.resolve_calls(), 0);
}

#[tokio::test]
async fn test_stop_returns_to_idle_and_keeps_queue() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;

    h.controller.stop();
    assert_eq!(h.state(), TransportState::Idle);
    assert!(h.controller.session().now_playing().is_none());
    assert_eq!(h.controller.session().queue().len(), 3);
    assert_eq!(h.output.calls().last(), Some(&OutputCall::Stop));
}

// ------------------------------------------------------------------
// Output events
// ------------------------------------------------------------------

fn output_event(load_id: u64, kind: OutputEventKind) -> OutputEvent {
    OutputEvent { load_id, kind }
}

#[tokio::test]
async fn test_end_of_track_advances_to_next() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(2).await;

    h.controller
        .handle_output_event(output_event(1, OutputEventKind::Ended));
    assert_eq!(h.state(), TransportState::Resolving);
    assert_eq!(h.index(), Some(0));

    h.controller.settle().await;
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.output.loaded_tracks(), vec![3, 1]);

    let types = h.sink.event_types();
    let ended = types
        .windows(2)
        .any(|w| w == ["StateChanged", "TrackSelected"]);
    assert!(ended, "events: {:?}", types);
}

#[tokio::test]
async fn test_progress_updates_position_and_duration() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;

    h.controller
        .handle_output_event(output_event(1, OutputEventKind::DurationChanged(200.0)));
    h.controller
        .handle_output_event(output_event(1, OutputEventKind::TimeUpdate(65.0)));

    let snapshot = h.controller.session().snapshot();
    assert_eq!(snapshot.position_seconds, 65.0);
    assert_eq!(snapshot.duration_seconds, Some(200.0));
    assert_eq!(snapshot.position_display, "1:05");
    assert_eq!(snapshot.duration_display, "3:20");
}

#[tokio::test]
async fn test_events_from_replaced_source_are_ignored() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;
    h.play(1).await;

    h.controller
        .handle_output_event(output_event(1, OutputEventKind::TimeUpdate(42.0)));
    h.controller
        .handle_output_event(output_event(1, OutputEventKind::Ended));

    assert_eq!(h.controller.session().position(), 0.0);
    assert_eq!(h.state(), TransportState::Playing);
    assert_eq!(h.index(), Some(1));
}

#[tokio::test]
async fn test_output_fault_enters_error_without_retry() {
    let mut h = harness(three_track_source());
    h.search("three").await;
    h.play(0).await;
    let calls = h.source.resolve_calls();

    h.controller.handle_output_event(output_event(
        1,
        OutputEventKind::Fault("decoder error".to_string()),
    ));

    assert_eq!(h.state(), TransportState::Error);
    assert_eq!(
        h.controller.session().last_error(),
        Some("Playback error for this track.")
    );
    assert_eq!(h.source.resolve_calls(), calls);
    assert_eq!(h.sink.events().iter().filter(|e| e.event_type() == "PlaybackFault").count(), 1);
}

// ------------------------------------------------------------------
// Controller task
// ------------------------------------------------------------------

#[tokio::test]
async fn test_spawned_controller_processes_commands() {
    let source: Arc<dyn TrackSource> = Arc::new(three_track_source());
    let output = RecordingOutput::default();
    let sink = Arc::new(RecordingSink::default());
    let player = PlaybackController::new(
        source,
        Box::new(output.clone()),
        Arc::clone(&sink) as Arc<dyn PlayerEventSink>,
    );
    let (_output_tx, output_rx) = mpsc::unbounded_channel();
    let (handle, task) = controller::spawn(player, output_rx);
    let mut snapshots = handle.subscribe();

    handle
        .send(PlayerCommand::Search("three".to_string()))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.queue.len() == 3))
        .await
        .unwrap()
        .unwrap();

    handle.send(PlayerCommand::Play(1)).await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        snapshots.wait_for(|s| s.transport == TransportState::Playing),
    )
    .await
    .unwrap()
    .unwrap();

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.track_id, Some(2));
    assert_eq!(snapshot.title.as_deref(), Some("Track 2"));

    // Rejected commands do not stop the loop
    handle.send(PlayerCommand::SetVolume(f32::NAN)).await.unwrap();
    handle.send(PlayerCommand::Shutdown).await.unwrap();
    task.await.unwrap();

    assert_eq!(output.calls().last(), Some(&OutputCall::Stop));
    assert!(matches!(
        handle.send(PlayerCommand::ToggleMute).await,
        Err(Error::Stopped)
    ));
}
