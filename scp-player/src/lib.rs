//! scp-player library interface
//!
//! Playback controller for the catalog queue player: owns the listening session,
//! resolves streams through the scp proxy and drives an audio output.

pub mod command;
pub mod controller;
pub mod error;
pub mod output;
pub mod session;
pub mod sink;
pub mod source;

pub use crate::controller::{PlaybackController, PlayerCommand, PlayerHandle};
pub use crate::error::{Error, Result};
pub use crate::output::{AudioOutput, ClockOutput, OutputEvent, OutputEventKind};
pub use crate::session::{PlaybackSession, SessionSnapshot, SkipDirection};
pub use crate::sink::{NoopSink, PlayerEventSink};
pub use crate::source::{ProxyClient, TrackSource};
