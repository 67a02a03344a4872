//! # SCP Common Library
//!
//! Shared code for the scp proxy and player:
//! - Catalog entities and proxy wire types
//! - Failure taxonomy shared across the HTTP boundary
//! - Transport state, player events and the EventBus
//! - Configuration file location helpers
//! - Time display formatting

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use catalog::{StreamHandle, Track, TrackOwner, Transcoding};
pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent, TransportState};
