//! Error types for scp-player
//!
//! Catalog, resolution and output faults never surface here: the controller turns
//! them into the `Error` transport state. This enum covers rejected commands.

use thiserror::Error;

/// Main error type for scp-player
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Operation not valid in the current transport state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid command argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Controller task is no longer running
    #[error("Player stopped")]
    Stopped,
}

/// Convenience Result type using scp-player Error
pub type Result<T> = std::result::Result<T, Error>;
