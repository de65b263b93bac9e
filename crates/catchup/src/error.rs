//! Error types for the catch-up engine.

use thiserror::Error;

/// Errors surfaced by the catch-up engine.
///
/// The engine recovers from network-level failures internally through its
/// retry loop; errors here cover the transport seam and API misuse.
#[derive(Error, Debug)]
pub enum CatchupError {
    /// A block request could not be handed to the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// `start` was called on an engine that is already running.
    #[error("catch-up engine already started")]
    AlreadyStarted,
}
