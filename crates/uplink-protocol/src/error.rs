//! Error types for the bridge protocol.

use thiserror::Error;

/// Errors that can occur inside the bridge or a transport adapter.
///
/// None of these are allowed to terminate the host process; the bridge
/// converts them into `error`-typed diagnostic events on the wire.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("handler failed for {event}: {message}")]
    Handler { event: String, message: String },
    #[error("enricher failed for {event}: {message}")]
    Enricher { event: String, message: String },
    #[error("command {command} failed: {message}")]
    CommandFailed { command: String, message: String },
    #[error("unknown command type: {0}")]
    UnknownCommand(String),
    #[error("channel closed")]
    ChannelClosed,
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
