//! Error types for framewire.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for all framewire operations.
#[derive(Debug, Error)]
pub enum FramewireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not reach the peer.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Address the connection was attempted to.
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind or accept on the listening address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener was bound (or binding) to.
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Body byte count differs from the announced size.
    #[error("Frame {frame}: expected {expected} bytes, got {actual}")]
    Framing {
        /// Frame number being transferred.
        frame: u64,
        /// Size announced before the body.
        expected: u64,
        /// Bytes actually observed.
        actual: u64,
    },

    /// No acknowledgment arrived before the deadline.
    #[error("Timed out after {after:?} waiting for ack of frame {frame}")]
    Timeout {
        /// Frame number awaiting acknowledgment.
        frame: u64,
        /// Configured deadline.
        after: Duration,
    },

    /// Destination artifact could not be created, opened or written.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        /// File the operation targeted.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Acknowledgment named another frame (strict ack policy only).
    #[error("Expected ack for frame {expected}, received {received:?}")]
    UnexpectedAck {
        /// Frame number awaiting acknowledgment.
        expected: u64,
        /// Raw control message received instead.
        received: String,
    },

    /// Malformed or out-of-order control message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Peer closed the connection while a message was expected.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Manifest serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FramewireError {
    pub(crate) fn connect(addr: impl ToString, source: std::io::Error) -> Self {
        Self::Connect {
            addr: addr.to_string(),
            source,
        }
    }

    pub(crate) fn bind(addr: impl ToString, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Frame number this error is scoped to, if any.
    pub fn frame(&self) -> Option<u64> {
        match self {
            Self::Framing { frame, .. } | Self::Timeout { frame, .. } => Some(*frame),
            Self::UnexpectedAck { expected, .. } => Some(*expected),
            _ => None,
        }
    }
}

/// Result type alias using FramewireError.
pub type Result<T> = std::result::Result<T, FramewireError>;
