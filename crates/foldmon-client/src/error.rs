//! Error types for foldmon-client.

use std::time::Duration;

use thiserror::Error;

/// Result type for foldmon-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connect was called on a live (or connecting) connection.
    #[error("already connected")]
    AlreadyConnected,

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// A required argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The TCP handshake did not complete in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The remote end closed the stream.
    #[error("connection closed by remote host")]
    RemoteClosed,

    /// The connection was closed while the operation was in flight.
    #[error("operation cancelled by close")]
    Cancelled,

    /// Configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same connect could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout(_) | Error::RemoteClosed | Error::Io(_)
        )
    }
}
