//! Error types for the engine

use even_g1_core::{CodecError, Side};
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything a submitted command can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A target side has not finished its connection handshake.
    #[error("{0} side is not initialized")]
    SideNotReady(Side),

    /// An in-flight command on a target side already claims this response
    /// prefix; sending now would make correlation ambiguous.
    #[error("response prefix collides with an in-flight command")]
    Busy,

    /// A chunked transfer that would not fit in the single-byte packet index.
    #[error("payload would need {chunks} packets, transfers are limited to 255")]
    PayloadTooLarge { chunks: usize },

    /// A parameter combination the device rejects outright.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A packet write failed; the command was withdrawn from the registries.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No matching response arrived before the command deadline.
    #[error("timed out waiting for a response")]
    Timeout,

    /// A response matched the command but its decoder rejected it.
    #[error("response could not be decoded: {0}")]
    Decode(String),

    /// The side disconnected while the command was pending.
    #[error("{0} side disconnected")]
    SideDisconnected(Side),

    /// The submitter cancelled the command.
    #[error("command cancelled")]
    Cancelled,
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidArgument(msg) => Error::InvalidArgument(msg),
            CodecError::PayloadTooLarge { chunks } => Error::PayloadTooLarge { chunks },
            CodecError::ShortResponse { .. } => Error::Decode(err.to_string()),
        }
    }
}
