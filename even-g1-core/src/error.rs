//! Error types for the protocol core

use thiserror::Error;

/// Errors produced while encoding requests or decoding responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A parameter combination the device rejects outright.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A chunked transfer that would not fit in the single-byte packet index.
    #[error("payload would need {chunks} packets, transfers are limited to 255")]
    PayloadTooLarge { chunks: usize },

    /// A response frame shorter than its decoder requires.
    #[error("response too short: expected at least {needed} bytes, got {got}")]
    ShortResponse { needed: usize, got: usize },
}
