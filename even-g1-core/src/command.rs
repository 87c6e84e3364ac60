//! The typed command descriptor

use std::time::Duration;

use crate::error::CodecError;
use crate::side::Target;

/// Default time a command may wait for a matching response.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(1000);

/// Largest packet the engine will hand to a transport. The device MTU is
/// 512 bytes; per-operation payload budgets stay well below it to leave room
/// for the lower-layer framing.
pub const TRANSPORT_MTU: usize = 512;

/// An immutable, fully-encoded request with a typed response decoder.
///
/// A command carries one or more outbound packets, the byte prefix a
/// response must start with to be correlated back to it, the side(s) it is
/// dispatched to, and a decoder from the raw response frame (starting at the
/// matched prefix) to the caller-visible result type.
#[derive(Debug)]
pub struct Command<R> {
    packets: Vec<Vec<u8>>,
    response_prefix: Vec<u8>,
    target: Target,
    deadline: Duration,
    decode: fn(&[u8]) -> Result<R, CodecError>,
}

impl<R> Command<R> {
    /// Builds a command from its encoded packets.
    pub fn new(
        packets: Vec<Vec<u8>>,
        response_prefix: Vec<u8>,
        target: Target,
        decode: fn(&[u8]) -> Result<R, CodecError>,
    ) -> Self {
        Self {
            packets,
            response_prefix,
            target,
            deadline: DEFAULT_DEADLINE,
            decode,
        }
    }

    /// Replaces the default response deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Outbound packets, in transmit order.
    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    /// Bytes a response must start with to count as a reply.
    pub fn response_prefix(&self) -> &[u8] {
        &self.response_prefix
    }

    /// The side(s) this command is dispatched to.
    pub fn target(&self) -> Target {
        self.target
    }

    /// How long the engine waits for a matching response.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// The response decoder.
    pub fn decoder(&self) -> fn(&[u8]) -> Result<R, CodecError> {
        self.decode
    }

    /// Decodes a response frame (starting at the matched prefix).
    pub fn decode(&self, data: &[u8]) -> Result<R, CodecError> {
        (self.decode)(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Target;

    fn decode_len(data: &[u8]) -> Result<usize, CodecError> {
        Ok(data.len())
    }

    #[test]
    fn deadline_defaults_to_one_second() {
        let cmd = Command::new(vec![vec![0x01]], vec![0x01], Target::Both, decode_len);
        assert_eq!(cmd.deadline(), Duration::from_millis(1000));
    }

    #[test]
    fn with_deadline_overrides_the_default() {
        let cmd = Command::new(vec![vec![0x01]], vec![0x01], Target::Both, decode_len)
            .with_deadline(Duration::from_millis(50));
        assert_eq!(cmd.deadline(), Duration::from_millis(50));
    }
}
