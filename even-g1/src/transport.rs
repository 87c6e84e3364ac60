//! The byte-pipe contract each side of the glasses plugs into, and the
//! per-side connection lifecycle.

use async_trait::async_trait;
use thiserror::Error;

/// Error surfaced by a transport endpoint.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("transport error: {0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One side's bidirectional byte pipe.
///
/// The engine treats the link below it as opaque: typically a BLE UART
/// (write characteristic out, notifications in), but anything that moves
/// packets of up to 512 bytes works. The transport owns fragmentation below
/// that size.
///
/// Inbound bytes and lifecycle changes flow the other way: the integration
/// layer feeds them into [`Engine::on_bytes`](crate::Engine::on_bytes) and
/// [`Engine::on_transport_event`](crate::Engine::on_transport_event).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the link.
    async fn connect(&self) -> std::result::Result<(), TransportError>;

    /// Tears the link down.
    async fn disconnect(&self);

    /// Whether the link is up with MTU negotiation, service discovery and
    /// notification subscription all complete.
    fn is_initialized(&self) -> bool;

    /// Writes one packet. Packets of a single command are written in order.
    async fn send(&self, bytes: &[u8]) -> std::result::Result<(), TransportError>;
}

/// Lifecycle notifications pushed into the engine by the transport glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection attempt started.
    Connecting,
    /// The link is up.
    Connected,
    /// MTU, service discovery and notification subscription are done.
    Initialized,
    /// The link dropped, whatever the previous state was.
    Disconnected,
}

/// Connection state of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Initialized,
}

impl SideState {
    /// Applies a lifecycle event, returning the next state.
    ///
    /// Disconnects are accepted from any state; every other event is only
    /// valid as the forward step of the handshake.
    pub(crate) fn apply(self, event: TransportEvent) -> Option<SideState> {
        match (self, event) {
            (_, TransportEvent::Disconnected) => Some(SideState::Disconnected),
            (SideState::Disconnected, TransportEvent::Connecting) => Some(SideState::Connecting),
            (SideState::Connecting, TransportEvent::Connected) => Some(SideState::Connected),
            (SideState::Connected, TransportEvent::Initialized) => Some(SideState::Initialized),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_advances_in_order() {
        let mut state = SideState::default();
        for (event, expected) in [
            (TransportEvent::Connecting, SideState::Connecting),
            (TransportEvent::Connected, SideState::Connected),
            (TransportEvent::Initialized, SideState::Initialized),
        ] {
            state = state.apply(event).expect("legal transition");
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        assert_eq!(SideState::Disconnected.apply(TransportEvent::Initialized), None);
        assert_eq!(SideState::Disconnected.apply(TransportEvent::Connected), None);
        assert_eq!(SideState::Connecting.apply(TransportEvent::Initialized), None);
        assert_eq!(SideState::Initialized.apply(TransportEvent::Connecting), None);
    }

    #[test]
    fn disconnect_is_accepted_from_any_state() {
        for state in [
            SideState::Disconnected,
            SideState::Connecting,
            SideState::Connected,
            SideState::Initialized,
        ] {
            assert_eq!(
                state.apply(TransportEvent::Disconnected),
                Some(SideState::Disconnected)
            );
        }
    }
}
