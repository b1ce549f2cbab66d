use super::stats::LinkStats;

/// Logical stream within a connection. Sequenced delivery preserves order;
/// unsequenced delivery may reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Sequenced = 0,
    Unsequenced = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    Reliable,
    Unreliable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Received { channel: Channel, bytes: Vec<u8> },
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("connection closed by peer")]
    Closed,
}

/// A dual-channel peer link. Polling never blocks.
pub trait Transport {
    fn send(
        &mut self,
        channel: Channel,
        bytes: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    fn poll(&mut self) -> Option<TransportEvent>;

    fn is_connected(&self) -> bool;

    fn stats(&self) -> LinkStats;

    fn disconnect(&mut self);
}
