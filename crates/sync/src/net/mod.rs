pub mod memory;
pub mod message;
pub mod protocol;
pub mod reorder;
pub mod stats;
pub mod transport;
pub mod wire;

pub use memory::{MemoryEndpoint, memory_pair};
pub use message::{Message, NetMessage};
pub use protocol::{
    CL_MAX_BUFFER_SIZE, HEADER_SIZE, MAX_CLIENTS, MAX_COMMAND_BUNDLE_SIZE, MAX_LATENCY_SECS,
    MAX_POSITIONS, MAX_STRING_SIZE, MessageHeader, MessageType, ProtocolError, TIC_RATE,
    peek_header,
};
pub use reorder::IndexedQueue;
pub use stats::{LinkStats, PacketLossSimulation};
pub use transport::{Channel, Reliability, Transport, TransportError, TransportEvent};
