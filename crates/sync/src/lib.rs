pub mod client;
pub mod effects;
pub mod fixed;
pub mod net;
pub mod netid;
pub mod server;
pub mod simulation;
pub mod snapshot;
pub mod thinker;
pub mod world;

pub use client::{
    ClientSyncContext, ConfigError, ConnectionState, PacketBufferSize, PredictionEngine,
    SyncClient, SyncConfig, SyncError, SyncStats,
};
pub use effects::{Effects, ParticleKind, SideEffect, SimulationMode, Sound};
pub use net::{
    Channel, IndexedQueue, LinkStats, MemoryEndpoint, Message, MessageType, NetMessage,
    PacketLossSimulation, ProtocolError, Reliability, Transport, TransportError, TransportEvent,
    memory_pair,
};
pub use netid::{NetId, NetIdError, NetIdRegistry, NetIdentified};
pub use server::{SectorBroadcaster, thinker_status_messages};
pub use simulation::{BasicRules, Command, CommandBuffer, GameRules, InputState, TicClock};
pub use snapshot::{ActorPosition, PlayerPosition, SectorPosition, SnapshotStore};
pub use thinker::{SectorThinker, ThinkerKind, ThinkerStatus};
pub use world::{Actor, ActorKind, Player, Sector, ThinkerRef, World};
