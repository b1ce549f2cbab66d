mod config;
mod context;
mod dispatch;
mod driver;
mod prediction;
mod sectors;

pub use config::{ConfigError, PacketBufferSize, SyncConfig};
pub use context::ClientSyncContext;
pub use prediction::{PredictionEngine, Simulation};

use std::time::Duration;

use crate::effects::{Effects, SimulationMode};
use crate::net::protocol::MessageType;
use crate::net::{IndexedQueue, NetMessage, Transport, TransportError, TransportEvent};
use crate::netid::{NetId, NetIdError};
use crate::simulation::{CommandBuffer, GameRules, InputState, TicClock};
use crate::world::World;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(
        "{message_type:?} message for world {message_index} arrived after world {current_index} had run"
    )]
    Desync {
        message_index: u32,
        current_index: u32,
        message_type: MessageType,
    },
    #[error("{backlog} steps of server messages buffered")]
    BufferOverflow { backlog: u32 },
    #[error("no word from the server in {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    NetId(#[from] NetIdError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub worlds_run: u64,
    pub fast_forwards: u64,
    pub replays: u64,
    pub mispredictions: u64,
    pub messages_received: u64,
    pub messages_discarded: u64,
    pub commands_sent: u64,
    pub thinkers_expired: u64,
}

/// The client half of the lockstep-with-prediction protocol. Owns the world, the
/// local command history and the prediction engine, and drives them from whatever
/// arrives on `T`.
pub struct SyncClient<T: Transport, R: GameRules> {
    transport: T,
    rules: R,
    config: SyncConfig,
    context: ClientSyncContext,
    state: ConnectionState,
    world: World,
    commands: CommandBuffer,
    prediction: PredictionEngine,
    effects: Effects,
    clock: TicClock,
    input: InputState,
    reorder: IndexedQueue<NetMessage>,
    sector_positions: IndexedQueue<NetMessage>,
    thinker_statuses: IndexedQueue<NetMessage>,
    silence: Duration,
    fast_forwarding: bool,
    stats: SyncStats,
}

impl<T: Transport, R: GameRules> SyncClient<T, R> {
    pub fn new(transport: T, rules: R, world: World, config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.max_positions();
        Ok(Self {
            prediction: PredictionEngine::new(world.sector_count(), capacity, config.prediction),
            commands: CommandBuffer::new(capacity),
            clock: TicClock::new(config.tic_rate),
            transport,
            rules,
            context: ClientSyncContext::new(),
            state: ConnectionState::Connecting,
            world,
            effects: Effects::new(),
            input: InputState::default(),
            reorder: IndexedQueue::new(),
            sector_positions: IndexedQueue::new(),
            thinker_statuses: IndexedQueue::new(),
            silence: Duration::ZERO,
            fast_forwarding: false,
            stats: SyncStats::default(),
            config,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn context(&self) -> &ClientSyncContext {
        &self.context
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn prediction(&self) -> &PredictionEngine {
        &self.prediction
    }

    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn effects_mut(&mut self) -> &mut Effects {
        &mut self.effects
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            replays: self.prediction.replays(),
            mispredictions: self.prediction.mispredictions(),
            ..self.stats.clone()
        }
    }

    /// Messages waiting for their step in the reorder and side buffers.
    pub fn buffered(&self) -> usize {
        self.reorder.len() + self.sector_positions.len() + self.thinker_statuses.len()
    }

    pub fn local_actor(&self) -> Option<NetId> {
        self.world
            .players
            .get(self.context.console_player)
            .and_then(|player| player.actor)
    }

    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    /// While the console is open the local player sends blank commands.
    pub fn set_console_active(&mut self, active: bool) {
        self.context.console_active = active;
    }

    pub fn set_demo_playback(&mut self, playing: bool) {
        self.context.demo_playback = playing;
    }

    /// Changes buffering at runtime. The next frame catches up to the server.
    pub fn set_packet_buffer(&mut self, size: PacketBufferSize) {
        if size != self.config.packet_buffer {
            log::info!("packet buffer size set to {}", size.raw());
            self.config.packet_buffer = size;
            self.context.flush_requested = true;
        }
    }

    pub fn set_prediction(&mut self, enabled: bool) {
        self.config.prediction = enabled;
        self.prediction.set_enabled(enabled);
    }

    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            log::info!("disconnecting");
            self.transport.disconnect();
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.context.leave_level();
        self.reorder.clear();
        self.sector_positions.clear();
        self.thinker_statuses.clear();
        self.clock.reset();
        self.silence = Duration::ZERO;
    }

    /// Announces why the connection is going away, closes it and hands the error back.
    fn teardown(&mut self, error: SyncError) -> SyncError {
        log::warn!("dropping connection: {}", error);
        self.effects.announce(format!("Disconnected: {}.", error));
        self.transport.disconnect();
        self.reset();
        error
    }

    fn max_latency(&self) -> Duration {
        Duration::from_secs(self.config.max_latency_secs as u64)
    }

    /// Effects from server messages are stale while catching up.
    fn dispatch_mode(&self) -> SimulationMode {
        if self.fast_forwarding {
            SimulationMode::ApplyingServerSnapshot
        } else {
            SimulationMode::Live
        }
    }

    /// Drains the transport. Returns how many events arrived.
    pub fn poll_network(&mut self) -> Result<usize, SyncError> {
        let mut events = 0;
        while let Some(event) = self.transport.poll() {
            events += 1;
            match event {
                TransportEvent::Connected => {
                    log::info!("connected to server");
                    self.state = ConnectionState::Connected;
                }
                TransportEvent::Received { bytes, .. } => self.receive(&bytes)?,
                TransportEvent::Disconnected => {
                    log::info!("server closed the connection");
                    self.effects.announce("Disconnected from server.");
                    self.reset();
                    break;
                }
            }
        }
        if events > 0 {
            self.silence = Duration::ZERO;
        }
        Ok(events)
    }

    /// Decodes one packet and either applies it now or holds it for its step.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), SyncError> {
        self.stats.messages_received += 1;
        let message = match NetMessage::decode(bytes) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("discarding malformed message: {}", err);
                self.stats.messages_discarded += 1;
                return Ok(());
            }
        };
        let message_type = message.message_type();

        if message_type.is_handshake() {
            return self.dispatch(message);
        }
        if message_type == MessageType::TicFinished {
            self.context.latest_world_index =
                self.context.latest_world_index.max(message.world_index);
            return self.check_backlog();
        }
        if !self.context.synced || !self.config.packet_buffer.is_enabled() {
            return self.dispatch(message);
        }

        let current = self.context.current_world_index;
        if message.world_index <= current {
            if self.config.constant_prediction {
                log::debug!(
                    "{} for world {} arrived late at {}, applying now",
                    message_type.name(),
                    message.world_index,
                    current
                );
                self.context.flush_requested = true;
                return self.dispatch(message);
            }
            return Err(self.teardown(SyncError::Desync {
                message_index: message.world_index,
                current_index: current,
                message_type,
            }));
        }

        let index = message.world_index;
        match message_type {
            MessageType::SectorPosition => self.sector_positions.insert(index, message),
            MessageType::ThinkerStatus => self.thinker_statuses.insert(index, message),
            _ => self.reorder.insert(index, message),
        }
        Ok(())
    }

    fn check_backlog(&mut self) -> Result<(), SyncError> {
        let backlog = self.context.backlog();
        if self.context.current_world_index == 0 || backlog as usize <= self.config.max_positions() {
            return Ok(());
        }
        if self.config.constant_prediction {
            let target = self
                .context
                .latest_world_index
                .saturating_sub(self.config.catch_up_margin);
            log::debug!("{} steps behind, fast-forwarding to {}", backlog, target);
            return self.fast_forward(target);
        }
        Err(self.teardown(SyncError::BufferOverflow { backlog }))
    }
}
