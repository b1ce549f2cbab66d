use std::collections::BTreeMap;
use std::time::Duration;

use glam::IVec3;

use ticsync::fixed::from_int;
use ticsync::net::wire;
use ticsync::simulation::Buttons;
use ticsync::thinker::DoorStatus;
use ticsync::{
    Actor, ActorKind, BasicRules, Channel, Command, Effects, GameRules, MemoryEndpoint, Message,
    NetId, NetMessage, PlayerPosition, Reliability, SectorBroadcaster, SectorThinker,
    SimulationMode, ThinkerStatus, TicClock, Transport, TransportError, TransportEvent, World,
    thinker_status_messages,
};

use crate::config::LoopbackConfig;

const PLAYER_NUMBER: usize = 0;
const PLAYER_NET_ID: u32 = 1;
const FIRST_THINKER_NET_ID: u32 = 1000;

/// A single-client authoritative server speaking the wire protocol over the
/// in-memory link.
pub struct LoopbackServer {
    endpoint: MemoryEndpoint,
    config: LoopbackConfig,
    world: World,
    rules: BasicRules,
    effects: Effects,
    broadcaster: SectorBroadcaster,
    clock: TicClock,
    pending: BTreeMap<u32, Command>,
    outgoing: Vec<NetMessage>,
    world_index: u32,
    last_command_run: u32,
    next_thinker_id: u32,
    joined: bool,
    positions: BTreeMap<u32, PlayerPosition>,
}

impl LoopbackServer {
    pub fn new(endpoint: MemoryEndpoint, world: World, config: LoopbackConfig) -> Self {
        Self {
            broadcaster: SectorBroadcaster::new(world.sector_count()),
            clock: TicClock::new(config.tic_rate),
            endpoint,
            config,
            world,
            rules: BasicRules::new(),
            effects: Effects::new(),
            pending: BTreeMap::new(),
            outgoing: Vec::new(),
            world_index: 0,
            last_command_run: 0,
            next_thinker_id: FIRST_THINKER_NET_ID,
            joined: false,
            positions: BTreeMap::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_index(&self) -> u32 {
        self.world_index
    }

    pub fn last_command_run(&self) -> u32 {
        self.last_command_run
    }

    /// The player as the server saw it right after running `command_index`.
    pub fn position_at(&self, command_index: u32) -> Option<&PlayerPosition> {
        self.positions.get(&command_index)
    }

    pub fn update(&mut self, delta: Duration) -> Result<(), TransportError> {
        self.process_network()?;
        self.clock.accumulate(delta);
        while self.clock.consume_tick() {
            self.tick()?;
        }
        Ok(())
    }

    fn process_network(&mut self) -> Result<(), TransportError> {
        while let Some(event) = self.endpoint.poll() {
            match event {
                TransportEvent::Connected => self.welcome()?,
                TransportEvent::Received { bytes, .. } => self.handle_packet(&bytes),
                TransportEvent::Disconnected => {
                    log::info!("client disconnected");
                    self.joined = false;
                }
            }
        }
        Ok(())
    }

    fn welcome(&mut self) -> Result<(), TransportError> {
        log::info!("client connected, starting map {}", self.config.map_number);
        let index = self.world_index;
        self.send(NetMessage::new(
            index,
            Message::InitialState(wire::InitialState {
                player_number: PLAYER_NUMBER as u32,
                map_number: self.config.map_number,
                rng_seed: self.config.rng_seed as u32,
            }),
        ))?;
        self.send(NetMessage::new(index, Message::AuthResult(wire::AuthLevel::Player)))?;
        self.send(NetMessage::new(
            index,
            Message::MapStarted(wire::MapStarted {
                map_number: self.config.map_number,
                gametic: self.world.gametic,
                leveltime: self.world.leveltime,
            }),
        ))?;

        let spawn = IVec3::ZERO;
        let mut actor = Actor::new(ActorKind::Player, spawn, 0);
        if let Some(sector) = self.world.sectors.first() {
            actor.floor_z = sector.floor_height;
            actor.ceiling_z = sector.ceiling_height;
        }
        let id = NetId::from_raw(PLAYER_NET_ID);
        if self.world.actors.insert_at(id, actor).is_ok() {
            let player = &mut self.world.players[PLAYER_NUMBER];
            player.in_game = true;
            player.actor = Some(id);
        }
        self.outgoing.push(NetMessage::new(
            index + 1,
            Message::PlayerSpawned(wire::PlayerSpawned {
                player_number: PLAYER_NUMBER as u32,
                net_id: PLAYER_NET_ID,
                as_spectator: 0,
                position: spawn.to_array(),
                angle: 0,
                sector: 0,
            }),
        ));
        self.broadcaster.invalidate();
        self.joined = true;
        Ok(())
    }

    fn handle_packet(&mut self, bytes: &[u8]) {
        let message = match NetMessage::decode(bytes) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("discarding malformed packet from client: {}", err);
                return;
            }
        };
        match message.message {
            Message::PlayerCommand { commands, .. } => {
                for command in commands {
                    if command.world_index > self.last_command_run {
                        self.pending.insert(command.world_index, command);
                    }
                }
            }
            other => log::warn!("unexpected {:?} from client", other.message_type()),
        }
    }

    fn tick(&mut self) -> Result<(), TransportError> {
        self.world_index += 1;
        if !self.joined {
            return Ok(());
        }

        let due: Vec<Command> = self.pending.values().copied().collect();
        self.pending.clear();
        for command in due {
            self.run_command(command);
        }

        let local = self.world.players[PLAYER_NUMBER].actor;
        self.rules.tick_world(&mut self.world, local, &mut self.effects);
        self.world.gametic = self.world.gametic.wrapping_add(1);
        self.effects.drain().count();

        self.broadcast()
    }

    /// Runs one client command, with the sector specials it drives going first.
    fn run_command(&mut self, command: Command) {
        let index = command.world_index;
        self.step_thinkers(index);
        if command.buttons.contains(Buttons::USE) {
            self.activate_door(index);
        }

        let World {
            players,
            actors,
            sectors,
            ..
        } = &mut self.world;
        let player = &mut players[PLAYER_NUMBER];
        if let Some(actor) = player.actor.and_then(|id| actors.get_mut(id)) {
            self.rules.run_player(
                player,
                actor,
                &command,
                sectors,
                SimulationMode::Live,
                &mut self.effects,
            );
            self.positions
                .insert(index, PlayerPosition::capture(index, player, actor));
        }
        self.last_command_run = index;
    }

    fn step_thinkers(&mut self, index: u32) {
        let World {
            thinkers, sectors, ..
        } = &mut self.world;
        let mut finished = Vec::new();
        for (id, thinker) in thinkers.iter_mut() {
            if !thinker.is_active_at(index) {
                continue;
            }
            let Some(sector) = sectors.get_mut(thinker.sector) else {
                continue;
            };
            thinker.think(index, sector, SimulationMode::Live, &mut self.effects);
            if thinker.removal().is_some() {
                finished.push((id, thinker.kind()));
            }
        }
        for (net_id, kind) in finished {
            if let Some(thinker) = self.world.remove_thinker(ticsync::ThinkerRef::Confirmed(net_id)) {
                log::debug!("{} on sector {} finished", kind.name(), thinker.sector);
            }
            self.outgoing.push(NetMessage::new(
                self.world_index,
                Message::ThinkerRemoved {
                    net_id,
                    command_index: index,
                    kind,
                },
            ));
        }
    }

    fn activate_door(&mut self, index: u32) {
        let number = self.config.door_sector;
        let Some(sector) = self.world.sectors.get(number) else {
            return;
        };
        if sector.has_thinker() {
            return;
        }
        let status = ThinkerStatus::Door(DoorStatus::raise(
            sector.floor_height + from_int(self.config.door_height),
        ));
        let id = NetId::from_raw(self.next_thinker_id);
        self.next_thinker_id += 1;
        let thinker = SectorThinker::from_server(number, status, 0, index, 64);
        if let Err(err) = self.world.thinkers.insert_at(id, thinker) {
            log::error!("door spawn failed: {}", err);
            return;
        }
        self.world.sectors[number]
            .thinkers
            .push(ticsync::ThinkerRef::Confirmed(id));
        log::debug!("door {} opened on sector {} by command {}", id, number, index);
        self.outgoing.push(NetMessage::new(
            self.world_index,
            Message::ThinkerSpawned {
                header: wire::ThinkerSpawnHeader {
                    net_id: id.raw(),
                    command_index: index,
                    kind: status.kind() as u32,
                    sector: number as u32,
                    line: -1,
                    sound_sequence: 0,
                },
                status,
            },
        ));
    }

    fn broadcast(&mut self) -> Result<(), TransportError> {
        let index = self.world_index;
        let mut messages: Vec<NetMessage> = self
            .outgoing
            .drain(..)
            .map(|message| NetMessage { world_index: index, ..message })
            .collect();

        let command = self.last_command_run;
        messages.extend(
            self.broadcaster
                .sector_messages(index, command, &self.world.sectors),
        );
        messages.extend(thinker_status_messages(index, command, &self.world.thinkers));

        if let Some(position) = self.positions.get(&command).copied() {
            messages.push(NetMessage::new(
                index,
                Message::ClientStatus(wire::ClientStatus {
                    client_number: PLAYER_NUMBER as u32,
                    last_command_run: command,
                    position,
                    ..Default::default()
                }),
            ));
        }
        messages.push(NetMessage::new(index, Message::TicFinished));

        for message in &messages {
            self.send(message.clone())?;
        }
        Ok(())
    }

    fn send(&mut self, message: NetMessage) -> Result<(), TransportError> {
        self.endpoint.send(
            Channel::Sequenced,
            &message.encode(),
            Reliability::Reliable,
        )
    }
}
