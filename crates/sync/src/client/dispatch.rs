use glam::IVec3;

use crate::effects::{ParticleKind, SideEffect, SimulationMode, Sound};
use crate::net::wire::{self, AuthLevel};
use crate::net::{Message, NetMessage, Transport};
use crate::netid::NetId;
use crate::simulation::GameRules;
use crate::world::{Actor, ActorFlags, ActorKind, Player, PlayerState};

use super::{SyncClient, SyncError};

impl<T: Transport, R: GameRules> SyncClient<T, R> {
    /// Applies one message to the world. Anything that fails validation or names an
    /// unknown net ID is logged and dropped; only a corrupt registry is an error.
    pub(super) fn dispatch(&mut self, message: NetMessage) -> Result<(), SyncError> {
        let index = message.world_index;
        let mode = self.dispatch_mode();

        match message.message {
            Message::InitialState(body) => {
                log::info!(
                    "joined as player {} on map {}",
                    body.player_number,
                    body.map_number
                );
                self.context.console_player = body.player_number as usize;
                self.context.display_player = body.player_number as usize;
                self.context.map_number = body.map_number;
                self.context.rng_seed = body.rng_seed;
            }
            Message::CurrentState(body) => {
                self.world.gametic = body.gametic;
                self.world.leveltime = body.leveltime;
                self.context.in_level = true;
                log::info!("entered level at gametic {}", body.gametic);
            }
            Message::Sync(body) => {
                self.world.gametic = body.gametic;
                self.world.leveltime = body.leveltime;
                self.context.sync_to(index);
                self.context.flush_requested = true;
                self.clock.reset();
                log::info!("synchronized at world {}", index);
            }
            Message::MapStarted(body) => self.start_map(index, body),
            Message::MapCompleted(body) => {
                log::info!("map {} completed", self.context.map_number);
                self.context.leave_level();
                self.context.map_number = body.new_map_number;
            }
            Message::AuthResult(level) => {
                if level == AuthLevel::None {
                    self.effects.announce("Authorization failed.");
                } else {
                    self.context.auth_level = level;
                    log::info!("authorization level {:?}", level);
                    self.effects.announce(format!("Authorized as {:?}.", level));
                }
            }
            Message::ClientInit(body) => {
                let client = &mut self.world.clients[body.client_number as usize];
                client.team = body.team;
                client.spectating = body.spectating != 0;
            }
            Message::ClientStatus(body) => self.handle_client_status(index, body),
            Message::PlayerSpawned(body) => self.handle_player_spawned(body)?,
            Message::PlayerRemoved(body) => {
                let number = body.player_number as usize;
                if let Some(id) = self.world.players[number].actor.take() {
                    self.world.actors.remove(id);
                }
                self.world.players[number] = Player::default();
                self.world.clients[number] = Default::default();
                if self.context.display_player == number {
                    self.context.display_player = self.context.console_player;
                }
                log::info!("player {} removed", number);
            }
            Message::PlayerCommand { client_number, .. } => {
                log::warn!(
                    "discarding command bundle for client {} sent by the server",
                    client_number
                );
            }
            Message::ServerMessage { hud, text } => {
                if hud {
                    self.effects.hud(mode, text.clone());
                }
                self.effects.announce(text);
            }
            Message::PlayerMessage { sender, text, .. } => {
                self.effects.sound(mode, None, Sound::Chat);
                self.effects.announce(format!("player {}: {}", sender, text));
            }
            Message::PuffSpawned(body) => {
                let shooter = NetId::from_raw(body.shooter_net_id);
                if self.config.predict_shots && Some(shooter) == self.local_actor() {
                    return Ok(());
                }
                self.effects.particle(
                    mode,
                    ParticleKind::Puff,
                    IVec3::from_array(body.position),
                );
            }
            Message::BloodSpawned(body) => {
                let shooter = NetId::from_raw(body.shooter_net_id);
                if self.config.predict_shots && Some(shooter) == self.local_actor() {
                    return Ok(());
                }
                let target = NetId::from_raw(body.target_net_id);
                if !self.world.actors.contains(target) {
                    log::warn!("blood for unknown actor {}", target);
                    return Ok(());
                }
                self.effects.particle(
                    mode,
                    ParticleKind::Blood,
                    IVec3::from_array(body.position),
                );
            }
            Message::ActorSpawned(body) => self.handle_actor_spawned(body)?,
            Message::ActorPosition(body) => {
                let id = NetId::from_raw(body.net_id);
                if self.prediction.is_enabled() && Some(id) == self.local_actor() {
                    return Ok(());
                }
                let Some(actor) = self.actor_mut(id, "position") else {
                    return Ok(());
                };
                body.position.apply(actor);
            }
            Message::ActorTarget(body) => {
                let target = NetId::from_raw(body.target_net_id);
                if !target.is_none() && !self.world.actors.contains(target) {
                    log::warn!("target {} is not a known actor", target);
                    return Ok(());
                }
                if let Some(actor) = self.actor_mut(NetId::from_raw(body.net_id), "target") {
                    actor.target = target;
                }
            }
            Message::ActorState(body) => {
                if let Some(actor) = self.actor_mut(NetId::from_raw(body.net_id), "state") {
                    actor.state = body.state;
                    actor.kind = ActorKind::from(body.kind);
                }
            }
            Message::ActorDamaged(body) => self.handle_actor_damaged(body, mode),
            Message::ActorKilled(body) => self.handle_actor_killed(body, mode),
            Message::ActorRemoved(body) => {
                let id = NetId::from_raw(body.net_id);
                if self.world.actors.remove(id).is_none() {
                    log::warn!("removal of unknown actor {}", id);
                    return Ok(());
                }
                for player in &mut self.world.players {
                    if player.actor == Some(id) {
                        player.actor = None;
                    }
                }
            }
            Message::LineActivated(body) => {
                let actor = NetId::from_raw(body.actor_net_id);
                if !self.world.actors.contains(actor) {
                    log::warn!("line {} activated by unknown actor {}", body.line, actor);
                    return Ok(());
                }
                self.effects.emit(
                    mode,
                    SideEffect::LineActivated {
                        actor,
                        line: body.line,
                        side: body.side,
                        activation: body.activation,
                    },
                );
            }
            Message::MonsterActive(body) => {
                let id = NetId::from_raw(body.net_id);
                let Some(actor) = self.actor_mut(id, "active sound") else {
                    return Ok(());
                };
                let kind = actor.kind as i32;
                self.effects.sound(mode, Some(id), Sound::MonsterActive(kind));
            }
            Message::MonsterAwakened(body) => {
                let id = NetId::from_raw(body.net_id);
                let Some(actor) = self.actor_mut(id, "awakening") else {
                    return Ok(());
                };
                actor.flags.insert(ActorFlags::AWAKE);
                let kind = actor.kind as i32;
                self.effects.sound(mode, Some(id), Sound::MonsterSight(kind));
            }
            Message::MissileSpawned(body) => self.handle_missile_spawned(body, mode)?,
            Message::MissileExploded(body) => {
                let Some(actor) = self.actor_mut(NetId::from_raw(body.net_id), "explosion") else {
                    return Ok(());
                };
                actor.momentum = IVec3::ZERO;
                actor.flags.remove(ActorFlags::MISSILE);
                actor.state = body.tics as i32;
                let position = actor.position;
                self.effects.particle(mode, ParticleKind::Explosion, position);
            }
            Message::ThinkerSpawned { header, status } => {
                self.handle_thinker_spawned(header, status)?
            }
            Message::ThinkerStatus {
                net_id,
                command_index,
                status,
            } => self.handle_thinker_status(net_id, command_index, status),
            Message::ThinkerRemoved {
                net_id,
                command_index,
                kind,
            } => self.handle_thinker_removed(net_id, command_index, kind),
            Message::SectorPosition(body) => self.handle_sector_position(body),
            Message::AnnouncerEvent(body) => {
                let source = NetId::from_raw(body.source_net_id);
                if !source.is_none() && !self.world.actors.contains(source) {
                    log::warn!("announcer event {} from unknown actor {}", body.event, source);
                    return Ok(());
                }
                self.effects.emit(
                    mode,
                    SideEffect::Announcer {
                        event: body.event,
                        source,
                    },
                );
            }
            Message::TicFinished => {
                self.context.latest_world_index = self.context.latest_world_index.max(index);
            }
        }
        Ok(())
    }

    fn actor_mut(&mut self, id: NetId, what: &str) -> Option<&mut Actor> {
        let actor = self.world.actors.get_mut(id);
        if actor.is_none() {
            log::warn!("{} for unknown actor {}", what, id);
        }
        actor
    }

    pub(super) fn sector_in_range(&self, sector: u32, what: &str) -> Option<usize> {
        let sector = sector as usize;
        if sector >= self.world.sector_count() {
            log::warn!(
                "{} names sector {} but the level has {}",
                what,
                sector,
                self.world.sector_count()
            );
            return None;
        }
        Some(sector)
    }

    fn start_map(&mut self, index: u32, body: wire::MapStarted) {
        log::info!("map {} started at world {}", body.map_number, index);
        self.world.reset_net_ids();
        self.world.gametic = body.gametic;
        self.world.leveltime = body.leveltime;
        self.commands.clear();
        self.prediction.reset(self.world.sector_count());
        self.reorder.clear();
        self.sector_positions.clear();
        self.thinker_statuses.clear();
        self.context.map_number = body.map_number;
        self.context.in_level = true;
        self.context.sync_to(index);
        self.clock.reset();
    }

    fn handle_client_status(&mut self, index: u32, body: wire::ClientStatus) {
        let number = body.client_number as usize;
        let client = &mut self.world.clients[number];
        client.server_lag = body.server_lag;
        client.transit_lag = body.transit_lag;
        client.packet_loss = body.packet_loss;
        client.floor_status = body.floor_status;

        if number == self.context.console_player {
            self.context.activation_cutoff.command_index = body.last_command_run;
            self.context.activation_cutoff.world_index = index;
            if self.prediction.is_enabled() {
                self.prediction.absorb(body.last_command_run, body.position);
                return;
            }
        }
        if let Some((player, actor)) = self.world.player_and_actor_mut(number) {
            body.position.apply(player, actor);
        }
    }

    fn handle_player_spawned(&mut self, body: wire::PlayerSpawned) -> Result<(), SyncError> {
        let Some(sector) = self.sector_in_range(body.sector, "player spawn") else {
            return Ok(());
        };
        let number = body.player_number as usize;
        if let Some(old) = self.world.players[number].actor.take() {
            self.world.actors.remove(old);
        }

        let mut actor = Actor::new(ActorKind::Player, IVec3::from_array(body.position), sector);
        actor.angle = body.angle;
        if let Some(sector) = self.world.sectors.get(sector) {
            actor.floor_z = sector.floor_height;
            actor.ceiling_z = sector.ceiling_height;
        }
        let spectating = body.as_spectator != 0;
        if spectating {
            actor.flags = ActorFlags::SPECTATOR | ActorFlags::NO_GRAVITY;
        }
        let id = NetId::from_raw(body.net_id);
        self.world.actors.insert_at(id, actor)?;

        self.world.players[number] = Player {
            in_game: true,
            actor: Some(id),
            ..Player::default()
        };
        self.world.clients[number].spectating = spectating;
        log::info!("player {} spawned as actor {}", number, id);
        Ok(())
    }

    fn handle_actor_spawned(&mut self, body: wire::ActorSpawned) -> Result<(), SyncError> {
        let Some(sector) = self.sector_in_range(body.sector, "actor spawn") else {
            return Ok(());
        };
        let mut actor = Actor::new(
            ActorKind::from(body.kind),
            IVec3::from_array(body.position),
            sector,
        );
        actor.momentum = IVec3::from_array(body.momentum);
        actor.angle = body.angle;
        actor.flags = ActorFlags::from_bits_truncate(body.flags);
        self.world
            .actors
            .insert_at(NetId::from_raw(body.net_id), actor)?;
        Ok(())
    }

    fn handle_missile_spawned(
        &mut self,
        body: wire::MissileSpawned,
        mode: SimulationMode,
    ) -> Result<(), SyncError> {
        let Some(sector) = self.sector_in_range(body.sector, "missile spawn") else {
            return Ok(());
        };
        let source = NetId::from_raw(body.source_net_id);
        let mut missile = Actor::new(ActorKind::Missile, IVec3::from_array(body.position), sector);
        missile.momentum = IVec3::from_array(body.momentum);
        missile.angle = body.angle;
        missile.state = body.kind;
        missile.target = source;
        missile.flags = ActorFlags::MISSILE | ActorFlags::NO_GRAVITY;

        let id = NetId::from_raw(body.net_id);
        self.world.actors.insert_at(id, missile)?;
        self.effects.sound(mode, Some(id), Sound::MissileLaunch);
        Ok(())
    }

    fn handle_actor_damaged(&mut self, body: wire::ActorDamaged, mode: SimulationMode) {
        let id = NetId::from_raw(body.target_net_id);
        let Some(actor) = self.actor_mut(id, "damage") else {
            return;
        };
        actor.health = actor.health.saturating_sub(body.health_damage);
        let health = actor.health;

        if let Some(number) = self.world.player_for_actor(id) {
            let player = &mut self.world.players[number];
            player.health = health;
            player.damage_count = player
                .damage_count
                .saturating_add(body.health_damage)
                .min(100);
            if body.fatal == 0 {
                self.effects.sound(mode, Some(id), Sound::PlayerPain);
            }
        }
    }

    fn handle_actor_killed(&mut self, body: wire::ActorKilled, mode: SimulationMode) {
        let id = NetId::from_raw(body.target_net_id);
        let Some(actor) = self.actor_mut(id, "death") else {
            return;
        };
        actor.health = actor.health.min(0);
        actor.flags.insert(ActorFlags::CORPSE);
        actor.flags.remove(ActorFlags::SOLID | ActorFlags::SHOOTABLE);

        if let Some(number) = self.world.player_for_actor(id) {
            let player = &mut self.world.players[number];
            player.state = PlayerState::Dead;
            player.health = player.health.min(0);
            self.effects.sound(mode, Some(id), Sound::PlayerDeath);
        }
    }
}
