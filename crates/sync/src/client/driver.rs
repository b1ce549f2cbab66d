use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::effects::SimulationMode;
use crate::net::{Channel, Message, NetMessage, Reliability, Transport};
use crate::simulation::GameRules;
use crate::world::World;

use super::{ConnectionState, PacketBufferSize, Simulation, SyncClient, SyncError};

impl<T: Transport, R: GameRules> SyncClient<T, R> {
    /// Runs one frame: network, then as many steps as real time allows.
    /// Returns the number of world steps run.
    pub fn update(&mut self, delta: Duration) -> Result<usize, SyncError> {
        if self.state == ConnectionState::Disconnected {
            return Ok(0);
        }
        if self.poll_network()? == 0 {
            self.silence += delta;
        }
        if self.state == ConnectionState::Disconnected {
            return Ok(0);
        }
        if self.silence >= self.max_latency() {
            return Err(self.teardown(SyncError::Timeout(self.silence)));
        }

        self.clock.accumulate(delta);
        let mut ran = 0;
        while self.clock.consume_tick() {
            ran += self.try_run_tics()?;
        }
        Ok(ran)
    }

    /// Spins on the wall clock until `running` clears or the connection ends.
    pub fn run_realtime(&mut self, running: &AtomicBool) -> Result<(), SyncError> {
        let mut last = Instant::now();
        while running.load(Ordering::Relaxed) && self.state != ConnectionState::Disconnected {
            let now = Instant::now();
            self.update(now - last)?;
            last = now;
            if !self.clock.should_tick() {
                std::thread::yield_now();
            }
        }
        Ok(())
    }

    /// Decides how many steps this frame runs, then predicts once.
    pub fn try_run_tics(&mut self) -> Result<usize, SyncError> {
        if !self.context.synced {
            return Ok(0);
        }
        let mut ran = 0;

        if self.context.flush_requested {
            self.context.flush_requested = false;
            let target = self
                .context
                .latest_world_index
                .saturating_sub(self.config.catch_up_margin);
            while self.context.current_world_index < target {
                self.run_world()?;
                ran += 1;
            }
            if ran > 0 {
                self.stats.fast_forwards += 1;
                log::debug!("flushed packet buffer through world {}", target);
            }
        } else {
            let backlog = self.context.backlog();
            let extra = match self.config.packet_buffer {
                PacketBufferSize::Adaptive => {
                    backlog > self.rtt_tics() + self.config.adaptive_slack_tics
                }
                PacketBufferSize::Fixed(size) => !self.config.constant_prediction && backlog > size,
                PacketBufferSize::Disabled => false,
            };
            if extra {
                self.run_world()?;
                ran += 1;
            }
        }

        if self.config.constant_prediction
            || self.context.current_world_index + 1 < self.context.latest_world_index
        {
            self.run_world()?;
            ran += 1;
        }

        if ran > 0 {
            self.predict();
        }
        Ok(ran)
    }

    /// Runs steps back to back until `target`, then predicts once for the whole burst.
    pub fn fast_forward(&mut self, target: u32) -> Result<(), SyncError> {
        let start = self.context.current_world_index;
        self.fast_forwarding = true;
        let mut result: Result<(), SyncError> = Ok(());
        while result.is_ok() && self.context.current_world_index < target {
            result = self.run_world();
        }
        self.fast_forwarding = false;
        result?;

        self.stats.fast_forwards += 1;
        log::debug!(
            "fast-forwarded {} steps to world {}",
            target.saturating_sub(start),
            self.context.current_world_index
        );
        self.predict();
        Ok(())
    }

    /// One prediction pass up to the current step.
    pub fn predict(&mut self) -> bool {
        let mut sim = Simulation {
            world: &mut self.world,
            commands: &self.commands,
            rules: &self.rules,
            effects: &mut self.effects,
            console_player: self.context.console_player,
        };
        self.prediction
            .predict(self.context.current_world_index, &mut sim)
    }

    /// Advances exactly one step.
    pub fn run_world(&mut self) -> Result<(), SyncError> {
        self.context.current_world_index += 1;
        let index = self.context.current_world_index;

        self.drain_buffers(index)?;
        self.sweep_thinkers();

        let display = self.context.display_player;
        if display != self.context.console_player
            && self.world.clients.get(display).is_none_or(|c| c.spectating)
        {
            self.context.display_player = self.context.console_player;
        }

        self.prediction
            .store_mut()
            .carry_sectors_forward(index, &self.world.sectors);

        if self.context.in_level && self.context.synced && !self.context.demo_playback {
            self.commands
                .record_local(index, &self.input, self.context.console_active);
            self.send_commands(index)?;
        }

        let local = self.local_actor();
        self.rules.tick_world(&mut self.world, local, &mut self.effects);
        if !self.prediction.is_enabled() {
            self.advance_thinkers_live(index);
        }

        self.world.gametic = self.world.gametic.wrapping_add(1);
        self.stats.worlds_run += 1;
        Ok(())
    }

    fn drain_buffers(&mut self, index: u32) -> Result<(), SyncError> {
        let due: Vec<NetMessage> = self
            .sector_positions
            .take_through(index)
            .into_iter()
            .chain(self.thinker_statuses.take_through(index))
            .chain(self.reorder.take_through(index))
            .collect();
        for message in due {
            self.dispatch(message)?;
        }
        Ok(())
    }

    fn send_commands(&mut self, index: u32) -> Result<(), SyncError> {
        let commands = self.commands.bundle(index, self.config.command_bundle_size);
        let message = NetMessage::new(
            index,
            Message::PlayerCommand {
                client_number: self.context.console_player as u32,
                commands,
            },
        );
        self.transport
            .send(Channel::Unsequenced, &message.encode(), Reliability::Unreliable)?;
        self.stats.commands_sent += 1;
        Ok(())
    }

    fn advance_thinkers_live(&mut self, index: u32) {
        let World {
            sectors,
            thinkers,
            predicted_thinkers,
            ..
        } = &mut self.world;
        for registry in [thinkers, predicted_thinkers] {
            for (_, thinker) in registry.iter_mut() {
                if !thinker.is_active_at(index) {
                    continue;
                }
                if let Some(sector) = sectors.get_mut(thinker.sector) {
                    thinker.think(index, sector, SimulationMode::Live, &mut self.effects);
                }
            }
        }
    }

    /// Round trip time in whole steps.
    fn rtt_tics(&self) -> u32 {
        let rtt_ms = self.transport.stats().rtt_ms;
        (rtt_ms * self.config.tic_rate as f32 / 1000.0) as u32
    }
}
