use crate::effects::{Effects, SimulationMode};
use crate::simulation::{Command, CommandBuffer, GameRules};
use crate::snapshot::{PlayerPosition, SnapshotStore};
use crate::world::World;

/// Everything a prediction step reads or writes, borrowed from the client for one call.
pub struct Simulation<'a> {
    pub world: &'a mut World,
    pub commands: &'a CommandBuffer,
    pub rules: &'a dyn GameRules,
    pub effects: &'a mut Effects,
    pub console_player: usize,
}

impl Simulation<'_> {
    fn spectating(&self) -> bool {
        self.world
            .clients
            .get(self.console_player)
            .is_some_and(|client| client.spectating)
    }
}

/// Rolls the local player and sector thinkers back to the newest server-confirmed
/// step and re-simulates forward to the present.
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    enabled: bool,
    store: SnapshotStore,
    last_server_command_index: u32,
    last_server_position: Option<PlayerPosition>,
    replays: u64,
    mispredictions: u64,
}

impl PredictionEngine {
    pub fn new(sector_count: usize, capacity: usize, enabled: bool) -> Self {
        Self {
            enabled,
            store: SnapshotStore::new(sector_count, capacity),
            last_server_command_index: 0,
            last_server_position: None,
            replays: 0,
            mispredictions: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SnapshotStore {
        &mut self.store
    }

    pub fn last_server_command_index(&self) -> u32 {
        self.last_server_command_index
    }

    pub fn last_server_position(&self) -> Option<&PlayerPosition> {
        self.last_server_position.as_ref()
    }

    /// Number of prediction passes that actually simulated something.
    pub fn replays(&self) -> u64 {
        self.replays
    }

    pub fn mispredictions(&self) -> u64 {
        self.mispredictions
    }

    pub fn reset(&mut self, sector_count: usize) {
        self.store.reset(sector_count);
        self.last_server_command_index = 0;
        self.last_server_position = None;
    }

    /// Takes the server's position of the local player after it ran `command_index`.
    /// Returns false for a report older than the current anchor.
    pub fn absorb(&mut self, command_index: u32, position: PlayerPosition) -> bool {
        if command_index < self.last_server_command_index {
            log::trace!(
                "stale position for command {} (anchor {})",
                command_index,
                self.last_server_command_index
            );
            return false;
        }
        if let Some(predicted) = self.store.player_at(command_index) {
            if !predicted.same_state(&position) {
                self.mispredictions += 1;
                log::debug!(
                    "misprediction at command {}: predicted {:?}, server {:?}",
                    command_index,
                    predicted.origin(),
                    position.origin()
                );
            }
        }
        self.last_server_command_index = command_index;
        self.last_server_position = Some(position);
        true
    }

    /// Brings the local simulation up to `latest`. Steps between the anchor and
    /// `latest` are replayed silently and `latest` itself runs live.
    pub fn predict(&mut self, latest: u32, sim: &mut Simulation<'_>) -> bool {
        if !self.enabled {
            return false;
        }
        let anchor = self.last_server_command_index;
        if latest <= anchor {
            return false;
        }
        self.replays += 1;

        let window = (latest - anchor) as usize;
        match self.last_server_position {
            Some(position) if window < self.store.capacity() => {
                self.rewind(anchor, position, sim);
                for index in anchor + 1..latest {
                    self.step(index, SimulationMode::Replaying, sim);
                }
            }
            Some(_) => log::debug!(
                "prediction window of {} steps exceeds history, running newest step only",
                window
            ),
            None => {}
        }
        self.step(latest, SimulationMode::Live, sim);
        true
    }

    fn rewind(&mut self, anchor: u32, position: PlayerPosition, sim: &mut Simulation<'_>) {
        if !sim.spectating() {
            if let Some((player, actor)) = sim.world.player_and_actor_mut(sim.console_player) {
                position.apply(player, actor);
            }
        }
        let world = &mut *sim.world;
        for (_, thinker) in world
            .thinkers
            .iter_mut()
            .chain(world.predicted_thinkers.iter_mut())
        {
            thinker.rewind(anchor);
        }
        self.store.load_sectors(anchor, &mut world.sectors);
    }

    fn step(&mut self, index: u32, mode: SimulationMode, sim: &mut Simulation<'_>) {
        let spectating = sim.spectating();
        let World {
            sectors,
            thinkers,
            predicted_thinkers,
            players,
            actors,
            ..
        } = &mut *sim.world;

        for registry in [thinkers, predicted_thinkers] {
            for (_, thinker) in registry.iter_mut() {
                if !thinker.is_active_at(index) {
                    continue;
                }
                let Some(sector) = sectors.get_mut(thinker.sector) else {
                    continue;
                };
                match mode {
                    SimulationMode::Live => thinker.predict(index, sector, sim.effects),
                    _ => thinker.re_predict(index, sector, sim.effects),
                };
            }
        }

        for (number, sector) in sectors.iter_mut().enumerate() {
            if !sector.has_thinker() {
                continue;
            }
            let confirmed = self
                .store
                .sector_at(index, number)
                .filter(|slot| slot.confirmed)
                .map(|slot| slot.position);
            match confirmed {
                Some(position) => position.apply(sector),
                None => {
                    self.store.save_sector(index, number, sector);
                }
            }
        }

        if spectating {
            return;
        }
        let Some(player) = players.get_mut(sim.console_player) else {
            return;
        };
        let Some(actor) = player.actor.and_then(|id| actors.get_mut(id)) else {
            return;
        };
        let command = sim
            .commands
            .get_exact(index)
            .copied()
            .unwrap_or_else(|| Command::blank(index));
        sim.rules
            .run_player(player, actor, &command, sectors.as_slice(), mode, sim.effects);
        self.store.save_player(index, player, actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::from_int;
    use crate::simulation::{BasicRules, Buttons};
    use crate::world::{Actor, ActorKind, Sector};
    use glam::IVec3;

    struct Fixture {
        world: World,
        commands: CommandBuffer,
        rules: BasicRules,
        effects: Effects,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = World::new(vec![Sector::new(0, from_int(128))]);
            let id = world
                .actors
                .add(Actor::new(ActorKind::Player, IVec3::ZERO, 0))
                .unwrap();
            world.players[0].actor = Some(id);
            world.players[0].in_game = true;
            Self {
                world,
                commands: CommandBuffer::new(64),
                rules: BasicRules::new(),
                effects: Effects::new(),
            }
        }

        fn command(&mut self, index: u32, buttons: Buttons) {
            self.commands.store(Command {
                world_index: index,
                forward_move: 25,
                buttons,
                ..Default::default()
            });
        }

        fn sim(&mut self) -> Simulation<'_> {
            Simulation {
                world: &mut self.world,
                commands: &self.commands,
                rules: &self.rules,
                effects: &mut self.effects,
                console_player: 0,
            }
        }

        fn position(&self) -> IVec3 {
            self.world.player_actor(0).unwrap().position
        }
    }

    #[test]
    fn without_anchor_only_newest_step_runs() {
        let mut fixture = Fixture::new();
        let mut engine = PredictionEngine::new(1, 64, true);
        fixture.command(1, Buttons::JUMP);

        assert!(engine.predict(1, &mut fixture.sim()));
        assert_eq!(engine.replays(), 1);
        assert!(engine.store().player_at(1).is_some());
        assert_eq!(fixture.effects.pending(), 1);
    }

    #[test]
    fn disabled_or_caught_up_does_nothing() {
        let mut fixture = Fixture::new();
        let mut engine = PredictionEngine::new(1, 64, false);
        assert!(!engine.predict(3, &mut fixture.sim()));

        engine.set_enabled(true);
        engine.absorb(5, PlayerPosition::default());
        assert!(!engine.predict(5, &mut fixture.sim()));
        assert_eq!(engine.replays(), 0);
    }

    #[test]
    fn replay_from_anchor_is_silent_until_the_newest_step() {
        let mut fixture = Fixture::new();
        let mut engine = PredictionEngine::new(1, 64, true);
        for i in 1..=4 {
            fixture.command(i, Buttons::JUMP);
            engine.predict(i, &mut fixture.sim());
        }
        let predicted = fixture.position();
        fixture.effects.drain().count();

        let server = *engine.store().player_at(2).unwrap();
        assert!(engine.absorb(2, server));
        assert_eq!(engine.mispredictions(), 0);

        fixture.command(5, Buttons::empty());
        engine.predict(5, &mut fixture.sim());
        // 3 and 4 replayed silently, 5 has no jump
        assert_eq!(fixture.effects.pending(), 0);
        assert!(fixture.position().x > predicted.x);
    }

    #[test]
    fn server_disagreement_counts_a_misprediction() {
        let mut fixture = Fixture::new();
        let mut engine = PredictionEngine::new(1, 64, true);
        fixture.command(1, Buttons::empty());
        engine.predict(1, &mut fixture.sim());

        let mut server = *engine.store().player_at(1).unwrap();
        server.position[0] += from_int(4);
        engine.absorb(1, server);
        assert_eq!(engine.mispredictions(), 1);
        assert!(!engine.absorb(0, server));
        assert_eq!(engine.last_server_command_index(), 1);
    }
}
