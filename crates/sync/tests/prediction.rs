use std::cell::RefCell;

use glam::IVec3;

use ticsync::fixed::from_int;
use ticsync::{
    Actor, ActorKind, BasicRules, Command, CommandBuffer, Effects, GameRules, InputState, NetId,
    Player, PlayerPosition, PredictionEngine, Sector, SimulationMode, World,
};
use ticsync::client::Simulation;

/// Basic movement that also remembers every command it ran and how.
#[derive(Default)]
struct RecordingRules {
    inner: BasicRules,
    runs: RefCell<Vec<(u32, SimulationMode)>>,
}

impl GameRules for RecordingRules {
    fn run_player(
        &self,
        player: &mut Player,
        actor: &mut Actor,
        command: &Command,
        sectors: &[Sector],
        mode: SimulationMode,
        effects: &mut Effects,
    ) {
        self.runs.borrow_mut().push((command.world_index, mode));
        self.inner
            .run_player(player, actor, command, sectors, mode, effects);
    }

    fn tick_world(&mut self, world: &mut World, local: Option<NetId>, effects: &mut Effects) {
        self.inner.tick_world(world, local, effects);
    }
}

const PLAYER_ID: u32 = 1;

fn world_with_player() -> World {
    let mut world = World::new(vec![Sector::new(0, from_int(128))]);
    let id = NetId::from_raw(PLAYER_ID);
    world
        .actors
        .insert_at(id, Actor::new(ActorKind::Player, IVec3::ZERO, 0))
        .unwrap();
    world.players[0] = Player {
        in_game: true,
        actor: Some(id),
        ..Player::default()
    };
    world
}

fn scripted_commands(count: u32) -> CommandBuffer {
    let mut commands = CommandBuffer::new(350);
    for index in 1..=count {
        let input = InputState {
            forward: 1.0,
            turn: if index % 7 == 0 { 0.5 } else { 0.0 },
            jump: index % 25 == 0,
            ..Default::default()
        };
        commands.store(input.to_command(index));
    }
    commands
}

fn capture(world: &mut World, index: u32) -> PlayerPosition {
    let (player, actor) = world.player_and_actor_mut(0).unwrap();
    PlayerPosition::capture(index, player, actor)
}

/// What the server would compute for the same commands, one entry per index.
fn authoritative_run(commands: &CommandBuffer, through: u32) -> Vec<PlayerPosition> {
    let mut world = world_with_player();
    let rules = BasicRules::new();
    let mut effects = Effects::new();
    let mut positions = vec![capture(&mut world, 0)];

    let World {
        players,
        actors,
        sectors,
        ..
    } = &mut world;
    let player = &mut players[0];
    let actor = actors.get_mut(NetId::from_raw(PLAYER_ID)).unwrap();
    for index in 1..=through {
        rules.run_player(
            player,
            actor,
            commands.get(index),
            sectors,
            SimulationMode::Live,
            &mut effects,
        );
        positions.push(PlayerPosition::capture(index, player, actor));
    }
    positions
}

#[test]
fn test_replays_unconfirmed_steps_then_runs_newest_live() {
    let mut world = world_with_player();
    let commands = scripted_commands(100);
    let rules = RecordingRules::default();
    let mut effects = Effects::new();
    let mut engine = PredictionEngine::new(1, 350, true);

    assert!(engine.absorb(97, capture(&mut world, 97)));
    let mut sim = Simulation {
        world: &mut world,
        commands: &commands,
        rules: &rules,
        effects: &mut effects,
        console_player: 0,
    };
    assert!(engine.predict(100, &mut sim));

    assert_eq!(
        *rules.runs.borrow(),
        vec![
            (98, SimulationMode::Replaying),
            (99, SimulationMode::Replaying),
            (100, SimulationMode::Live),
        ]
    );
    assert_eq!(engine.replays(), 1);
    assert!(engine.store().player_at(100).is_some());
}

#[test]
fn test_nothing_to_predict_when_caught_up() {
    let mut world = world_with_player();
    let commands = scripted_commands(10);
    let rules = RecordingRules::default();
    let mut effects = Effects::new();
    let mut engine = PredictionEngine::new(1, 350, true);
    assert!(engine.absorb(10, capture(&mut world, 10)));

    let mut sim = Simulation {
        world: &mut world,
        commands: &commands,
        rules: &rules,
        effects: &mut effects,
        console_player: 0,
    };
    assert!(!engine.predict(10, &mut sim));
    assert!(!engine.predict(9, &mut sim));

    engine.set_enabled(false);
    assert!(!engine.predict(20, &mut sim));
    assert!(rules.runs.borrow().is_empty());
    assert_eq!(engine.replays(), 0);
}

#[test]
fn test_stale_server_report_is_ignored() {
    let mut world = world_with_player();
    let mut engine = PredictionEngine::new(1, 350, true);
    assert!(engine.absorb(50, capture(&mut world, 50)));
    assert!(!engine.absorb(40, capture(&mut world, 40)));
    assert_eq!(engine.last_server_command_index(), 50);
    assert_eq!(engine.last_server_position().unwrap().world_index, 50);
}

#[test]
fn test_replay_reproduces_the_authoritative_result() {
    let commands = scripted_commands(60);
    let server = authoritative_run(&commands, 60);

    let mut world = world_with_player();
    let rules = BasicRules::new();
    let mut effects = Effects::new();
    let mut engine = PredictionEngine::new(1, 350, true);
    for index in 1..=60 {
        let mut sim = Simulation {
            world: &mut world,
            commands: &commands,
            rules: &rules,
            effects: &mut effects,
            console_player: 0,
        };
        assert!(engine.predict(index, &mut sim));
    }
    assert!(engine.store().player_at(60).unwrap().same_state(&server[60]));

    // a correct report costs a replay but changes nothing
    assert!(engine.absorb(40, server[40]));
    assert_eq!(engine.mispredictions(), 0);
    let mut sim = Simulation {
        world: &mut world,
        commands: &commands,
        rules: &rules,
        effects: &mut effects,
        console_player: 0,
    };
    assert!(engine.predict(60, &mut sim));
    assert!(capture(&mut world, 60).same_state(&server[60]));
    assert_eq!(engine.replays(), 61);
}

#[test]
fn test_misprediction_is_counted_and_corrected_from() {
    let commands = scripted_commands(60);
    let server = authoritative_run(&commands, 60);

    let mut world = world_with_player();
    let rules = BasicRules::new();
    let mut effects = Effects::new();
    let mut engine = PredictionEngine::new(1, 350, true);
    for index in 1..=60 {
        let mut sim = Simulation {
            world: &mut world,
            commands: &commands,
            rules: &rules,
            effects: &mut effects,
            console_player: 0,
        };
        engine.predict(index, &mut sim);
    }

    let mut shoved = server[45];
    shoved.position[0] += from_int(64);
    assert!(engine.absorb(45, shoved));
    assert_eq!(engine.mispredictions(), 1);

    let mut sim = Simulation {
        world: &mut world,
        commands: &commands,
        rules: &rules,
        effects: &mut effects,
        console_player: 0,
    };
    engine.predict(60, &mut sim);
    let predicted = capture(&mut world, 60);
    assert_eq!(predicted.position[0], server[60].position[0] + from_int(64));
    assert_eq!(predicted.position[1], server[60].position[1]);
}

#[test]
fn test_replayed_steps_make_no_noise() {
    let mut world = world_with_player();
    // every step jumps, but only one can leave the ground
    let mut commands = CommandBuffer::new(350);
    for index in 1..=10 {
        let input = InputState {
            jump: true,
            ..Default::default()
        };
        commands.store(input.to_command(index));
    }
    let rules = BasicRules::new();
    let mut effects = Effects::new();
    let mut engine = PredictionEngine::new(1, 350, true);
    assert!(engine.absorb(0, capture(&mut world, 0)));

    let mut sim = Simulation {
        world: &mut world,
        commands: &commands,
        rules: &rules,
        effects: &mut effects,
        console_player: 0,
    };
    engine.predict(1, &mut sim);
    assert_eq!(sim.effects.drain().count(), 1);

    engine.predict(5, &mut sim);
    assert_eq!(sim.effects.drain().count(), 0);
    assert!(sim.effects.suppressed() > 0);
}
