mod config;
mod server;

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use ticsync::fixed::from_int;
use ticsync::simulation::Buttons;
use ticsync::thinker::DoorStatus;
use ticsync::{
    BasicRules, InputState, MemoryEndpoint, PacketBufferSize, PacketLossSimulation, Sector,
    SyncClient, SyncConfig, ThinkerStatus, World, memory_pair,
};

use config::LoopbackConfig;
use server::LoopbackServer;

#[derive(Parser)]
#[command(name = "loopback")]
#[command(about = "Runs a scripted client against an in-process server and checks they agree")]
struct Args {
    #[arg(short, long, default_value_t = 1500)]
    frames: u32,

    #[arg(long, default_value_t = 10, help = "Simulated frame length in ms")]
    frame_ms: u64,

    #[arg(short, long, default_value_t = 0x5eed)]
    seed: u64,

    #[arg(long, help = "Enable packet loss and latency simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Fraction of unreliable packets dropped (0-1)")]
    loss: f32,

    #[arg(long, default_value_t = 0, help = "Minimum one-way latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum one-way latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,

    #[arg(long, default_value_t = 0, help = "0 adaptive, 1 disabled, otherwise a fixed step count")]
    packet_buffer: u32,

    #[arg(long, help = "Never run more than one step behind; fast-forward instead")]
    constant_prediction: bool,

    #[arg(long)]
    no_prediction: bool,
}

fn build_world() -> World {
    World::new(vec![
        // open room the player walks around in
        Sector::new(0, from_int(128)),
        // closed door
        Sector::new(0, 0),
        Sector::new(from_int(24), from_int(152)),
    ])
}

/// The input the scripted player holds during `frame` of `total`.
fn scripted_input(frame: u32, total: u32) -> InputState {
    let phase = frame * 100 / total.max(1);
    match phase {
        0..20 => InputState {
            forward: 1.0,
            ..Default::default()
        },
        20..35 => InputState {
            forward: 1.0,
            turn: 0.25,
            run: true,
            ..Default::default()
        },
        35..38 => InputState {
            jump: true,
            ..Default::default()
        },
        40..45 => InputState {
            use_key: true,
            ..Default::default()
        },
        _ => InputState::default(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let loopback = LoopbackConfig {
        rng_seed: args.seed,
        packet_loss: PacketLossSimulation {
            enabled: args.simulate_packet_loss,
            loss_percent: args.loss,
            min_latency_ms: args.min_latency,
            max_latency_ms: args.max_latency,
            jitter_ms: args.jitter,
        },
        ..Default::default()
    };
    let sync = SyncConfig {
        tic_rate: loopback.tic_rate,
        prediction: !args.no_prediction,
        constant_prediction: args.constant_prediction,
        ..Default::default()
    };
    let sync = SyncConfig {
        packet_buffer: PacketBufferSize::from_raw(args.packet_buffer, sync.max_positions()),
        ..sync
    };

    let (client_end, server_end) = memory_pair(loopback.packet_loss.clone(), args.seed);
    let mut server = LoopbackServer::new(server_end, build_world(), loopback.clone());
    let mut client = SyncClient::new(client_end, BasicRules::new(), build_world(), sync)?;

    log::info!(
        "running {} frames of {} ms (prediction {}, packet buffer {})",
        args.frames,
        args.frame_ms,
        !args.no_prediction,
        args.packet_buffer
    );

    let frame = Duration::from_millis(args.frame_ms);
    for number in 0..args.frames {
        let input = scripted_input(number, args.frames);
        let using = input.use_key;
        client.set_input(input);

        client.transport().advance(frame);
        server.update(frame)?;
        let ran = client.update(frame)?;

        if using && ran > 0 {
            open_door(&mut client, &loopback)?;
        }
        client.effects_mut().drain().count();
        client.effects_mut().drain_announcements().count();
    }

    report(&client, &server, &loopback)
}

/// Predicts the door the server opens for a command carrying the use button.
fn open_door(
    client: &mut SyncClient<MemoryEndpoint, BasicRules>,
    config: &LoopbackConfig,
) -> Result<()> {
    let current = client.context().current_world_index;
    let pressed = client
        .commands()
        .get_exact(current)
        .is_some_and(|command| command.buttons.contains(Buttons::USE));
    let Some(sector) = client.world().sectors.get(config.door_sector) else {
        return Ok(());
    };
    if !pressed {
        return Ok(());
    }
    let status = ThinkerStatus::Door(DoorStatus::raise(
        sector.floor_height + from_int(config.door_height),
    ));
    if let Some(id) = client.predict_activation(config.door_sector, status, 0)? {
        log::debug!("predicted door {} at command {}", id, current);
    }
    Ok(())
}

fn report(
    client: &SyncClient<MemoryEndpoint, BasicRules>,
    server: &LoopbackServer,
    config: &LoopbackConfig,
) -> Result<()> {
    let stats = client.stats();
    log::info!(
        "client ran {} worlds, server at world {} (last command {})",
        stats.worlds_run,
        server.world_index(),
        server.last_command_run()
    );
    log::info!(
        "{} replays, {} mispredictions, {} fast-forwards, {} expired activations",
        stats.replays,
        stats.mispredictions,
        stats.fast_forwards,
        stats.thinkers_expired
    );
    log::info!(
        "{} messages received, {} discarded, {} command bundles sent",
        stats.messages_received,
        stats.messages_discarded,
        stats.commands_sent
    );

    let player = client.context().console_player;
    let (Some(ours), Some(theirs)) = (
        client.world().player_actor(player),
        server.world().player_actor(player),
    ) else {
        bail!("player never spawned on both ends");
    };
    if ours.position != theirs.position {
        bail!(
            "player diverged: client at {:?}, server at {:?}",
            ours.position,
            theirs.position
        );
    }

    let door = config.door_sector;
    let ours = client.world().sectors.get(door).map(|s| s.ceiling_height);
    let theirs = server.world().sectors.get(door).map(|s| s.ceiling_height);
    if ours != theirs {
        bail!("door sector diverged: client {:?}, server {:?}", ours, theirs);
    }
    log::info!("client and server agree on the player and the door");
    Ok(())
}
