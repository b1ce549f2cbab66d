use glam::IVec3;

use crate::effects::{Effects, SimulationMode, Sound};
use crate::fixed::{
    ANG90, Angle, FINEANGLES, FRACUNIT, Fixed, fine_cosine, fine_sine, fixed_mul, from_int,
};
use crate::netid::NetId;
use crate::world::{
    Actor, ActorFlags, PLAYER_HEIGHT, Player, PlayerState, Sector, VIEW_HEIGHT, World,
};

use super::command::{Buttons, Command};

pub const GRAVITY: Fixed = FRACUNIT;
pub const FRICTION: Fixed = 0xe800;
pub const STOP_SPEED: Fixed = 0x1000;
pub const MAX_MOMENTUM: Fixed = from_int(30);
pub const MAX_BOB: Fixed = 0x10_0000;
pub const JUMP_MOMENTUM: Fixed = from_int(8);
pub const JUMP_DELAY: i32 = 18;
const MOVE_SCALE: i32 = 2048;
const MAX_PITCH: i32 = 32 * 0x10000;

/// Deterministic game logic the sync core drives but does not define.
pub trait GameRules {
    /// Runs one step of player thinking and movement for `command`.
    fn run_player(
        &self,
        player: &mut Player,
        actor: &mut Actor,
        command: &Command,
        sectors: &[Sector],
        mode: SimulationMode,
        effects: &mut Effects,
    );

    /// Runs one step of everything the prediction engine does not own.
    fn tick_world(&mut self, world: &mut World, local: Option<NetId>, effects: &mut Effects);
}

/// Doom-style fixed-point movement used by the loopback harness and the tests.
#[derive(Debug, Clone, Default)]
pub struct BasicRules;

impl BasicRules {
    pub fn new() -> Self {
        Self
    }

    fn thrust(actor: &mut Actor, angle: Angle, amount: Fixed) {
        actor.momentum.x = actor.momentum.x.wrapping_add(fixed_mul(amount, fine_cosine(angle)));
        actor.momentum.y = actor.momentum.y.wrapping_add(fixed_mul(amount, fine_sine(angle)));
    }

    fn clip_to_sector(actor: &mut Actor, sectors: &[Sector]) {
        if let Some(sector) = sectors.get(actor.sector) {
            actor.floor_z = sector.floor_height;
            actor.ceiling_z = sector.ceiling_height;
        }
    }

    fn xy_movement(actor: &mut Actor, has_input: bool) {
        actor.momentum.x = actor.momentum.x.clamp(-MAX_MOMENTUM, MAX_MOMENTUM);
        actor.momentum.y = actor.momentum.y.clamp(-MAX_MOMENTUM, MAX_MOMENTUM);
        actor.position.x = actor.position.x.wrapping_add(actor.momentum.x);
        actor.position.y = actor.position.y.wrapping_add(actor.momentum.y);

        if !actor.on_ground() {
            return;
        }
        if !has_input
            && actor.momentum.x.abs() < STOP_SPEED
            && actor.momentum.y.abs() < STOP_SPEED
        {
            actor.momentum.x = 0;
            actor.momentum.y = 0;
        } else {
            actor.momentum.x = fixed_mul(actor.momentum.x, FRICTION);
            actor.momentum.y = fixed_mul(actor.momentum.y, FRICTION);
        }
    }

    /// Returns the impact momentum when the actor lands this step.
    fn z_movement(actor: &mut Actor) -> Option<Fixed> {
        let mut landed = None;
        if actor.position.z > actor.floor_z && !actor.flags.contains(ActorFlags::NO_GRAVITY) {
            actor.momentum.z = actor.momentum.z.saturating_sub(GRAVITY);
        }
        actor.position.z = actor.position.z.wrapping_add(actor.momentum.z);

        if actor.position.z <= actor.floor_z {
            if actor.momentum.z < 0 {
                landed = Some(actor.momentum.z);
                actor.momentum.z = 0;
            }
            actor.position.z = actor.floor_z;
        }

        let top = actor.ceiling_z.saturating_sub(PLAYER_HEIGHT);
        if actor.position.z > top && top >= actor.floor_z {
            actor.position.z = top;
            actor.momentum.z = actor.momentum.z.min(0);
        }
        landed
    }

    fn calc_height(player: &mut Player, actor: &Actor, phase: u32) {
        let bob = fixed_mul(actor.momentum.x, actor.momentum.x)
            .saturating_add(fixed_mul(actor.momentum.y, actor.momentum.y))
            >> 2;
        player.bob = bob.min(MAX_BOB);

        if player.state == PlayerState::Live {
            player.view_height = player.view_height.saturating_add(player.delta_view_height);
            if player.view_height > VIEW_HEIGHT {
                player.view_height = VIEW_HEIGHT;
                player.delta_view_height = 0;
            }
            if player.view_height < VIEW_HEIGHT / 2 {
                player.view_height = VIEW_HEIGHT / 2;
                if player.delta_view_height <= 0 {
                    player.delta_view_height = 1;
                }
            }
            if player.delta_view_height != 0 {
                player.delta_view_height = player.delta_view_height.saturating_add(FRACUNIT / 4);
                if player.delta_view_height == 0 {
                    player.delta_view_height = 1;
                }
            }
        }

        let fine = (FINEANGLES as u32 / 20).wrapping_mul(phase) & (FINEANGLES as u32 - 1);
        let offset = fixed_mul(player.bob / 2, fine_sine(fine << 19));
        player.view_z = actor
            .position
            .z
            .saturating_add(player.view_height)
            .saturating_add(offset)
            .min(actor.ceiling_z.saturating_sub(4 * FRACUNIT));
    }
}

impl GameRules for BasicRules {
    fn run_player(
        &self,
        player: &mut Player,
        actor: &mut Actor,
        command: &Command,
        sectors: &[Sector],
        mode: SimulationMode,
        effects: &mut Effects,
    ) {
        Self::clip_to_sector(actor, sectors);

        if player.state != PlayerState::Live {
            Self::z_movement(actor);
            Self::calc_height(player, actor, command.world_index);
            return;
        }

        actor.angle = actor
            .angle
            .wrapping_add(((command.angle_turn as i32) << 16) as u32);
        player.pitch = (player.pitch - ((command.look as i32) << 4)).clamp(-MAX_PITCH, MAX_PITCH);

        let on_ground = actor.on_ground();
        if on_ground {
            if command.forward_move != 0 {
                Self::thrust(actor, actor.angle, command.forward_move as i32 * MOVE_SCALE);
            }
            if command.side_move != 0 {
                Self::thrust(
                    actor,
                    actor.angle.wrapping_sub(ANG90),
                    command.side_move as i32 * MOVE_SCALE,
                );
            }
        }

        if player.jump_time > 0 {
            player.jump_time -= 1;
        }
        if command.buttons.contains(Buttons::JUMP) && on_ground && player.jump_time == 0 {
            actor.momentum.z = JUMP_MOMENTUM;
            player.jump_time = JUMP_DELAY;
            effects.sound(mode, Some(actor.net_id), Sound::PlayerJump);
        }

        let has_input = command.forward_move != 0 || command.side_move != 0;
        Self::xy_movement(actor, has_input);
        if let Some(impact) = Self::z_movement(actor) {
            if impact < -GRAVITY * 8 {
                player.delta_view_height = impact >> 3;
                effects.sound(mode, Some(actor.net_id), Sound::PlayerLand);
            }
        }
        Self::calc_height(player, actor, command.world_index);
    }

    fn tick_world(&mut self, world: &mut World, local: Option<NetId>, _effects: &mut Effects) {
        world.leveltime = world.leveltime.wrapping_add(1);

        let World { actors, sectors, .. } = world;
        for (id, actor) in actors.iter_mut() {
            if Some(id) == local || actor.momentum == IVec3::ZERO {
                continue;
            }
            Self::clip_to_sector(actor, sectors);
            actor.position = actor.position.wrapping_add(actor.momentum);
            if actor.position.z < actor.floor_z && !actor.flags.contains(ActorFlags::MISSILE) {
                actor.position.z = actor.floor_z;
            }
        }
    }
}
