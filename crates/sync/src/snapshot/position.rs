use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::world::{Actor, ActorFlags, Player, PlayerState, Sector};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PlayerPosition {
    pub world_index: u32,
    pub position: [i32; 3],
    pub momentum: [i32; 3],
    pub angle: u32,
    pub pitch: i32,
    pub floor_z: i32,
    pub ceiling_z: i32,
    pub flags: u32,
    pub bob: i32,
    pub view_z: i32,
    pub view_height: i32,
    pub delta_view_height: i32,
    pub jump_time: i32,
    pub player_state: i32,
}

impl PlayerPosition {
    pub fn capture(world_index: u32, player: &Player, actor: &Actor) -> Self {
        Self {
            world_index,
            position: actor.position.to_array(),
            momentum: actor.momentum.to_array(),
            angle: actor.angle,
            pitch: player.pitch,
            floor_z: actor.floor_z,
            ceiling_z: actor.ceiling_z,
            flags: actor.flags.bits(),
            bob: player.bob,
            view_z: player.view_z,
            view_height: player.view_height,
            delta_view_height: player.delta_view_height,
            jump_time: player.jump_time,
            player_state: player.state as i32,
        }
    }

    pub fn apply(&self, player: &mut Player, actor: &mut Actor) {
        actor.position = IVec3::from_array(self.position);
        actor.momentum = IVec3::from_array(self.momentum);
        actor.angle = self.angle;
        actor.floor_z = self.floor_z;
        actor.ceiling_z = self.ceiling_z;
        actor.flags = ActorFlags::from_bits_retain(self.flags);
        player.pitch = self.pitch;
        player.bob = self.bob;
        player.view_z = self.view_z;
        player.view_height = self.view_height;
        player.delta_view_height = self.delta_view_height;
        player.jump_time = self.jump_time;
        player.state = PlayerState::from(self.player_state);
    }

    /// Equality of everything except the step the snapshot was taken at.
    pub fn same_state(&self, other: &PlayerPosition) -> bool {
        Self {
            world_index: other.world_index,
            ..*self
        } == *other
    }

    pub fn matches(&self, player: &Player, actor: &Actor) -> bool {
        self.same_state(&Self::capture(self.world_index, player, actor))
    }

    pub fn origin(&self) -> IVec3 {
        IVec3::from_array(self.position)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorPosition {
    pub world_index: u32,
    pub position: [i32; 3],
    pub momentum: [i32; 3],
    pub angle: u32,
    pub floatbob: i32,
}

impl ActorPosition {
    pub fn capture(world_index: u32, actor: &Actor) -> Self {
        Self {
            world_index,
            position: actor.position.to_array(),
            momentum: actor.momentum.to_array(),
            angle: actor.angle,
            floatbob: actor.floatbob,
        }
    }

    pub fn apply(&self, actor: &mut Actor) {
        actor.position = IVec3::from_array(self.position);
        actor.momentum = IVec3::from_array(self.momentum);
        actor.angle = self.angle;
        actor.floatbob = self.floatbob;
    }

    pub fn same_state(&self, other: &ActorPosition) -> bool {
        Self {
            world_index: other.world_index,
            ..*self
        } == *other
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct SectorPosition {
    pub world_index: u32,
    pub ceiling_height: i32,
    pub floor_height: i32,
}

impl SectorPosition {
    pub fn capture(world_index: u32, sector: &Sector) -> Self {
        Self {
            world_index,
            ceiling_height: sector.ceiling_height,
            floor_height: sector.floor_height,
        }
    }

    pub fn apply(&self, sector: &mut Sector) {
        sector.ceiling_height = self.ceiling_height;
        sector.floor_height = self.floor_height;
    }

    pub fn same_heights(&self, other: &SectorPosition) -> bool {
        self.ceiling_height == other.ceiling_height && self.floor_height == other.floor_height
    }

    pub fn restamped(&self, world_index: u32) -> Self {
        Self {
            world_index,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::from_int;
    use crate::world::ActorKind;

    #[test]
    fn player_position_round_trip() {
        let mut player = Player {
            bob: 12,
            jump_time: 4,
            ..Default::default()
        };
        let mut actor = Actor::new(ActorKind::Player, IVec3::new(1, 2, 3), 0);
        actor.momentum = IVec3::new(5, 6, 7);
        let snapshot = PlayerPosition::capture(10, &player, &actor);

        actor.position = IVec3::ZERO;
        player.bob = 0;
        player.state = PlayerState::Dead;
        assert!(!snapshot.matches(&player, &actor));

        snapshot.apply(&mut player, &mut actor);
        assert!(snapshot.matches(&player, &actor));
        assert_eq!(actor.position, IVec3::new(1, 2, 3));
        assert_eq!(player.state, PlayerState::Live);
    }

    #[test]
    fn sector_equality_ignores_index() {
        let sector = Sector::new(0, from_int(64));
        let a = SectorPosition::capture(3, &sector);
        let b = SectorPosition::capture(9, &sector);
        assert!(a.same_heights(&b));
        assert_ne!(a, b);
        assert_eq!(a.restamped(9), b);
    }

    #[test]
    fn layouts_have_no_padding() {
        assert_eq!(std::mem::size_of::<SectorPosition>(), 12);
        assert_eq!(std::mem::size_of::<ActorPosition>(), 36);
        assert_eq!(std::mem::size_of::<PlayerPosition>(), 72);
    }
}
