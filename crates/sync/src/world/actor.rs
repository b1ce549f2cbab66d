use bitflags::bitflags;
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::fixed::{Angle, Fixed, from_int};
use crate::netid::{NetId, NetIdentified};

pub const PLAYER_RADIUS: Fixed = from_int(16);
pub const PLAYER_HEIGHT: Fixed = from_int(56);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ActorFlags: u32 {
        const SOLID = 1 << 0;
        const SHOOTABLE = 1 << 1;
        const NO_GRAVITY = 1 << 2;
        const MISSILE = 1 << 3;
        const CORPSE = 1 << 4;
        const FLOAT = 1 << 5;
        const PICKUP = 1 << 6;
        const SPECTATOR = 1 << 7;
        const AWAKE = 1 << 8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum ActorKind {
    #[default]
    Player = 0,
    Monster = 1,
    Missile = 2,
    Item = 3,
    Decoration = 4,
}

impl From<i32> for ActorKind {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Player,
            1 => Self::Monster,
            2 => Self::Missile,
            3 => Self::Item,
            _ => Self::Decoration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub net_id: NetId,
    pub kind: ActorKind,
    pub position: IVec3,
    pub momentum: IVec3,
    pub angle: Angle,
    pub sector: usize,
    pub floor_z: Fixed,
    pub ceiling_z: Fixed,
    pub flags: ActorFlags,
    pub floatbob: i32,
    pub health: i32,
    pub state: i32,
    pub target: NetId,
}

impl Actor {
    pub fn new(kind: ActorKind, position: IVec3, sector: usize) -> Self {
        Self {
            net_id: NetId::NONE,
            kind,
            position,
            momentum: IVec3::ZERO,
            angle: 0,
            sector,
            floor_z: position.z,
            ceiling_z: position.z.saturating_add(PLAYER_HEIGHT),
            flags: ActorFlags::SOLID | ActorFlags::SHOOTABLE,
            floatbob: 0,
            health: 100,
            state: 0,
            target: NetId::NONE,
        }
    }

    pub fn on_ground(&self) -> bool {
        self.position.z <= self.floor_z
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0 || self.flags.contains(ActorFlags::CORPSE)
    }
}

impl NetIdentified for Actor {
    fn net_id(&self) -> NetId {
        self.net_id
    }

    fn set_net_id(&mut self, id: NetId) {
        self.net_id = id;
    }
}
