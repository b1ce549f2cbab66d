use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::{FRACUNIT, Fixed};
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

pub const FLOOR_SPEED: Fixed = FRACUNIT;
pub const NO_TEXTURE_CHANGE: i32 = -1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct FloorStatus {
    pub floor_type: i32,
    pub crush: i32,
    pub direction: i32,
    pub floor_dest_height: i32,
    pub speed: i32,
    pub texture: i32,
    pub reset_time: i32,
    pub reset_height: i32,
}

impl FloorStatus {
    pub fn moving_to(dest: Fixed, direction: i32) -> Self {
        Self {
            floor_type: 0,
            crush: 0,
            direction,
            floor_dest_height: dest,
            speed: FLOOR_SPEED,
            texture: NO_TEXTURE_CHANGE,
            reset_time: 0,
            reset_height: 0,
        }
    }
}

pub fn think(
    floor: &mut FloorStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    let result = move_plane(
        sector,
        Plane::Floor,
        floor.speed,
        floor.floor_dest_height,
        floor.crush != 0,
        floor.direction,
    );
    if result != PlaneResult::PastDest {
        return ThinkOutcome::Continue;
    }
    if floor.texture != NO_TEXTURE_CHANGE {
        sector.floor_pic = floor.texture;
    }
    cx.sound(Sound::StoneMove);
    ThinkOutcome::Finished
}
