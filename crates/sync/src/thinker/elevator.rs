use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::{FRACUNIT, Fixed};
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

pub const ELEVATOR_SPEED: Fixed = 4 * FRACUNIT;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ElevatorStatus {
    pub elevator_type: i32,
    pub direction: i32,
    pub floor_dest_height: i32,
    pub ceiling_dest_height: i32,
    pub speed: i32,
}

impl ElevatorStatus {
    /// Moves the whole sector so that its floor ends at `floor_dest`.
    pub fn to_floor(sector: &Sector, floor_dest: Fixed) -> Self {
        let offset = floor_dest.saturating_sub(sector.floor_height);
        Self {
            elevator_type: 0,
            direction: offset.signum(),
            floor_dest_height: floor_dest,
            ceiling_dest_height: sector.ceiling_height.saturating_add(offset),
            speed: ELEVATOR_SPEED,
        }
    }
}

pub fn think(
    elevator: &mut ElevatorStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    let direction = elevator.direction;
    let (first, first_dest, second, second_dest) = if direction < 0 {
        (Plane::Floor, elevator.floor_dest_height, Plane::Ceiling, elevator.ceiling_dest_height)
    } else {
        (Plane::Ceiling, elevator.ceiling_dest_height, Plane::Floor, elevator.floor_dest_height)
    };

    let result = move_plane(sector, first, elevator.speed, first_dest, false, direction);
    if result == PlaneResult::Crushed {
        return ThinkOutcome::Continue;
    }
    let trailing = move_plane(sector, second, elevator.speed, second_dest, false, direction);
    if result == PlaneResult::PastDest && trailing == PlaneResult::PastDest {
        cx.sound(Sound::PlatformStop);
        return ThinkOutcome::Finished;
    }
    ThinkOutcome::Continue
}
