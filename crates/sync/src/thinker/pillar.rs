use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::Fixed;
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PillarStatus {
    pub ceiling_speed: i32,
    pub floor_speed: i32,
    pub floor_dest: i32,
    pub ceiling_dest: i32,
    pub direction: i32,
    pub crush: i32,
}

impl PillarStatus {
    /// Closes the sector so floor and ceiling meet at `height`.
    pub fn build(sector: &Sector, height: Fixed, speed: Fixed) -> Self {
        let floor_travel = height.saturating_sub(sector.floor_height).saturating_abs();
        let ceiling_travel = sector.ceiling_height.saturating_sub(height).saturating_abs();
        let longest = floor_travel.max(ceiling_travel).max(1);
        Self {
            floor_speed: scaled_speed(speed, floor_travel, longest),
            ceiling_speed: scaled_speed(speed, ceiling_travel, longest),
            floor_dest: height,
            ceiling_dest: height,
            direction: 1,
            crush: 0,
        }
    }
}

fn scaled_speed(speed: Fixed, travel: Fixed, longest: Fixed) -> Fixed {
    ((speed as i64 * travel as i64) / longest as i64).max(1) as Fixed
}

pub fn think(
    pillar: &mut PillarStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    let crush = pillar.crush != 0;
    let floor = move_plane(
        sector,
        Plane::Floor,
        pillar.floor_speed,
        pillar.floor_dest,
        crush,
        pillar.direction,
    );
    let ceiling = move_plane(
        sector,
        Plane::Ceiling,
        pillar.ceiling_speed,
        pillar.ceiling_dest,
        crush,
        -pillar.direction,
    );
    if floor == PlaneResult::PastDest && ceiling == PlaneResult::PastDest {
        cx.sound(Sound::StoneMove);
        return ThinkOutcome::Finished;
    }
    ThinkOutcome::Continue
}
