use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::{FRACUNIT, Fixed};
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

pub const CEILING_SPEED: Fixed = FRACUNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CeilingType {
    LowerToFloor = 0,
    RaiseToHighest = 1,
    LowerAndCrush = 2,
    CrushAndRaise = 3,
    FastCrushAndRaise = 4,
    SilentCrushAndRaise = 5,
}

impl CeilingType {
    pub fn from_raw(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::LowerToFloor,
            1 => Self::RaiseToHighest,
            2 => Self::LowerAndCrush,
            3 => Self::CrushAndRaise,
            4 => Self::FastCrushAndRaise,
            5 => Self::SilentCrushAndRaise,
            _ => return None,
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct CeilingStatus {
    pub ceiling_type: i32,
    pub bottom_height: i32,
    pub top_height: i32,
    pub speed: i32,
    pub old_speed: i32,
    pub crush: i32,
    pub direction: i32,
    pub old_direction: i32,
    pub tag: i32,
}

impl CeilingStatus {
    pub fn crusher(bottom_height: Fixed, top_height: Fixed) -> Self {
        Self {
            ceiling_type: CeilingType::CrushAndRaise as i32,
            bottom_height,
            top_height,
            speed: CEILING_SPEED,
            old_speed: CEILING_SPEED,
            crush: 1,
            direction: -1,
            old_direction: -1,
            tag: 0,
        }
    }
}

pub fn think(
    ceiling: &mut CeilingStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    let Some(ceiling_type) = CeilingType::from_raw(ceiling.ceiling_type) else {
        return ThinkOutcome::Finished;
    };
    let crushing = matches!(
        ceiling_type,
        CeilingType::CrushAndRaise | CeilingType::FastCrushAndRaise | CeilingType::SilentCrushAndRaise
    );

    match ceiling.direction {
        1 => {
            let result = move_plane(sector, Plane::Ceiling, ceiling.speed, ceiling.top_height, false, 1);
            if result == PlaneResult::PastDest {
                if crushing {
                    ceiling.direction = -1;
                    if ceiling_type != CeilingType::SilentCrushAndRaise {
                        cx.sound(Sound::StoneMove);
                    }
                } else {
                    return ThinkOutcome::Finished;
                }
            }
        }
        -1 => {
            let result = move_plane(
                sector,
                Plane::Ceiling,
                ceiling.speed,
                ceiling.bottom_height,
                ceiling.crush != 0,
                -1,
            );
            match result {
                PlaneResult::PastDest => match ceiling_type {
                    CeilingType::CrushAndRaise | CeilingType::SilentCrushAndRaise => {
                        ceiling.speed = ceiling.old_speed;
                        ceiling.direction = 1;
                    }
                    CeilingType::FastCrushAndRaise => ceiling.direction = 1,
                    CeilingType::LowerAndCrush | CeilingType::LowerToFloor => {
                        return ThinkOutcome::Finished;
                    }
                    CeilingType::RaiseToHighest => {}
                },
                PlaneResult::Crushed => {
                    if matches!(
                        ceiling_type,
                        CeilingType::CrushAndRaise
                            | CeilingType::SilentCrushAndRaise
                            | CeilingType::LowerAndCrush
                    ) {
                        ceiling.speed = CEILING_SPEED / 8;
                    }
                }
                PlaneResult::Moved => {}
            }
        }
        _ => {}
    }
    ThinkOutcome::Continue
}
