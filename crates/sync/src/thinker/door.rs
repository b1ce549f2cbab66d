use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::{FRACUNIT, Fixed};
use crate::net::protocol::TIC_RATE;
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

pub const DOOR_SPEED: Fixed = 2 * FRACUNIT;
pub const DOOR_WAIT: i32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DoorType {
    Normal = 0,
    Close30ThenOpen = 1,
    Close = 2,
    Open = 3,
    RaiseIn5Mins = 4,
    BlazeRaise = 5,
    BlazeOpen = 6,
    BlazeClose = 7,
}

impl DoorType {
    pub fn from_raw(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Normal,
            1 => Self::Close30ThenOpen,
            2 => Self::Close,
            3 => Self::Open,
            4 => Self::RaiseIn5Mins,
            5 => Self::BlazeRaise,
            6 => Self::BlazeOpen,
            7 => Self::BlazeClose,
            _ => return None,
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DoorStatus {
    pub door_type: i32,
    pub top_height: i32,
    pub speed: i32,
    pub direction: i32,
    pub top_wait: i32,
    pub top_countdown: i32,
    pub light_tag: i32,
}

impl DoorStatus {
    /// A door that opens to `top_height`, waits, then closes again.
    pub fn raise(top_height: Fixed) -> Self {
        Self {
            door_type: DoorType::Normal as i32,
            top_height,
            speed: DOOR_SPEED,
            direction: 1,
            top_wait: DOOR_WAIT,
            top_countdown: 0,
            light_tag: 0,
        }
    }

    pub fn door_type(&self) -> Option<DoorType> {
        DoorType::from_raw(self.door_type)
    }
}

fn play(cx: &mut ThinkContext<'_>, opening: bool) {
    let sound = match (cx.sound_sequence, opening) {
        (0, true) => Sound::DoorOpen,
        (0, false) => Sound::DoorClose,
        (sequence, _) => Sound::Sequence(sequence),
    };
    cx.sound(sound);
}

pub fn think(
    door: &mut DoorStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    let Some(door_type) = door.door_type() else {
        return ThinkOutcome::Finished;
    };

    match door.direction {
        0 => {
            door.top_countdown = door.top_countdown.saturating_sub(1);
            if door.top_countdown <= 0 {
                match door_type {
                    DoorType::BlazeRaise | DoorType::Normal => {
                        door.direction = -1;
                        play(cx, false);
                    }
                    DoorType::Close30ThenOpen => {
                        door.direction = 1;
                        play(cx, true);
                    }
                    _ => {}
                }
            }
        }
        2 => {
            door.top_countdown = door.top_countdown.saturating_sub(1);
            if door.top_countdown <= 0 && door_type == DoorType::RaiseIn5Mins {
                door.direction = 1;
                door.door_type = DoorType::Normal as i32;
                play(cx, true);
            }
        }
        -1 => {
            let floor = sector.floor_height;
            match move_plane(sector, Plane::Ceiling, door.speed, floor, false, -1) {
                PlaneResult::PastDest => match door_type {
                    DoorType::BlazeRaise
                    | DoorType::BlazeClose
                    | DoorType::Normal
                    | DoorType::Close => return ThinkOutcome::Finished,
                    DoorType::Close30ThenOpen => {
                        door.direction = 0;
                        door.top_countdown = TIC_RATE as i32 * 30;
                    }
                    _ => {}
                },
                PlaneResult::Crushed => {
                    if !matches!(door_type, DoorType::BlazeClose | DoorType::Close) {
                        door.direction = 1;
                        play(cx, true);
                    }
                }
                PlaneResult::Moved => {}
            }
        }
        1 => {
            if move_plane(sector, Plane::Ceiling, door.speed, door.top_height, false, 1)
                == PlaneResult::PastDest
            {
                match door_type {
                    DoorType::BlazeRaise | DoorType::Normal => {
                        door.direction = 0;
                        door.top_countdown = door.top_wait;
                    }
                    DoorType::Close30ThenOpen | DoorType::BlazeOpen | DoorType::Open => {
                        return ThinkOutcome::Finished;
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    ThinkOutcome::Continue
}
