use bytemuck::{Pod, Zeroable};

use crate::effects::Sound;
use crate::fixed::{FRACUNIT, Fixed};
use crate::world::Sector;

use super::plane::{Plane, PlaneResult, move_plane};
use super::{ThinkContext, ThinkOutcome};

pub const PLAT_SPEED: Fixed = FRACUNIT;
pub const PLAT_WAIT: i32 = 3 * 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PlatState {
    Up = 0,
    Down = 1,
    Waiting = 2,
    InStasis = 3,
}

impl PlatState {
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => Self::Up,
            1 => Self::Down,
            2 => Self::Waiting,
            _ => Self::InStasis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PlatType {
    PerpetualRaise = 0,
    DownWaitUpStay = 1,
    RaiseAndChange = 2,
    RaiseToNearestAndChange = 3,
    BlazeDownWaitUpStay = 4,
    Toggle = 5,
}

impl PlatType {
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => Self::DownWaitUpStay,
            2 => Self::RaiseAndChange,
            3 => Self::RaiseToNearestAndChange,
            4 => Self::BlazeDownWaitUpStay,
            5 => Self::Toggle,
            _ => Self::PerpetualRaise,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PlatformStatus {
    pub plat_type: i32,
    pub speed: i32,
    pub low: i32,
    pub high: i32,
    pub wait: i32,
    pub count: i32,
    pub state: i32,
    pub old_state: i32,
    pub crush: i32,
    pub tag: i32,
}

impl PlatformStatus {
    /// A lift that lowers to `low`, waits, then rises back to `high`.
    pub fn down_wait_up_stay(low: Fixed, high: Fixed) -> Self {
        Self {
            plat_type: PlatType::DownWaitUpStay as i32,
            speed: PLAT_SPEED * 4,
            low,
            high,
            wait: PLAT_WAIT,
            count: 0,
            state: PlatState::Down as i32,
            old_state: PlatState::Down as i32,
            crush: 0,
            tag: 0,
        }
    }

    pub fn state(&self) -> PlatState {
        PlatState::from_raw(self.state)
    }

    fn set_state(&mut self, state: PlatState) {
        self.state = state as i32;
    }
}

pub fn think(
    plat: &mut PlatformStatus,
    sector: &mut Sector,
    cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    match plat.state() {
        PlatState::Up => {
            let result = move_plane(sector, Plane::Floor, plat.speed, plat.high, plat.crush != 0, 1);
            if result == PlaneResult::Crushed && plat.crush == 0 {
                plat.count = plat.wait;
                plat.set_state(PlatState::Down);
                cx.sound(Sound::PlatformStart);
            } else if result == PlaneResult::PastDest {
                plat.count = plat.wait;
                plat.set_state(PlatState::Waiting);
                cx.sound(Sound::PlatformStop);
                if matches!(
                    PlatType::from_raw(plat.plat_type),
                    PlatType::BlazeDownWaitUpStay
                        | PlatType::DownWaitUpStay
                        | PlatType::RaiseAndChange
                        | PlatType::RaiseToNearestAndChange
                ) {
                    return ThinkOutcome::Finished;
                }
            }
        }
        PlatState::Down => {
            if move_plane(sector, Plane::Floor, plat.speed, plat.low, false, -1)
                == PlaneResult::PastDest
            {
                plat.count = plat.wait;
                plat.set_state(PlatState::Waiting);
                cx.sound(Sound::PlatformStop);
            }
        }
        PlatState::Waiting => {
            plat.count = plat.count.saturating_sub(1);
            if plat.count <= 0 {
                if sector.floor_height == plat.low {
                    plat.set_state(PlatState::Up);
                } else {
                    plat.set_state(PlatState::Down);
                }
                cx.sound(Sound::PlatformStart);
            }
        }
        PlatState::InStasis => {}
    }
    ThinkOutcome::Continue
}
