use bytemuck::{Pod, Zeroable};

use crate::fixed::{FLOAT_BOB_OFFSETS, FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::world::Sector;

use super::{ThinkContext, ThinkOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WaggleState {
    Expand = 1,
    Stable = 2,
    Reduce = 3,
}

impl WaggleState {
    pub fn from_raw(value: i32) -> Option<Self> {
        Some(match value {
            1 => Self::Expand,
            2 => Self::Stable,
            3 => Self::Reduce,
            _ => return None,
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct FloorWaggleStatus {
    pub original_height: i32,
    pub accumulator: i32,
    pub acc_delta: i32,
    pub target_scale: i32,
    pub scale: i32,
    pub scale_delta: i32,
    pub ticker: i32,
    pub state: i32,
}

impl FloorWaggleStatus {
    /// `timer` is in seconds; zero waggles forever.
    pub fn start(sector: &Sector, height: Fixed, speed: Fixed, offset: i32, timer: i32) -> Self {
        Self {
            original_height: sector.floor_height,
            accumulator: offset * FRACUNIT,
            acc_delta: speed,
            target_scale: height,
            scale: 0,
            scale_delta: (height / 35).max(1),
            ticker: if timer > 0 { timer * 35 } else { -1 },
            state: WaggleState::Expand as i32,
        }
    }
}

pub fn think(
    waggle: &mut FloorWaggleStatus,
    sector: &mut Sector,
    _cx: &mut ThinkContext<'_>,
) -> ThinkOutcome {
    match WaggleState::from_raw(waggle.state) {
        Some(WaggleState::Expand) => {
            waggle.scale = waggle.scale.saturating_add(waggle.scale_delta);
            if waggle.scale >= waggle.target_scale {
                waggle.scale = waggle.target_scale;
                waggle.state = WaggleState::Stable as i32;
            }
        }
        Some(WaggleState::Reduce) => {
            waggle.scale = waggle.scale.saturating_sub(waggle.scale_delta);
            if waggle.scale <= 0 {
                sector.floor_height = waggle.original_height;
                return ThinkOutcome::Finished;
            }
        }
        Some(WaggleState::Stable) => {
            if waggle.ticker != -1 {
                waggle.ticker = waggle.ticker.saturating_sub(1);
                if waggle.ticker == 0 {
                    waggle.state = WaggleState::Reduce as i32;
                }
            }
        }
        None => return ThinkOutcome::Finished,
    }

    waggle.accumulator = waggle.accumulator.wrapping_add(waggle.acc_delta);
    let phase = (waggle.accumulator >> FRACBITS) as usize & 63;
    sector.floor_height = waggle
        .original_height
        .wrapping_add(fixed_mul(FLOAT_BOB_OFFSETS[phase], waggle.scale));
    ThinkOutcome::Continue
}
